//! Promoter GitHub infrastructure adapter.
//!
//! Implements the [`promotion::RepositoryService`] port against the GitHub REST
//! v3 API and the GraphQL v4 endpoint (for branch protection rules) using
//! `reqwest`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** This crate must not contain domain rules.
//! Endpoint paths, authentication headers and payload shapes live here; the
//! [`promotion`] crate never sees them. Every non-success response becomes a
//! [`promotion::RemoteServiceError`] carrying the operation name, the HTTP
//! status and the response body.

mod client;
mod models;

pub use client::GithubClient;

/// Failure to construct a [`GithubClient`].
#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("access token contains characters not allowed in an HTTP header")]
    InvalidToken,

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
