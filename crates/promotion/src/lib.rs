//! Core domain for promoting an approved submission into its own repository.
//!
//! This crate contains every domain concept, newtype identifier, shared value
//! type, policy rule and error type used by the promotion workflow.
//! Infrastructure crates implement the port traits defined here; they never
//! add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`CommitSha`, `AppId`, `UserLogin`, etc.) |
//! | [`types`] | Requests, remote snapshots and mutation payloads |
//! | [`errors`] | Workflow and port error types |
//! | [`command`] | `/merge` command parser |
//! | [`config`] | `PromotionConfig` and its validation |
//! | [`policy`] | Team selection, protection rules, closing comment |
//! | [`ports`] | `RepositoryService` and `SourceControl` traits |
//! | [`fakes`] | In-memory port implementations for tests |

pub mod command;
pub mod config;
pub mod errors;
pub mod fakes;
pub mod identifiers;
pub mod policy;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use command::{parse_merge_command, CommandError};
pub use config::{ConfigError, PromotionConfig};
pub use errors::{PromotionError, RemoteServiceError, SourceControlError};
pub use identifiers::{
    AppId, BranchName, CommitSha, LabelName, PromotionRunId, PullRequestNumber, RepositoryId,
    TeamSlug, UserLogin,
};
pub use ports::{RemoteResult, RepositoryService, SourceControl};
pub use types::{
    AccessToken, BranchProtectionRule, BranchSnapshot, CommentEvent, IssueSnapshot, LockReason,
    Permission, PromotionRequest, ProtectionAttempt, PublicationReport, PullRequestSnapshot,
    PullRequestState, PushOutcome, RepositorySettings, RepositorySnapshot, Timestamp,
};
