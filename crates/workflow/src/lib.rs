//! Promotion workflow: the steps and the state machine that sequences them.
//!
//! Each step is a free function over the port traits from [`promotion`]:
//! it performs its side effects, verifies them, and returns a value or a
//! [`promotion::PromotionError`]. [`Promoter`] runs the steps in order and
//! reports the state that failed.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Steps sequence calls between business logic in the
//! [`promotion`] crate and the infrastructure traits. They contain no policy of
//! their own.
//!
//! ## Module Layout
//!
//! | Module | State |
//! |--------|-------|
//! | [`authorize`] | AUTHORIZE |
//! | [`acquire`] | ACQUIRE |
//! | [`manifest`] | RESOLVE |
//! | [`provision`] | PROVISION |
//! | [`publish`] | PUBLISH |
//! | [`grant`] | GRANT |
//! | [`close`] | CLOSE |
//! | [`orchestrator`] | all, plus VERIFY_OPEN and VERIFY_CLOSED |

pub mod acquire;
pub mod authorize;
pub mod close;
pub mod grant;
pub mod manifest;
pub mod orchestrator;
pub mod provision;
pub mod publish;

pub use acquire::{acquire, LocalClone};
pub use authorize::authorize;
pub use close::close_pull_request;
pub use grant::grant_access;
pub use manifest::{resolve_app_id, ResolvedManifest};
pub use orchestrator::{PromotionFailure, PromotionOutcome, PromotionState, Promoter};
pub use provision::provision;
pub use publish::{publish, PublishTarget};
