//! External collaborator interfaces.
//!
//! The review/user/preference store, the thread-correlation store, and
//! the outbound message bus all live outside this crate; these traits
//! are the shapes the pipeline consumes them through. Backends are
//! expected to be shared via `Arc<dyn …>`.

use async_trait::async_trait;
use remark_core::model::{Review, ReviewEvent, User};
use remark_core::types::DbId;

use crate::email::FinishedEmail;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors reported by external backends.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("backend error: {0}")]
    Backend(String),
}

// ---------------------------------------------------------------------------
// DataStore
// ---------------------------------------------------------------------------

/// Read-only access to reviews, users, events, and per-user settings.
///
/// Setting lookups take the user id as their first argument: the lookup
/// is evaluated in that user's own access context, never the sender's.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn event(&self, id: DbId) -> Result<ReviewEvent, StoreError>;

    async fn review(&self, id: DbId) -> Result<Review, StoreError>;

    async fn user(&self, id: DbId) -> Result<User, StoreError>;

    /// Boolean view of a setting; `default` when unset.
    async fn bool_setting(
        &self,
        user: DbId,
        scope: &str,
        name: &str,
        default: bool,
    ) -> Result<bool, StoreError>;

    /// String view of a setting; `default` when unset or not a string.
    async fn string_setting(
        &self,
        user: DbId,
        scope: &str,
        name: &str,
        default: &str,
    ) -> Result<String, StoreError>;

    /// Numeric view of a setting; `default` when unset or not a number.
    async fn usize_setting(
        &self,
        user: DbId,
        scope: &str,
        name: &str,
        default: usize,
    ) -> Result<usize, StoreError>;
}

// ---------------------------------------------------------------------------
// ThreadStore
// ---------------------------------------------------------------------------

/// Persistence of thread-correlation state across events on a review.
///
/// The group consumes prior thread ids and hands back the ids it
/// assigned; storing them durably is the backend's job.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Message id of the last notification sent to `user` for `review`,
    /// if any.
    async fn prior_thread(&self, review: DbId, user: DbId) -> Result<Option<String>, StoreError>;

    async fn record_thread(
        &self,
        review: DbId,
        user: DbId,
        message_id: &str,
    ) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// OutboundBus
// ---------------------------------------------------------------------------

/// Outbound message bus accepting one finished batch per call.
///
/// The pipeline always publishes a group's entire batch in a single
/// call; partial batches never reach the bus.
#[async_trait]
pub trait OutboundBus: Send + Sync {
    async fn publish(&self, topic: &str, batch: Vec<FinishedEmail>) -> Result<(), StoreError>;
}
