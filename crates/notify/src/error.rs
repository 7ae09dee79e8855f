use remark_core::layout::LayoutError;
use remark_core::types::DbId;

use crate::store::StoreError;

/// Failures of the notification pipeline.
///
/// Any of these surfacing while a group is generating aborts the whole
/// group: a half-notified review is worse than a delayed, fully retried
/// one.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The review has no branch, so no recipient's subject line can be
    /// formatted. Fatal for the entire group.
    #[error("review {0} has no branch")]
    MissingBranch(DbId),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The group already reached a terminal state.
    #[error("notification group already {0}")]
    GroupClosed(&'static str),

    /// A content generator failed for reasons of its own.
    #[error("content generation failed: {0}")]
    Content(String),
}
