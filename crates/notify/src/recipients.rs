//! Audience resolution for one event and email kind.

use std::collections::BTreeSet;

use remark_core::model::{EmailKind, Review, User};
use remark_core::types::DbId;

use crate::store::{DataStore, StoreError};

/// Resolve the filtered audience for a review notification.
///
/// Candidates are the union of the review's owners, assigned reviewers,
/// and watchers, deduplicated by id. A candidate is dropped when it has
/// no usable email address, has not enabled email delivery at all
/// (`email.activated`, default off), or has disabled this specific kind
/// (`email.subjectLine.<kind>`, default on). Every setting is evaluated
/// as the candidate, not the sender.
///
/// The result is ordered by ascending user id so downstream processing
/// is reproducible.
pub async fn resolve(
    store: &dyn DataStore,
    review: &Review,
    kind: EmailKind,
) -> Result<Vec<User>, StoreError> {
    let candidates: BTreeSet<DbId> = review
        .owners
        .iter()
        .chain(&review.assigned_reviewers)
        .chain(&review.watchers)
        .copied()
        .collect();

    let kind_setting = format!("subjectLine.{kind}");
    let mut recipients = Vec::new();

    for id in candidates {
        let candidate = store.user(id).await?;
        if candidate.email.is_none() {
            // No (or unverified) email address.
            continue;
        }
        if !store.bool_setting(id, "email", "activated", false).await? {
            // User has not enabled emails at all.
            continue;
        }
        if !store.bool_setting(id, "email", &kind_setting, true).await? {
            // User has disabled this specific kind of email.
            continue;
        }
        recipients.push(candidate);
    }

    Ok(recipients)
}
