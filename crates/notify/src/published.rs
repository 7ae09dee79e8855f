//! Notification handler for published reviews.
//!
//! Drives one [`NotificationGroup`] per publication event: every
//! recipient gets a message with the review summary and the
//! changed-lines table, threaded onto any earlier conversation for the
//! same review. Assigned thread ids are recorded back into the
//! [`ThreadStore`] after the batch commits.

use std::sync::Arc;

use async_trait::async_trait;
use remark_core::layout;
use remark_core::model::{EmailKind, ReviewEvent, User};

use crate::dispatcher::PublishedHandler;
use crate::email::Email;
use crate::error::NotifyError;
use crate::group::{EmailGenerator, NotificationGroup};
use crate::store::{DataStore, OutboundBus, ThreadStore};

// ---------------------------------------------------------------------------
// Content generator
// ---------------------------------------------------------------------------

/// Composes the "review published" email for one recipient.
pub struct PublishedGenerator;

#[async_trait]
impl EmailGenerator for PublishedGenerator {
    async fn compose(&self, email: &mut Email) -> Result<bool, NotifyError> {
        if email.recipient().id == email.context().from_user.id {
            // The publisher already knows; nothing relevant for them.
            return Ok(false);
        }

        let publisher = email.context().from_user.name.clone();
        let summary = email.context().review.summary.clone();
        // Email construction already failed the group if the branch is
        // missing, so this is always present here.
        let branch = email
            .context()
            .review
            .branch
            .clone()
            .unwrap_or_default();

        email.add_section(
            [
                format!("{publisher} has published a review of the branch {branch}:"),
                String::new(),
                format!("  \"{summary}\""),
            ],
            true,
        );

        let changed_lines = email.context().review.changed_lines.clone();
        if !changed_lines.is_empty() {
            // The rendered table is identical for every recipient with
            // the same line width, so memoize it in the group cache.
            let width = email.line_width();
            let cached = email
                .context()
                .cache
                .get_or_compute(&format!("changed-lines:{width}"), || async move {
                    let lines = layout::format_table(&changed_lines, width, "  ")?;
                    Ok(serde_json::Value::from(lines))
                })
                .await?;
            let table: Vec<String> = serde_json::from_value(cached)
                .map_err(|err| NotifyError::Content(err.to_string()))?;

            email.add_separator();
            let mut lines = vec!["These files were changed:".to_string(), String::new()];
            lines.extend(table);
            email.add_section(lines, true);
        }

        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// [`PublishedHandler`] that delivers the publication notification
/// batch and persists the thread ids it assigned.
pub struct PublishedReviewNotifier {
    store: Arc<dyn DataStore>,
    bus: Arc<dyn OutboundBus>,
    threads: Arc<dyn ThreadStore>,
    /// Sender identity for all publication notifications.
    from_user: User,
}

impl PublishedReviewNotifier {
    pub fn new(
        store: Arc<dyn DataStore>,
        bus: Arc<dyn OutboundBus>,
        threads: Arc<dyn ThreadStore>,
        from_user: User,
    ) -> Self {
        Self {
            store,
            bus,
            threads,
            from_user,
        }
    }
}

#[async_trait]
impl PublishedHandler for PublishedReviewNotifier {
    async fn handle_published(&self, event: &ReviewEvent) -> Result<(), NotifyError> {
        let group = NotificationGroup::deliver(
            Arc::clone(&self.store),
            self.bus.as_ref(),
            Some(self.threads.as_ref()),
            event.clone(),
            self.from_user.clone(),
            EmailKind::PublishedReview,
            &PublishedGenerator,
            true,
        )
        .await?;

        for (user, message_id) in group.thread_ids() {
            self.threads
                .record_thread(event.review, *user, message_id)
                .await?;
        }
        Ok(())
    }
}
