//! Commit atomicity of the notification group.

mod common;

use assert_matches::assert_matches;
use async_trait::async_trait;
use remark_core::model::EmailKind;
use remark_notify::{
    DataStore, Email, EmailGenerator, NotificationGroup, NotifyError, ThreadStore, EMAIL_TOPIC,
};

use common::fixture;

/// Keeps every email with one plain section.
struct SectionGenerator;

#[async_trait]
impl EmailGenerator for SectionGenerator {
    async fn compose(&self, email: &mut Email) -> Result<bool, NotifyError> {
        email.add_section(["the review is ready"], true);
        Ok(true)
    }
}

/// Fails while composing for one specific recipient.
struct FailFor(i64);

#[async_trait]
impl EmailGenerator for FailFor {
    async fn compose(&self, email: &mut Email) -> Result<bool, NotifyError> {
        if email.recipient().id == self.0 {
            return Err(NotifyError::Content("diff rendering failed".to_string()));
        }
        email.add_section(["fine"], true);
        Ok(true)
    }
}

/// Declines every email.
struct DeclineAll;

#[async_trait]
impl EmailGenerator for DeclineAll {
    async fn compose(&self, _email: &mut Email) -> Result<bool, NotifyError> {
        Ok(false)
    }
}

#[tokio::test]
async fn success_publishes_exactly_one_batch() {
    let fx = fixture();

    let group = NotificationGroup::deliver(
        fx.store.clone(),
        fx.bus.as_ref(),
        None,
        fx.event.clone(),
        fx.sender.clone(),
        EmailKind::PublishedReview,
        &SectionGenerator,
        false,
    )
    .await
    .unwrap();

    let batches = fx.bus.batches();
    assert_eq!(batches.len(), 1);
    let (topic, batch) = &batches[0];
    assert_eq!(topic, EMAIL_TOPIC);
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0].message_id, "20240301123045.123456.r10.e100.u1");
    assert_eq!(batch[1].message_id, "20240301123045.123456.r10.e100.u2");
    assert_eq!(batch[0].to, "ann@example.com");
    assert_eq!(batch[0].subject, "[r/10] Add widget support");
    assert_eq!(group.pending_count(), 0);
}

#[tokio::test]
async fn one_failing_composer_publishes_nothing() {
    let fx = fixture();

    let result = NotificationGroup::deliver(
        fx.store.clone(),
        fx.bus.as_ref(),
        None,
        fx.event.clone(),
        fx.sender.clone(),
        EmailKind::PublishedReview,
        &FailFor(2),
        false,
    )
    .await;

    assert_matches!(result, Err(NotifyError::Content(_)));
    assert_eq!(fx.bus.batch_count(), 0);
}

#[tokio::test]
async fn declined_recipients_still_commit_an_empty_batch() {
    let fx = fixture();

    NotificationGroup::deliver(
        fx.store.clone(),
        fx.bus.as_ref(),
        None,
        fx.event.clone(),
        fx.sender.clone(),
        EmailKind::PublishedReview,
        &DeclineAll,
        false,
    )
    .await
    .unwrap();

    let batches = fx.bus.batches();
    assert_eq!(batches.len(), 1);
    assert!(batches[0].1.is_empty());
}

#[tokio::test]
async fn missing_branch_aborts_the_whole_group() {
    let fx = fixture();
    let mut review = fx.store.review(10).await.unwrap();
    review.branch = None;
    fx.store.add_review(review);

    let result = NotificationGroup::deliver(
        fx.store.clone(),
        fx.bus.as_ref(),
        None,
        fx.event.clone(),
        fx.sender.clone(),
        EmailKind::PublishedReview,
        &SectionGenerator,
        false,
    )
    .await;

    assert_matches!(result, Err(NotifyError::MissingBranch(10)));
    assert_eq!(fx.bus.batch_count(), 0);
}

#[tokio::test]
async fn generate_accumulates_and_commits_at_most_once() {
    let fx = fixture();
    let mut group = NotificationGroup::new(
        fx.store.clone(),
        fx.event.clone(),
        fx.sender.clone(),
        EmailKind::PublishedReview,
    )
    .await
    .unwrap();

    group.generate(&SectionGenerator, false).await.unwrap();
    group.generate(&SectionGenerator, false).await.unwrap();
    assert_eq!(group.pending_count(), 4);

    let published = group.commit(fx.bus.as_ref()).await.unwrap();
    assert_eq!(published, 4);
    assert_eq!(fx.bus.batch_count(), 1);

    // Terminal: neither a second commit nor further generation.
    assert_matches!(
        group.commit(fx.bus.as_ref()).await,
        Err(NotifyError::GroupClosed("committed"))
    );
    assert_matches!(
        group.generate(&SectionGenerator, false).await,
        Err(NotifyError::GroupClosed("committed"))
    );
    assert_eq!(fx.bus.batch_count(), 1);
}

#[tokio::test]
async fn abort_discards_everything() {
    let fx = fixture();
    let mut group = NotificationGroup::new(
        fx.store.clone(),
        fx.event.clone(),
        fx.sender.clone(),
        EmailKind::PublishedReview,
    )
    .await
    .unwrap();

    group.generate(&SectionGenerator, true).await.unwrap();
    assert_eq!(group.pending_count(), 2);

    group.abort();
    assert_eq!(group.pending_count(), 0);
    assert!(group.thread_ids().is_empty());
    assert_matches!(
        group.commit(fx.bus.as_ref()).await,
        Err(NotifyError::GroupClosed("aborted"))
    );
    assert_eq!(fx.bus.batch_count(), 0);
}

#[tokio::test]
async fn thread_correlation_links_and_retains_ids() {
    let fx = fixture();
    fx.threads
        .record_thread(10, 1, "20240101000000.000000.r10.e90.u1")
        .await
        .unwrap();

    let group = NotificationGroup::deliver(
        fx.store.clone(),
        fx.bus.as_ref(),
        Some(fx.threads.as_ref()),
        fx.event.clone(),
        fx.sender.clone(),
        EmailKind::PublishedReview,
        &SectionGenerator,
        true,
    )
    .await
    .unwrap();

    let batches = fx.bus.batches();
    let batch = &batches[0].1;
    // Ann continues her existing thread; Ben starts a fresh one.
    assert_eq!(
        batch[0].in_reply_to.as_deref(),
        Some("20240101000000.000000.r10.e90.u1")
    );
    assert_eq!(batch[1].in_reply_to, None);

    // Assigned ids are retained after commit for persistence.
    assert_eq!(
        group.thread_ids().get(&1).map(String::as_str),
        Some("20240301123045.123456.r10.e100.u1")
    );
    assert_eq!(
        group.thread_ids().get(&2).map(String::as_str),
        Some("20240301123045.123456.r10.e100.u2")
    );
}
