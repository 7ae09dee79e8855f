//! Audience resolution against the preference store.

mod common;

use remark_core::model::EmailKind;
use remark_notify::{recipients, DataStore};

use common::fixture;

#[tokio::test]
async fn filters_by_email_activation_and_kind() {
    let fx = fixture();
    let review = fx.store.review(10).await.unwrap();

    let recipients = recipients::resolve(
        fx.store.as_ref(),
        &review,
        EmailKind::PublishedReview,
    )
    .await
    .unwrap();

    let ids: Vec<_> = recipients.iter().map(|user| user.id).collect();
    // Cal has no email, Dot never activated delivery, Eve opted out of
    // this kind; Ann and Ben remain.
    assert_eq!(ids, [1, 2]);
    assert!(recipients.iter().all(|user| user.email.is_some()));
}

#[tokio::test]
async fn kind_opt_out_is_per_kind() {
    let fx = fixture();
    let review = fx.store.review(10).await.unwrap();

    // Eve only disabled publishedReview mails.
    let recipients =
        recipients::resolve(fx.store.as_ref(), &review, EmailKind::UpdatedReview)
            .await
            .unwrap();
    let ids: Vec<_> = recipients.iter().map(|user| user.id).collect();
    assert_eq!(ids, [1, 2, 5]);
}

#[tokio::test]
async fn candidates_deduplicated_across_roles() {
    let fx = fixture();
    let mut review = fx.store.review(10).await.unwrap();
    // Ann is both an owner and a watcher now.
    review.watchers.push(1);
    fx.store.add_review(review.clone());

    let recipients =
        recipients::resolve(fx.store.as_ref(), &review, EmailKind::PublishedReview)
            .await
            .unwrap();
    let ids: Vec<_> = recipients.iter().map(|user| user.id).collect();
    assert_eq!(ids, [1, 2]);
}

#[tokio::test]
async fn order_is_deterministic_ascending_by_id() {
    let fx = fixture();
    let mut review = fx.store.review(10).await.unwrap();
    // Shuffle role membership; the output order must not care.
    review.owners = vec![2];
    review.assigned_reviewers = vec![];
    review.watchers = vec![1, 3, 4, 5];
    fx.store.add_review(review.clone());

    let recipients =
        recipients::resolve(fx.store.as_ref(), &review, EmailKind::PublishedReview)
            .await
            .unwrap();
    let ids: Vec<_> = recipients.iter().map(|user| user.id).collect();
    assert_eq!(ids, [1, 2]);
}

#[tokio::test]
async fn subject_line_template_string_counts_as_enabled() {
    let fx = fixture();
    // A stored template doubles as the enable flag for its kind.
    fx.store.set_setting(
        1,
        "email",
        "subjectLine.publishedReview",
        serde_json::json!("%(branch)s: %(summary)s"),
    );
    let review = fx.store.review(10).await.unwrap();

    let recipients =
        recipients::resolve(fx.store.as_ref(), &review, EmailKind::PublishedReview)
            .await
            .unwrap();
    assert!(recipients.iter().any(|user| user.id == 1));
}
