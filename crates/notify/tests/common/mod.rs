//! Shared fixtures for the notification pipeline integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::TimeZone;
use remark_core::model::{EventKind, Review, ReviewEvent, User};
use remark_core::types::DbId;
use remark_notify::memory::{MemoryStore, MemoryThreadStore, RecordingBus};

pub fn user(id: DbId, name: &str, email: Option<&str>) -> User {
    User {
        id,
        name: name.to_string(),
        email: email.map(str::to_string),
        url_prefixes: vec!["https://remark.example.com".to_string()],
    }
}

pub fn published_event(id: DbId, review: DbId) -> ReviewEvent {
    ReviewEvent {
        id,
        kind: EventKind::Published,
        timestamp: chrono::Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 45)
            .unwrap()
            + chrono::Duration::microseconds(123456),
        review,
    }
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub bus: Arc<RecordingBus>,
    pub threads: Arc<MemoryThreadStore>,
    pub event: ReviewEvent,
    pub sender: User,
}

/// Review 10 with five candidates, of which only Ann (1) and Ben (2)
/// survive preference filtering:
///
/// - 1 Ann — owner, email, activated
/// - 2 Ben — assigned reviewer, email, activated
/// - 3 Cal — watcher, activated but no email address
/// - 4 Dot — watcher, email but never activated email delivery
/// - 5 Eve — watcher, activated but opted out of publishedReview
pub fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::default());

    let mut changed_lines = BTreeMap::new();
    changed_lines.insert("README.md".to_string(), (0, 7));
    changed_lines.insert("src/widget.rs".to_string(), (3, 120));
    store.add_review(Review {
        id: 10,
        summary: "Add widget support".to_string(),
        branch: Some("feature/widgets".to_string()),
        owners: vec![1],
        assigned_reviewers: vec![2],
        watchers: vec![3, 4, 5],
        changed_lines,
    });

    store.add_user(user(1, "Ann", Some("ann@example.com")));
    store.add_user(user(2, "Ben", Some("ben@example.com")));
    store.add_user(user(3, "Cal", None));
    store.add_user(user(4, "Dot", Some("dot@example.com")));
    store.add_user(user(5, "Eve", Some("eve@example.com")));

    for id in [1, 2, 3, 5] {
        store.set_setting(id, "email", "activated", serde_json::json!(true));
    }
    store.set_setting(
        5,
        "email",
        "subjectLine.publishedReview",
        serde_json::json!(false),
    );

    let event = published_event(100, 10);
    store.add_event(event.clone());

    Fixture {
        store,
        bus: Arc::new(RecordingBus::default()),
        threads: Arc::new(MemoryThreadStore::default()),
        event,
        sender: user(9, "Dev Eloper", Some("dev@example.com")),
    }
}
