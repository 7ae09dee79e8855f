//! Shared fixtures for in-crate unit tests.

use std::collections::BTreeMap;

use chrono::TimeZone;
use remark_core::model::{EventKind, Review, ReviewEvent, User};
use remark_core::types::DbId;

pub fn user(id: DbId, name: &str, email: Option<&str>) -> User {
    User {
        id,
        name: name.to_string(),
        email: email.map(str::to_string),
        url_prefixes: vec!["https://remark.example.com".to_string()],
    }
}

pub fn sample_review(id: DbId) -> Review {
    let mut changed_lines = BTreeMap::new();
    changed_lines.insert("README.md".to_string(), (0, 7));
    changed_lines.insert("src/widget.rs".to_string(), (3, 120));
    Review {
        id,
        summary: "Add widget support".to_string(),
        branch: Some("feature/widgets".to_string()),
        owners: vec![1],
        assigned_reviewers: vec![2],
        watchers: vec![3, 4],
        changed_lines,
    }
}

pub fn published_event(id: DbId, review: DbId) -> ReviewEvent {
    ReviewEvent {
        id,
        kind: EventKind::Published,
        // Fixed instant so message-id prefixes are reproducible.
        timestamp: chrono::Utc
            .with_ymd_and_hms(2024, 3, 1, 12, 30, 45)
            .unwrap()
            + chrono::Duration::microseconds(123456),
        review,
    }
}
