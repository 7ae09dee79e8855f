//! Read-only snapshots of external review entities.
//!
//! The review/user data store is an external collaborator; these
//! structs are the shapes it hands us. Nothing in this crate mutates
//! them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// What happened to a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    New,
    Published,
    Updated,
}

/// A single review lifecycle event, created by the external event
/// source and read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: DbId,
    pub kind: EventKind,
    pub timestamp: Timestamp,
    /// The review this event concerns.
    pub review: DbId,
}

/// Snapshot of a review as the data store sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: DbId,
    pub summary: String,
    /// Name of the review branch. Reviews created through unusual paths
    /// can lack one; subject formatting treats that as fatal.
    pub branch: Option<String>,
    pub owners: Vec<DbId>,
    pub assigned_reviewers: Vec<DbId>,
    pub watchers: Vec<DbId>,
    /// Per-file change statistics: path -> (deleted lines, inserted
    /// lines). Ordered by path.
    pub changed_lines: BTreeMap<String, (u32, u32)>,
}

/// Snapshot of a user account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: DbId,
    pub name: String,
    /// Verified email address, if the user has one.
    pub email: Option<String>,
    /// URL prefixes under which this user can reach the service.
    pub url_prefixes: Vec<String>,
}

/// The class of notification email being produced for an event.
///
/// The camelCase wire names are used in preference keys
/// (`subjectLine.publishedReview` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmailKind {
    NewReview,
    PublishedReview,
    UpdatedReview,
}

impl EmailKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailKind::NewReview => "newReview",
            EmailKind::PublishedReview => "publishedReview",
            EmailKind::UpdatedReview => "updatedReview",
        }
    }
}

impl std::fmt::Display for EmailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
