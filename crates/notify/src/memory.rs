//! In-memory backends for the external interfaces.
//!
//! Used by the integration tests and as the worker's placeholder
//! backend until real store/bus bindings exist. All state sits behind
//! plain mutexes; none of these are meant for production use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use remark_core::model::{Review, ReviewEvent, User};
use remark_core::types::DbId;

use crate::email::FinishedEmail;
use crate::store::{DataStore, OutboundBus, StoreError, ThreadStore};

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreInner {
    events: HashMap<DbId, ReviewEvent>,
    reviews: HashMap<DbId, Review>,
    users: HashMap<DbId, User>,
    /// (user, scope, name) → raw setting value.
    settings: HashMap<(DbId, String, String), serde_json::Value>,
}

/// In-memory review/user/preference store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStore {
    pub fn add_event(&self, event: ReviewEvent) {
        self.inner.lock().unwrap().events.insert(event.id, event);
    }

    pub fn add_review(&self, review: Review) {
        self.inner.lock().unwrap().reviews.insert(review.id, review);
    }

    pub fn add_user(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    /// Set a raw per-user setting value.
    pub fn set_setting(&self, user: DbId, scope: &str, name: &str, value: serde_json::Value) {
        self.inner
            .lock()
            .unwrap()
            .settings
            .insert((user, scope.to_string(), name.to_string()), value);
    }

    fn setting(&self, user: DbId, scope: &str, name: &str) -> Option<serde_json::Value> {
        self.inner
            .lock()
            .unwrap()
            .settings
            .get(&(user, scope.to_string(), name.to_string()))
            .cloned()
    }
}

/// Truthiness of a raw setting value.
///
/// Settings are untyped at the store level. Notably the
/// `subjectLine.<kind>` key doubles as an enable flag and a subject
/// template: a user who stored a template string there still counts as
/// enabled, while the literal `"disabled"` (or an empty string) opts
/// out.
fn value_as_bool(value: &serde_json::Value, default: bool) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => !s.is_empty() && s != "disabled",
        serde_json::Value::Number(n) => n.as_i64() != Some(0),
        _ => default,
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn event(&self, id: DbId) -> Result<ReviewEvent, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .events
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "event", id })
    }

    async fn review(&self, id: DbId) -> Result<Review, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .reviews
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "review",
                id,
            })
    }

    async fn user(&self, id: DbId) -> Result<User, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound { entity: "user", id })
    }

    async fn bool_setting(
        &self,
        user: DbId,
        scope: &str,
        name: &str,
        default: bool,
    ) -> Result<bool, StoreError> {
        Ok(self
            .setting(user, scope, name)
            .map(|v| value_as_bool(&v, default))
            .unwrap_or(default))
    }

    async fn string_setting(
        &self,
        user: DbId,
        scope: &str,
        name: &str,
        default: &str,
    ) -> Result<String, StoreError> {
        Ok(self
            .setting(user, scope, name)
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_else(|| default.to_string()))
    }

    async fn usize_setting(
        &self,
        user: DbId,
        scope: &str,
        name: &str,
        default: usize,
    ) -> Result<usize, StoreError> {
        Ok(self
            .setting(user, scope, name)
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(default))
    }
}

// ---------------------------------------------------------------------------
// MemoryThreadStore
// ---------------------------------------------------------------------------

/// In-memory thread-correlation store keyed by (review, user).
#[derive(Default)]
pub struct MemoryThreadStore {
    threads: Mutex<HashMap<(DbId, DbId), String>>,
}

impl MemoryThreadStore {
    pub fn thread(&self, review: DbId, user: DbId) -> Option<String> {
        self.threads.lock().unwrap().get(&(review, user)).cloned()
    }
}

#[async_trait]
impl ThreadStore for MemoryThreadStore {
    async fn prior_thread(&self, review: DbId, user: DbId) -> Result<Option<String>, StoreError> {
        Ok(self.threads.lock().unwrap().get(&(review, user)).cloned())
    }

    async fn record_thread(
        &self,
        review: DbId,
        user: DbId,
        message_id: &str,
    ) -> Result<(), StoreError> {
        self.threads
            .lock()
            .unwrap()
            .insert((review, user), message_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingBus
// ---------------------------------------------------------------------------

/// Outbound bus that records every published batch.
#[derive(Default)]
pub struct RecordingBus {
    batches: Mutex<Vec<(String, Vec<FinishedEmail>)>>,
}

impl RecordingBus {
    /// All batches published so far, in publish order.
    pub fn batches(&self) -> Vec<(String, Vec<FinishedEmail>)> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl OutboundBus for RecordingBus {
    async fn publish(&self, topic: &str, batch: Vec<FinishedEmail>) -> Result<(), StoreError> {
        tracing::info!(topic, count = batch.len(), "batch published");
        self.batches
            .lock()
            .unwrap()
            .push((topic.to_string(), batch));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
