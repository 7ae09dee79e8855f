//! Notification group orchestration and atomic commit.
//!
//! A [`NotificationGroup`] covers one review event's whole notification
//! cycle: it resolves the audience, drives a content generator over
//! every recipient's [`Email`], and publishes the finished batch to the
//! outbound bus in a single call — or publishes nothing at all. There
//! is at most one commit per group, never a partial one.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use remark_core::model::{EmailKind, Review, ReviewEvent, User};
use remark_core::types::DbId;
use tokio::sync::Mutex;

use crate::email::Email;
use crate::error::NotifyError;
use crate::recipients;
use crate::store::{DataStore, OutboundBus, ThreadStore};

/// Bus topic every committed batch is published to.
pub const EMAIL_TOPIC: &str = "EmailNotifications";

// ---------------------------------------------------------------------------
// Message-id derivation
// ---------------------------------------------------------------------------

/// Message-id prefix for one event:
/// `<YYYYMMDDHHMMSS>.<microseconds>.r<review>.e<event>`.
///
/// Purely a function of the event, so re-deriving it for the same event
/// is byte-identical. Per-recipient ids append `.u<user>`.
pub fn message_id_prefix(event: &ReviewEvent) -> String {
    format!(
        "{}.{:06}.r{}.e{}",
        event.timestamp.format("%Y%m%d%H%M%S"),
        event.timestamp.timestamp_subsec_micros(),
        event.review,
        event.id
    )
}

// ---------------------------------------------------------------------------
// GroupCache
// ---------------------------------------------------------------------------

/// Per-group memo for cross-recipient reuse of expensive computations,
/// keyed by string and holding JSON values.
///
/// The lock is held across the compute future, so concurrent composers
/// asking for the same key compute it exactly once.
#[derive(Default)]
pub struct GroupCache {
    inner: Mutex<HashMap<String, serde_json::Value>>,
}

impl GroupCache {
    /// Return the cached value for `key`, computing and storing it on
    /// first access.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<serde_json::Value, NotifyError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value, NotifyError>>,
    {
        let mut map = self.inner.lock().await;
        if let Some(value) = map.get(key) {
            return Ok(value.clone());
        }
        let value = compute().await?;
        map.insert(key.to_string(), value.clone());
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// GroupContext
// ---------------------------------------------------------------------------

/// State shared between a group and the emails it generates.
pub struct GroupContext {
    pub event: ReviewEvent,
    /// Snapshot of the event's review, fetched once per group.
    pub review: Review,
    /// Sender identity for every message in the group.
    pub from_user: User,
    pub kind: EmailKind,
    pub cache: GroupCache,
}

// ---------------------------------------------------------------------------
// EmailGenerator
// ---------------------------------------------------------------------------

/// Content generator invoked once per recipient.
///
/// Returning `Ok(false)` discards the email without a trace ("nothing
/// relevant for this viewer"); any error aborts the whole group.
#[async_trait]
pub trait EmailGenerator: Send + Sync {
    async fn compose(&self, email: &mut Email) -> Result<bool, NotifyError>;
}

// ---------------------------------------------------------------------------
// NotificationGroup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupState {
    Created,
    Generating,
    Committed,
    Aborted,
}

/// The unit of atomic commit: all messages generated for one event are
/// delivered together or not at all.
pub struct NotificationGroup {
    store: Arc<dyn DataStore>,
    ctx: Arc<GroupContext>,
    state: GroupState,
    pending: Vec<Email>,
    /// Prior thread id per recipient, threaded into `In-Reply-To`.
    prior_threads: HashMap<DbId, String>,
    /// Thread ids assigned by this event, retained after commit so the
    /// caller can persist them for the next event on the review.
    assigned_threads: HashMap<DbId, String>,
}

impl std::fmt::Debug for NotificationGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationGroup")
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("prior_threads", &self.prior_threads)
            .field("assigned_threads", &self.assigned_threads)
            .finish_non_exhaustive()
    }
}

impl NotificationGroup {
    /// Start a notification cycle for `event`, snapshotting its review.
    pub async fn new(
        store: Arc<dyn DataStore>,
        event: ReviewEvent,
        from_user: User,
        kind: EmailKind,
    ) -> Result<Self, NotifyError> {
        let review = store.review(event.review).await?;
        Ok(Self {
            store,
            ctx: Arc::new(GroupContext {
                event,
                review,
                from_user,
                kind,
                cache: GroupCache::default(),
            }),
            state: GroupState::Created,
            pending: Vec::new(),
            prior_threads: HashMap::new(),
            assigned_threads: HashMap::new(),
        })
    }

    pub fn context(&self) -> &GroupContext {
        &self.ctx
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Recipient → assigned thread id mapping, populated by `generate`
    /// when thread correlation is on and kept after commit.
    pub fn thread_ids(&self) -> &HashMap<DbId, String> {
        &self.assigned_threads
    }

    /// Seed the prior-thread mapping for one recipient.
    pub fn set_prior_thread(&mut self, user: DbId, message_id: String) {
        self.prior_threads.insert(user, message_id);
    }

    /// Load prior thread ids for every candidate recipient from the
    /// thread-correlation store.
    pub async fn load_prior_threads(
        &mut self,
        threads: &dyn ThreadStore,
    ) -> Result<(), NotifyError> {
        let review = &self.ctx.review;
        let candidates: BTreeSet<DbId> = review
            .owners
            .iter()
            .chain(&review.assigned_reviewers)
            .chain(&review.watchers)
            .copied()
            .collect();
        for user in candidates {
            if let Some(message_id) = threads.prior_thread(review.id, user).await? {
                self.prior_threads.insert(user, message_id);
            }
        }
        Ok(())
    }

    /// Compose an email per resolved recipient and queue the kept ones.
    ///
    /// Recipients are composed concurrently; any single failure fails
    /// the whole call and nothing from it is queued. May be called more
    /// than once — pending emails accumulate across calls.
    pub async fn generate<G: EmailGenerator>(
        &mut self,
        generator: &G,
        thread_correlation: bool,
    ) -> Result<(), NotifyError> {
        match self.state {
            GroupState::Created => self.state = GroupState::Generating,
            GroupState::Generating => {}
            GroupState::Committed => return Err(NotifyError::GroupClosed("committed")),
            GroupState::Aborted => return Err(NotifyError::GroupClosed("aborted")),
        }

        let prefix = message_id_prefix(&self.ctx.event);
        let recipients =
            recipients::resolve(self.store.as_ref(), &self.ctx.review, self.ctx.kind).await?;

        let store = self.store.as_ref();
        let ctx = &self.ctx;
        let prior_threads = &self.prior_threads;
        let composed = futures::future::try_join_all(recipients.into_iter().map(|to_user| {
            let prefix = prefix.clone();
            async move {
                let parent = prior_threads.get(&to_user.id).cloned();
                let mut email =
                    Email::create(store, Arc::clone(ctx), to_user, &prefix, parent).await?;
                tracing::debug!(email = ?email, "generating");
                if generator.compose(&mut email).await? {
                    Ok::<_, NotifyError>(Some(email))
                } else {
                    tracing::debug!(email = ?email, "skipped by generator");
                    Ok(None)
                }
            }
        }))
        .await?;

        // Single-writer section: queue results and record thread ids.
        for email in composed.into_iter().flatten() {
            if thread_correlation {
                self.assigned_threads
                    .insert(email.recipient().id, email.message_id().to_string());
            }
            self.pending.push(email);
        }
        Ok(())
    }

    /// Finalize every pending email and publish the batch to the bus in
    /// one call. Terminal; a group commits at most once.
    ///
    /// An empty pending list still publishes one empty batch, matching
    /// the contract that the bus sees exactly one publication per
    /// committed group.
    pub async fn commit(&mut self, bus: &dyn OutboundBus) -> Result<usize, NotifyError> {
        match self.state {
            GroupState::Committed => return Err(NotifyError::GroupClosed("committed")),
            GroupState::Aborted => return Err(NotifyError::GroupClosed("aborted")),
            GroupState::Created | GroupState::Generating => {}
        }

        let batch: Vec<_> = self.pending.iter().map(Email::finish).collect();
        let count = batch.len();
        bus.publish(EMAIL_TOPIC, batch).await?;

        self.pending.clear();
        self.state = GroupState::Committed;
        tracing::info!(
            count,
            event_id = self.ctx.event.id,
            review_id = self.ctx.review.id,
            "notification batch published"
        );
        Ok(count)
    }

    /// Discard all pending emails; nothing reaches the bus. Terminal.
    pub fn abort(&mut self) {
        if matches!(self.state, GroupState::Committed | GroupState::Aborted) {
            return;
        }
        tracing::debug!(
            discarded = self.pending.len(),
            event_id = self.ctx.event.id,
            "notification group aborted"
        );
        self.pending.clear();
        self.assigned_threads.clear();
        self.state = GroupState::Aborted;
    }

    /// Scoped delivery: create, generate, and commit a group, aborting
    /// on any failure along the way.
    ///
    /// This is the guaranteed-release form of the commit contract:
    /// every exit path other than a clean commit (including the future
    /// being dropped on cancellation) leaves the bus untouched. Returns
    /// the committed group so the caller can persist its thread ids.
    #[allow(clippy::too_many_arguments)]
    pub async fn deliver<G: EmailGenerator>(
        store: Arc<dyn DataStore>,
        bus: &dyn OutboundBus,
        threads: Option<&dyn ThreadStore>,
        event: ReviewEvent,
        from_user: User,
        kind: EmailKind,
        generator: &G,
        thread_correlation: bool,
    ) -> Result<NotificationGroup, NotifyError> {
        let mut group = NotificationGroup::new(store, event, from_user, kind).await?;
        if thread_correlation {
            if let Some(threads) = threads {
                group.load_prior_threads(threads).await?;
            }
        }
        let generated = group.generate(generator, thread_correlation).await;
        match generated {
            Ok(()) => match group.commit(bus).await {
                Ok(_) => Ok(group),
                Err(err) => {
                    group.abort();
                    Err(err)
                }
            },
            Err(err) => {
                group.abort();
                Err(err)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
