//! Subscription-to-handler event dispatch.
//!
//! [`EventDispatcher`] consumes message handles from a [`Subscription`]
//! and routes review-publication events to the registered
//! [`PublishedHandler`]. Malformed or irrelevant payloads are logged
//! and skipped, never raised; every message is acknowledged exactly
//! once regardless of handler outcome; cancellation stops the loop and
//! drops any in-flight handling (which resolves to the group's abort
//! path).

use std::sync::Arc;

use async_trait::async_trait;
use remark_core::model::{EventKind, ReviewEvent};
use remark_core::types::DbId;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::NotifyError;
use crate::store::DataStore;

/// Payload type tag announcing a newly created review event.
pub const CREATED_REVIEW_EVENT: &str = "created_review_event";

// ---------------------------------------------------------------------------
// InboundMessage
// ---------------------------------------------------------------------------

/// A message handle from the event subscription.
///
/// Acknowledgement fires exactly once: explicitly via [`ack`](Self::ack)
/// or, failing that, on drop. Once acknowledged the transport will not
/// redeliver the message.
pub struct InboundMessage {
    payload: serde_json::Value,
    on_ack: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl InboundMessage {
    pub fn new(payload: serde_json::Value, on_ack: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            payload,
            on_ack: Some(Box::new(on_ack)),
        }
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// Acknowledge the message.
    pub fn ack(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(on_ack) = self.on_ack.take() {
            on_ack();
        }
    }
}

impl Drop for InboundMessage {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A stream of inbound message handles from the event source.
#[async_trait]
pub trait Subscription: Send {
    /// Next message, or `None` once the subscription has ended.
    async fn next_message(&mut self) -> Option<InboundMessage>;
}

/// In-process subscription backed by an mpsc channel, for tests and the
/// worker's placeholder wiring.
pub struct ChannelSubscription {
    receiver: mpsc::Receiver<InboundMessage>,
}

impl ChannelSubscription {
    pub fn channel(capacity: usize) -> (mpsc::Sender<InboundMessage>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, Self { receiver })
    }
}

#[async_trait]
impl Subscription for ChannelSubscription {
    async fn next_message(&mut self) -> Option<InboundMessage> {
        self.receiver.recv().await
    }
}

// ---------------------------------------------------------------------------
// PublishedHandler
// ---------------------------------------------------------------------------

/// Handler invoked for each review-publication event.
#[async_trait]
pub trait PublishedHandler: Send + Sync {
    async fn handle_published(&self, event: &ReviewEvent) -> Result<(), NotifyError>;
}

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

/// Wire shape of subscription payloads we care about. Anything that
/// fails to decode into this is simply not for us.
#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(rename = "type")]
    kind: String,
    object_id: Option<DbId>,
}

/// Routes subscription messages to the published-review handler.
pub struct EventDispatcher {
    store: Arc<dyn DataStore>,
    handler: Arc<dyn PublishedHandler>,
}

impl EventDispatcher {
    pub fn new(store: Arc<dyn DataStore>, handler: Arc<dyn PublishedHandler>) -> Self {
        Self { store, handler }
    }

    /// Run the dispatch loop until the subscription ends or `cancel`
    /// fires.
    pub async fn run<S: Subscription>(&self, mut subscription: S, cancel: CancellationToken) {
        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("event dispatcher cancelled");
                    break;
                }
                message = subscription.next_message() => match message {
                    Some(message) => message,
                    None => {
                        tracing::info!("subscription closed, event dispatcher shutting down");
                        break;
                    }
                },
            };

            let handled = tokio::select! {
                _ = cancel.cancelled() => {
                    // In-flight handling is dropped here; its group
                    // aborts and nothing is published.
                    tracing::info!("event dispatcher cancelled mid-message");
                    false
                }
                _ = self.handle_message(&message) => true,
            };
            message.ack();
            if !handled {
                break;
            }
        }
    }

    /// Decode and route a single message. Per-event failures are logged
    /// and skipped; they never affect other events.
    async fn handle_message(&self, message: &InboundMessage) {
        let payload: WirePayload = match serde_json::from_value(message.payload().clone()) {
            Ok(payload) => payload,
            Err(_) => {
                tracing::debug!(payload = %message.payload(), "payload not handled");
                return;
            }
        };
        if payload.kind != CREATED_REVIEW_EVENT {
            tracing::debug!(kind = %payload.kind, "payload not handled");
            return;
        }
        let Some(object_id) = payload.object_id else {
            tracing::error!("created-review-event payload missing object id");
            return;
        };

        let event = match self.store.event(object_id).await {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = %err, object_id, "invalid event id in payload");
                return;
            }
        };

        if event.kind == EventKind::Published {
            if let Err(err) = self.handler.handle_published(&event).await {
                tracing::error!(
                    error = %err,
                    event_id = event.id,
                    review_id = event.review,
                    "failed to handle published review event"
                );
            }
        } else {
            tracing::debug!(event_id = event.id, kind = ?event.kind, "review event not handled");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
