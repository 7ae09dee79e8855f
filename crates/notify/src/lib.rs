//! Review notification composition and atomic delivery.
//!
//! This crate reacts to code-review lifecycle events and produces one
//! personalized email per interested participant, committed to the
//! outbound bus as a single all-or-nothing batch:
//!
//! - [`recipients`] — resolves the preference-filtered audience.
//! - [`Email`] — one recipient's message under composition.
//! - [`NotificationGroup`] — accumulates pending emails and performs
//!   the atomic commit (or abort).
//! - [`EventDispatcher`] — routes subscription payloads to the
//!   registered published-review handler.
//! - [`store`] — the external collaborator interfaces (data store,
//!   thread-correlation store, outbound bus).
//! - [`memory`] — in-memory backends for tests and placeholder wiring.

pub mod dispatcher;
pub mod email;
pub mod error;
pub mod group;
pub mod memory;
pub mod published;
pub mod recipients;
pub mod store;

#[cfg(test)]
mod testutil;

pub use dispatcher::{
    ChannelSubscription, EventDispatcher, InboundMessage, PublishedHandler, Subscription,
};
pub use email::{Email, FinishedEmail};
pub use error::NotifyError;
pub use group::{EmailGenerator, GroupCache, GroupContext, NotificationGroup, EMAIL_TOPIC};
pub use published::PublishedReviewNotifier;
pub use store::{DataStore, OutboundBus, StoreError, ThreadStore};
