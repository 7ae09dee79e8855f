//! Notification worker: hosts the event dispatcher loop.
//!
//! Runs the dispatcher over an in-process subscription against the
//! in-memory backends until real store/bus bindings are wired in.
//! Shuts down cleanly on ctrl-c; any in-flight notification group
//! aborts and publishes nothing.

use std::sync::Arc;

use remark_core::model::User;
use remark_notify::memory::{MemoryStore, MemoryThreadStore, RecordingBus};
use remark_notify::{ChannelSubscription, EventDispatcher, PublishedReviewNotifier};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Sender identity used when no real account backs the notifications.
fn system_sender() -> User {
    User {
        id: 0,
        name: "Remark".to_string(),
        email: None,
        url_prefixes: Vec::new(),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remark_worker=debug,remark_notify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(MemoryStore::default());
    let bus = Arc::new(RecordingBus::default());
    let threads = Arc::new(MemoryThreadStore::default());

    let notifier = Arc::new(PublishedReviewNotifier::new(
        store.clone(),
        bus,
        threads,
        system_sender(),
    ));
    let dispatcher = EventDispatcher::new(store, notifier);

    // The sender side is where a real transport binding would feed
    // decoded subscription messages in.
    let (_sender, subscription) = ChannelSubscription::channel(64);

    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();
    let dispatch = tokio::spawn(async move {
        dispatcher.run(subscription, loop_cancel).await;
    });

    tracing::info!("notification worker started");

    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
    cancel.cancel();
    let _ = dispatch.await;
}
