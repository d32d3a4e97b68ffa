//! # Kitchen Dispatch
//!
//! Pushes committed orders to kitchen displays, one broadcast channel per
//! store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kitchen Hub Architecture                         │
//! │                                                                         │
//! │  OrderCommitService                                                     │
//! │       │ notify(KitchenEvent::OrderCreated(ticket))                      │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  KitchenHub                                                     │   │
//! │  │  RwLock<HashMap<store_id, broadcast::Sender<KitchenEvent>>>     │   │
//! │  │                                                                 │   │
//! │  │   "store-1" ──► Sender ──┬──► display A (/kitchen/ws?storeId=)  │   │
//! │  │                          └──► display B                         │   │
//! │  │   "store-2" ──► Sender ─────► display C                         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Delivery is best-effort: a store with no display connected, or a       │
//! │  display that lags past the channel capacity, misses events. The sale   │
//! │  itself is never affected.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

use meridian_core::kitchen::KitchenEvent;

/// Ping interval to keep display connections alive.
const PING_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Notifier Seam
// =============================================================================

/// Kitchen delivery failures. Logged by the caller, never surfaced to the POS.
#[derive(Debug, Error)]
pub enum KitchenError {
    #[error("No kitchen display connected for store {0}")]
    NoSubscribers(String),

    #[error("Kitchen dispatch failed: {0}")]
    Dispatch(String),
}

/// Delivers kitchen events. The commit pipeline depends only on this trait.
#[async_trait]
pub trait KitchenNotifier: Send + Sync {
    async fn notify(&self, event: KitchenEvent) -> Result<(), KitchenError>;
}

// =============================================================================
// Kitchen Hub
// =============================================================================

/// In-process per-store broadcast of kitchen events.
#[derive(Clone)]
pub struct KitchenHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<KitchenEvent>>>>,
    capacity: usize,
}

impl KitchenHub {
    /// Creates a hub buffering up to `capacity` events per store.
    pub fn new(capacity: usize) -> Self {
        KitchenHub {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to a store's channel, creating it on first use.
    pub async fn subscribe(&self, store_id: &str) -> broadcast::Receiver<KitchenEvent> {
        let mut channels = self.channels.write().await;
        channels
            .entry(store_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of displays currently listening to a store.
    pub async fn subscriber_count(&self, store_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(store_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drops a store's channel once its last display has gone.
    async fn release(&self, store_id: &str) {
        let mut channels = self.channels.write().await;
        if channels
            .get(store_id)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(store_id);
            debug!(store_id = %store_id, "Kitchen channel released");
        }
    }
}

#[async_trait]
impl KitchenNotifier for KitchenHub {
    async fn notify(&self, event: KitchenEvent) -> Result<(), KitchenError> {
        let store_id = event.store_id().to_string();
        let channels = self.channels.read().await;
        let sender = channels
            .get(&store_id)
            .ok_or_else(|| KitchenError::NoSubscribers(store_id.clone()))?;

        let delivered = sender
            .send(event)
            .map_err(|_| KitchenError::NoSubscribers(store_id.clone()))?;
        debug!(store_id = %store_id, displays = delivered, "Kitchen event broadcast");
        Ok(())
    }
}

// =============================================================================
// WebSocket Session
// =============================================================================

/// Streams a store's kitchen events to one display until either side closes.
pub async fn run_display_session(socket: WebSocket, hub: KitchenHub, store_id: String) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.subscribe(&store_id).await;
    let mut ping = interval(PING_INTERVAL);

    info!(store_id = %store_id, "Kitchen display connected");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(store_id = %store_id, error = %e, "Failed to encode kitchen event");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(store_id = %store_id, skipped, "Kitchen display lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = ping.tick() => {
                if sender.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                // Displays are receive-only; anything else is ignored.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(store_id = %store_id, error = %e, "Kitchen display socket error");
                    break;
                }
            },
        }
    }

    drop(events);
    hub.release(&store_id).await;
    info!(store_id = %store_id, "Kitchen display disconnected");
}
