// Fallback transports for pages that cannot reach the extension directly
//
// Shared storage: the page writes `pendingWalletAddress`, the content script
// on that page polls it once per interval for a bounded window and consumes
// it. Window message: the page posts WALLET_CONNECTED, the content script
// relays it.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::BridgeConfig;
use crate::error::StoreError;
use crate::protocol::{Channel, ConnectionEvent, Response, WindowMessage};
use crate::store::{ConnectionStore, StorageMap};

#[async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

/// Destination of bridged connection events.
#[async_trait(?Send)]
pub trait EventSink {
    async fn deliver(&self, event: ConnectionEvent) -> Response;
}

#[derive(Clone, Debug, PartialEq)]
pub enum PollOutcome {
    Delivered {
        address: String,
        checks: u32,
        response: Response,
    },
    /// Window elapsed with nothing pending
    Expired { checks: u32 },
}

pub struct PendingAddressBridge<S> {
    store: S,
    key: String,
    interval: Duration,
    window: Duration,
}

impl<S: ConnectionStore> PendingAddressBridge<S> {
    pub fn new(store: S, key: impl Into<String>, interval: Duration, window: Duration) -> Self {
        Self {
            store,
            key: key.into(),
            interval,
            window,
        }
    }

    pub fn from_config(store: S, config: &BridgeConfig) -> Self {
        Self::new(
            store,
            config.pending_key.clone(),
            config.poll_interval(),
            config.poll_window(),
        )
    }

    /// Checks happen at 0, 1, .. n-1 intervals, so none lands at or past
    /// the end of the window.
    pub fn max_checks(&self) -> u32 {
        let interval = self.interval.as_millis().max(1);
        (self.window.as_millis() / interval).max(1) as u32
    }

    pub async fn write_pending(&self, address: &str) -> Result<(), StoreError> {
        let mut items = StorageMap::new();
        items.insert(self.key.clone(), Value::String(address.to_string()));
        self.store.set(items).await
    }

    /// Read and remove the pending address, so each write is delivered at
    /// most once.
    pub async fn take_pending(&self) -> Result<Option<String>, StoreError> {
        let mut result = self.store.get(&[self.key.as_str()]).await?;
        let Some(value) = result.remove(&self.key) else {
            return Ok(None);
        };
        self.store.remove(&[self.key.as_str()]).await?;

        match value {
            Value::String(address) if !address.trim().is_empty() => {
                Ok(Some(address.trim().to_string()))
            }
            other => {
                log::warn!("Discarding malformed pending address: {}", other);
                Ok(None)
            }
        }
    }

    pub async fn poll<T, K>(&self, timer: &T, sink: &K) -> PollOutcome
    where
        T: Timer + ?Sized,
        K: EventSink + ?Sized,
    {
        let max_checks = self.max_checks();
        log::debug!(
            "Polling '{}' every {:?} for up to {} checks",
            self.key,
            self.interval,
            max_checks
        );

        for check in 0..max_checks {
            if check > 0 {
                timer.sleep(self.interval).await;
            }

            match self.take_pending().await {
                Ok(Some(address)) => {
                    log::info!("Found pending wallet address: {}", address);
                    let event = ConnectionEvent::connected(address.clone(), Channel::SharedStorage);
                    let response = sink.deliver(event).await;
                    return PollOutcome::Delivered {
                        address,
                        checks: check + 1,
                        response,
                    };
                }
                Ok(None) => {}
                Err(err) => log::warn!("Failed to read pending wallet address: {}", err),
            }
        }

        log::info!("Stopped polling for pending wallet address after {} checks", max_checks);
        PollOutcome::Expired { checks: max_checks }
    }
}

/// Turn a same-page window message into a connection event.
///
/// Anything that is not a well-formed `WALLET_CONNECTED` with a non-blank
/// key is ignored; pages post all kinds of messages.
pub fn relay_window_message(data: &Value) -> Option<ConnectionEvent> {
    let message: WindowMessage = serde_json::from_value(data.clone()).ok()?;
    match message {
        WindowMessage::WalletConnected { public_key } => {
            let event = ConnectionEvent::connected(public_key, Channel::WindowMessage);
            event.address.is_some().then_some(event)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;
    use crate::store::MemoryStore;
    use crate::testing::{ReadLogStore, RecordingSink, TokioTimer};
    use serde_json::json;
    use std::rc::Rc;
    use tokio::time::Instant;

    const KEY: &str = "pendingWalletAddress";

    fn bridge<S: ConnectionStore>(store: S) -> PendingAddressBridge<S> {
        PendingAddressBridge::from_config(store, &BridgeConfig::default())
    }

    #[test]
    fn test_default_window_allows_sixty_checks() {
        assert_eq!(bridge(MemoryStore::new()).max_checks(), 60);
        let tight = PendingAddressBridge::new(
            MemoryStore::new(),
            KEY,
            Duration::from_millis(1500),
            Duration::from_millis(1000),
        );
        assert_eq!(tight.max_checks(), 1);
    }

    #[tokio::test]
    async fn test_take_pending_consumes_once() {
        let store = Rc::new(MemoryStore::new());
        let bridge = bridge(store.clone());
        bridge.write_pending("Addr1").await.unwrap();

        assert_eq!(bridge.take_pending().await.unwrap().as_deref(), Some("Addr1"));
        assert_eq!(bridge.take_pending().await.unwrap(), None);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_blank_pending_value_is_dropped() {
        let store = Rc::new(MemoryStore::new());
        let bridge = bridge(store.clone());
        bridge.write_pending("   ").await.unwrap();

        assert_eq!(bridge.take_pending().await.unwrap(), None);
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stops_at_window() {
        let store = Rc::new(ReadLogStore::new());
        let bridge = bridge(store.clone());
        let sink = RecordingSink::new();

        let start = Instant::now();
        let outcome = bridge.poll(&TokioTimer, &sink).await;

        assert_eq!(outcome, PollOutcome::Expired { checks: 60 });
        assert!(sink.events().is_empty());

        let reads = store.reads();
        assert_eq!(reads.len(), 60);
        for (i, at) in reads.iter().enumerate() {
            assert_eq!(*at - start, Duration::from_secs(i as u64));
        }
        assert!(reads.iter().all(|at| *at - start < Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_delivers_late_write() {
        let store = Rc::new(ReadLogStore::new());
        store.inject_on_read(3, KEY, json!("LateAddr"));
        let bridge = bridge(store.clone());
        let sink = RecordingSink::new();

        let start = Instant::now();
        let outcome = bridge.poll(&TokioTimer, &sink).await;

        match outcome {
            PollOutcome::Delivered {
                address,
                checks,
                response,
            } => {
                assert_eq!(address, "LateAddr");
                assert_eq!(checks, 4);
                assert_eq!(response.status, Status::Success);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(Instant::now() - start, Duration::from_secs(3));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].origin, Channel::SharedStorage);
        assert_eq!(events[0].address.as_deref(), Some("LateAddr"));
        assert!(store.inner().snapshot().is_empty());
    }

    #[test]
    fn test_window_message_relay() {
        let event =
            relay_window_message(&json!({"type": "WALLET_CONNECTED", "publicKey": "Abc"})).unwrap();
        assert_eq!(event.origin, Channel::WindowMessage);
        assert_eq!(event.address.as_deref(), Some("Abc"));

        assert!(relay_window_message(&json!({"type": "WALLET_CONNECTED", "publicKey": ""})).is_none());
        assert!(relay_window_message(&json!({"type": "SOMETHING_ELSE"})).is_none());
        assert!(relay_window_message(&json!("hello")).is_none());
    }
}
