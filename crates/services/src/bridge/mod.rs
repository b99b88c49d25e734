// Path: crates/services/src/bridge/mod.rs
//! The Observation/Control Bridge.
//!
//! The agent and the UI renderer never talk to each other directly. They
//! exchange two values through a [`SharedStateStore`]:
//!
//! * the **command slot**, overwritten by the agent via [`Bridge::dispatch_command`]
//!   and read by the renderer;
//! * the **snapshot slot**, overwritten by the renderer and streamed to the
//!   agent via [`Bridge::observe`].
//!
//! Both slots are last-write-wins. A command written while another one is
//! still unread replaces it; there is no queue and no acknowledgement beyond
//! the write itself.

pub mod redis;
pub mod store;

pub use self::redis::RedisStore;
pub use store::{InMemoryStore, SharedStateStore};

use aether_telemetry::bridge_metrics;
use aether_types::app::{ControlAck, ControlCommand, DispatchStatus, UiSnapshot};
use aether_types::config::BridgeConfig;
use aether_types::error::BridgeError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

/// Returned by a [`SnapshotSink`] when the receiving side is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerGone;

/// Where an observation loop delivers frames, typically one WebSocket connection.
#[async_trait]
pub trait SnapshotSink: Send {
    async fn push(&mut self, snapshot: &UiSnapshot) -> Result<(), PeerGone>;
}

#[async_trait]
impl SnapshotSink for mpsc::Sender<UiSnapshot> {
    async fn push(&mut self, snapshot: &UiSnapshot) -> Result<(), PeerGone> {
        self.send(snapshot.clone()).await.map_err(|_| PeerGone)
    }
}

/// Why an observation loop stopped. Neither case is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The disconnect signal fired (or its sender was dropped).
    Disconnected,
    /// A push failed because the peer is gone.
    PeerGone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserveOutcome {
    pub reason: StopReason,
    pub frames: u64,
}

/// Keeps the open-observers gauge accurate however the loop exits.
struct ObserverGuard;

impl ObserverGuard {
    fn new() -> Self {
        bridge_metrics().inc_observers();
        Self
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        bridge_metrics().dec_observers();
    }
}

#[derive(Clone)]
pub struct Bridge {
    store: Arc<dyn SharedStateStore>,
    poll_interval: Duration,
    skip_unchanged: bool,
    command_key: String,
    snapshot_key: String,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("poll_interval", &self.poll_interval)
            .field("skip_unchanged", &self.skip_unchanged)
            .field("command_key", &self.command_key)
            .field("snapshot_key", &self.snapshot_key)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    pub fn new(store: Arc<dyn SharedStateStore>, config: &BridgeConfig) -> Self {
        Self {
            store,
            // A zero interval would make `tokio::time::interval` panic.
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            skip_unchanged: config.skip_unchanged,
            command_key: config.command_key.clone(),
            snapshot_key: config.snapshot_key.clone(),
        }
    }

    /// Validates `command` and blindly overwrites the command slot with it.
    pub async fn dispatch_command(&self, command: ControlCommand) -> Result<ControlAck, BridgeError> {
        command.validate()?;
        let encoded =
            serde_json::to_string(&command).map_err(|e| BridgeError::Codec(e.to_string()))?;
        self.store.set(&self.command_key, encoded).await?;
        bridge_metrics().inc_commands_dispatched();
        tracing::info!(
            target: "bridge",
            action = %command.action,
            selector = %command.selector,
            "Dispatched control command"
        );
        Ok(ControlAck {
            status: DispatchStatus::Dispatched,
            command,
        })
    }

    /// The command currently in the slot, if any. Reading does not consume it.
    pub async fn current_command(&self) -> Result<Option<ControlCommand>, BridgeError> {
        match self.store.get(&self.command_key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| BridgeError::Codec(e.to_string())),
            None => Ok(None),
        }
    }

    /// The latest snapshot, or `{}` if the renderer has not written one yet.
    pub async fn current_snapshot(&self) -> Result<UiSnapshot, BridgeError> {
        Ok(self
            .store
            .get(&self.snapshot_key)
            .await?
            .map(UiSnapshot::new)
            .unwrap_or_default())
    }

    /// Overwrites the snapshot slot. The content is stored verbatim.
    pub async fn publish_snapshot(&self, snapshot: UiSnapshot) -> Result<(), BridgeError> {
        let len = snapshot.as_str().len();
        self.store
            .set(&self.snapshot_key, snapshot.into_inner())
            .await?;
        bridge_metrics().inc_snapshots_published();
        tracing::debug!(target: "bridge", bytes = len, "Published UI snapshot");
        Ok(())
    }

    /// Pushes the current snapshot to `sink` once per poll interval until
    /// `disconnect` fires or the sink reports the peer gone.
    ///
    /// The first frame is sent immediately. A failed store read skips that
    /// tick and is retried on the next one at the same interval.
    pub async fn observe<S: SnapshotSink>(
        &self,
        sink: &mut S,
        mut disconnect: watch::Receiver<bool>,
    ) -> ObserveOutcome {
        let _guard = ObserverGuard::new();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last: Option<UiSnapshot> = None;
        let mut frames = 0u64;

        let stop = |reason: StopReason, frames: u64| {
            tracing::debug!(target: "bridge", ?reason, frames, "Observation loop stopped");
            ObserveOutcome { reason, frames }
        };

        loop {
            if *disconnect.borrow() {
                return stop(StopReason::Disconnected, frames);
            }
            tokio::select! {
                biased;
                changed = disconnect.changed() => {
                    if changed.is_err() || *disconnect.borrow() {
                        return stop(StopReason::Disconnected, frames);
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            let snapshot = match self.current_snapshot().await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!(target: "bridge", error = %e, "Snapshot read failed");
                    continue;
                }
            };
            if self.skip_unchanged && last.as_ref() == Some(&snapshot) {
                continue;
            }

            let pushed = tokio::select! {
                biased;
                _ = disconnect.changed() => return stop(StopReason::Disconnected, frames),
                pushed = sink.push(&snapshot) => pushed,
            };
            if pushed.is_err() {
                return stop(StopReason::PeerGone, frames);
            }
            frames += 1;
            bridge_metrics().inc_frames_pushed();
            last = Some(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge(skip_unchanged: bool) -> Bridge {
        let config = BridgeConfig {
            poll_interval_ms: 100,
            skip_unchanged,
            ..BridgeConfig::default()
        };
        Bridge::new(Arc::new(InMemoryStore::new()), &config)
    }

    fn click(selector: &str) -> ControlCommand {
        ControlCommand {
            action: "CLICK".into(),
            selector: selector.into(),
            value: None,
        }
    }

    #[tokio::test]
    async fn last_command_wins() {
        let b = bridge(false);
        let ack = b.dispatch_command(click("#a")).await.unwrap();
        assert_eq!(ack.status, DispatchStatus::Dispatched);
        b.dispatch_command(click("#b")).await.unwrap();
        assert_eq!(b.current_command().await.unwrap(), Some(click("#b")));
        // Reading does not consume the slot.
        assert_eq!(b.current_command().await.unwrap(), Some(click("#b")));
    }

    #[tokio::test]
    async fn invalid_command_is_not_written() {
        let b = bridge(false);
        let err = b.dispatch_command(click("")).await.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidCommand(_)));
        assert_eq!(b.current_command().await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_defaults_to_empty_object() {
        let b = bridge(false);
        assert_eq!(b.current_snapshot().await.unwrap().as_str(), "{}");
        b.publish_snapshot(UiSnapshot::new(r#"{"elements":[]}"#))
            .await
            .unwrap();
        assert_eq!(
            b.current_snapshot().await.unwrap().as_str(),
            r#"{"elements":[]}"#
        );
    }

    #[tokio::test(start_paused = true)]
    async fn first_frame_is_empty_then_follows_store() {
        let b = bridge(false);
        let (tx, mut rx) = mpsc::channel(1);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let observer = b.clone();
        let task = tokio::spawn(async move {
            let mut sink = tx;
            observer.observe(&mut sink, stop_rx).await
        });

        assert_eq!(rx.recv().await.unwrap().as_str(), "{}");
        b.publish_snapshot(UiSnapshot::new(r#"{"screen":"home"}"#))
            .await
            .unwrap();
        loop {
            let frame = rx.recv().await.unwrap();
            if frame.as_str() != "{}" {
                assert_eq!(frame.as_str(), r#"{"screen":"home"}"#);
                break;
            }
        }
        drop(rx);
        let outcome = task.await.unwrap();
        assert_eq!(outcome.reason, StopReason::PeerGone);
        assert!(outcome.frames >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_frames_are_skipped_when_enabled() {
        let b = bridge(true);
        let (tx, mut rx) = mpsc::channel(8);
        let (_stop_tx, stop_rx) = watch::channel(false);
        let observer = b.clone();
        tokio::spawn(async move {
            let mut sink = tx;
            observer.observe(&mut sink, stop_rx).await
        });

        assert_eq!(rx.recv().await.unwrap().as_str(), "{}");
        b.publish_snapshot(UiSnapshot::new("x")).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().as_str(), "x");
    }

    #[tokio::test]
    async fn disconnect_stops_promptly() {
        let b = Bridge::new(
            Arc::new(InMemoryStore::new()),
            &BridgeConfig {
                poll_interval_ms: 60_000,
                ..BridgeConfig::default()
            },
        );
        let (tx, mut rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut sink = tx;
            b.observe(&mut sink, stop_rx).await
        });
        // Immediate first frame, then the loop parks on a one-minute tick.
        assert_eq!(rx.recv().await.unwrap().as_str(), "{}");
        stop_tx.send(true).unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("observe loop did not stop")
            .unwrap();
        assert_eq!(
            outcome,
            ObserveOutcome {
                reason: StopReason::Disconnected,
                frames: 1
            }
        );
    }

    #[tokio::test]
    async fn dropped_signal_sender_counts_as_disconnect() {
        let b = bridge(false);
        let (tx, _rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);
        drop(stop_tx);
        let mut sink = tx;
        let outcome = tokio::time::timeout(Duration::from_secs(1), b.observe(&mut sink, stop_rx))
            .await
            .unwrap();
        assert_eq!(outcome.reason, StopReason::Disconnected);
    }
}
