//! Background refresh scheduling
//!
//! Runs cache refreshes on an interval and on demand, forwarding every
//! [`LoadState`] to the owner through a tokio channel. Runs never overlap:
//! a trigger arriving mid-run is handled once the current run completes.

use std::time::Duration;

use futures::StreamExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::cache::{CacheOrchestrator, LoadState};
use crate::data::UpstreamSource;
use crate::store::PersistentStore;

/// Messages sent from the background task to its owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshMessage<R> {
    /// A refresh is starting
    RefreshStarted { force_refresh: bool },
    /// Progress of the running refresh
    State(LoadState<R>),
    /// The running refresh reached its terminal state
    RefreshCompleted,
}

/// Configuration for periodic refreshes
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Time between periodic refreshes
    pub interval: Duration,
    /// Whether the background task runs at all
    pub enabled: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
            enabled: true,
        }
    }
}

/// Handle for controlling the background refresh task
///
/// Dropping the handle stops the task.
pub struct RefreshHandle<R> {
    /// Channel for receiving refresh messages
    pub receiver: mpsc::Receiver<RefreshMessage<R>>,
    /// Requests an immediate refresh, carrying the force flag
    trigger_tx: mpsc::Sender<bool>,
    /// Signals shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl<R> RefreshHandle<R>
where
    R: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Spawns the background task for `cache`
    ///
    /// The first periodic refresh happens one `interval` after spawning; use
    /// [`request_refresh`](Self::request_refresh) for an immediate one.
    pub fn spawn<S, U>(cache: CacheOrchestrator<S, U>, config: RefreshConfig) -> Self
    where
        S: PersistentStore + 'static,
        U: UpstreamSource<Record = R>,
    {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<bool>(4);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    let force_refresh = tokio::select! {
                        _ = interval.tick() => false,
                        Some(force) = trigger_rx.recv() => force,
                        _ = shutdown_rx.recv() => break,
                    };

                    if !run_refresh(&cache, force_refresh, &msg_tx).await {
                        debug!("refresh receiver dropped, stopping background refresh");
                        break;
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            trigger_tx,
            shutdown_tx,
        }
    }

    /// Requests an immediate refresh
    pub async fn request_refresh(&self, force_refresh: bool) {
        let _ = self.trigger_tx.send(force_refresh).await;
    }

    /// Shuts down the background task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Runs one refresh and forwards its states; returns false once nobody listens
async fn run_refresh<S, U>(
    cache: &CacheOrchestrator<S, U>,
    force_refresh: bool,
    tx: &mpsc::Sender<RefreshMessage<U::Record>>,
) -> bool
where
    S: PersistentStore + 'static,
    U: UpstreamSource,
    U::Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    if tx
        .send(RefreshMessage::RefreshStarted { force_refresh })
        .await
        .is_err()
    {
        return false;
    }

    let mut states = cache.refresh(force_refresh);
    while let Some(state) = states.next().await {
        if tx.send(RefreshMessage::State(state)).await.is_err() {
            return false;
        }
    }

    tx.send(RefreshMessage::RefreshCompleted).await.is_ok()
}

/// Checks for pending refresh messages without blocking
///
/// # Returns
/// * `Some(RefreshMessage)` if a message was available
/// * `None` if no messages are pending
pub fn try_recv<R>(handle: &mut RefreshHandle<R>) -> Option<RefreshMessage<R>> {
    handle.receiver.try_recv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::data::{Booking, BundledSource};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn bundled_cache() -> CacheOrchestrator<MemoryStore, BundledSource> {
        CacheOrchestrator::new(
            Arc::new(MemoryStore::new()),
            BundledSource::new(),
            CacheConfig::default(),
        )
    }

    async fn next_message(handle: &mut RefreshHandle<Booking>) -> RefreshMessage<Booking> {
        tokio::time::timeout(Duration::from_secs(2), handle.receiver.recv())
            .await
            .expect("timed out waiting for refresh message")
            .expect("refresh task stopped")
    }

    #[test]
    fn test_refresh_config_default() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_refresh_handle_spawn_disabled() {
        let config = RefreshConfig {
            enabled: false,
            ..Default::default()
        };

        let mut handle = RefreshHandle::spawn(bundled_cache(), config);
        handle.request_refresh(true).await;

        // With refresh disabled, there should be no messages
        assert!(try_recv(&mut handle).is_none());
    }

    #[tokio::test]
    async fn test_requested_refresh_forwards_every_state() {
        let mut handle = RefreshHandle::spawn(bundled_cache(), RefreshConfig::default());

        handle.request_refresh(true).await;

        assert_eq!(
            next_message(&mut handle).await,
            RefreshMessage::RefreshStarted { force_refresh: true }
        );
        assert_eq!(
            next_message(&mut handle).await,
            RefreshMessage::State(LoadState::Loading)
        );
        match next_message(&mut handle).await {
            RefreshMessage::State(LoadState::Success(booking)) => {
                assert_eq!(booking.reference, "BK-20261018-0042");
            }
            other => panic!("expected Success, got {:?}", other),
        }
        assert_eq!(next_message(&mut handle).await, RefreshMessage::RefreshCompleted);
    }

    #[tokio::test]
    async fn test_interval_tick_triggers_unforced_refresh() {
        let config = RefreshConfig {
            interval: Duration::from_millis(20),
            enabled: true,
        };
        let mut handle = RefreshHandle::spawn(bundled_cache(), config);

        assert_eq!(
            next_message(&mut handle).await,
            RefreshMessage::RefreshStarted { force_refresh: false }
        );
    }

    #[tokio::test]
    async fn test_back_to_back_requests_run_one_after_another() {
        let mut handle = RefreshHandle::spawn(bundled_cache(), RefreshConfig::default());

        handle.request_refresh(true).await;
        handle.request_refresh(false).await;

        for force_refresh in [true, false] {
            assert_eq!(
                next_message(&mut handle).await,
                RefreshMessage::RefreshStarted { force_refresh }
            );
            assert_eq!(
                next_message(&mut handle).await,
                RefreshMessage::State(LoadState::Loading)
            );
            assert!(matches!(
                next_message(&mut handle).await,
                RefreshMessage::State(LoadState::Success(_))
            ));
            assert_eq!(next_message(&mut handle).await, RefreshMessage::RefreshCompleted);
        }
        assert!(try_recv(&mut handle).is_none());
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let cache = bundled_cache();
        let handle = RefreshHandle::spawn(cache, RefreshConfig::default());
        let RefreshHandle {
            mut receiver,
            trigger_tx,
            shutdown_tx,
        } = handle;

        shutdown_tx.send(()).await.unwrap();
        drop(trigger_tx);

        let closed = tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .expect("task should stop after shutdown");
        assert!(closed.is_none());
    }
}
