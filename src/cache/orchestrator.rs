//! Cache policy: when to trust the cache, when to fetch, when to fall back
//!
//! A [`CacheOrchestrator`] keeps one record per namespace in a
//! [`PersistentStore`] as three slots (payload, expiry, last update) and
//! consults an [`UpstreamSource`] only when the cached copy is missing,
//! expired, or a refresh is forced. When the upstream fails, an existing
//! cached record is served even if it has expired. Expiry and last-update
//! timestamps only move on a successful fetch.
//!
//! Concurrent callers of the same orchestrator (or its clones) that decide to
//! fetch share a single upstream call and all observe its result.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt, Shared};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{LoadError, LoadState};
use crate::data::{SourceError, UpstreamSource};
use crate::store::{PersistentStore, StoreError};

/// Default time after which a cached record is considered stale (10 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

/// Default upper bound on one upstream fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "booking";

/// Configuration for a cache orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Prefix for the persisted keys
    pub namespace: String,
    /// How long a fetched record stays fresh
    pub ttl: Duration,
    /// Longest an upstream fetch may run before it counts as failed
    pub fetch_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Store keys holding one namespace's cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    /// Serialized record
    pub payload: String,
    /// Expiry, epoch milliseconds
    pub expires_at: String,
    /// Last successful fetch, epoch milliseconds
    pub updated_at: String,
}

impl CacheKeys {
    pub fn for_namespace(namespace: &str) -> Self {
        Self {
            payload: format!("{}.payload", namespace),
            expires_at: format!("{}.expires_at", namespace),
            updated_at: format!("{}.updated_at", namespace),
        }
    }
}

type Outcome<R> = Result<R, Arc<LoadError>>;
type InFlight<R> = Shared<BoxFuture<'static, Outcome<R>>>;

/// Serves one record from a TTL cache with stale fallback
///
/// Cloning is cheap and clones share the same in-flight fetch slot, so a
/// process should hand out clones of a single orchestrator per namespace.
pub struct CacheOrchestrator<S, U: UpstreamSource> {
    inner: Arc<Inner<S, U>>,
}

struct Inner<S, U: UpstreamSource> {
    store: Arc<S>,
    source: U,
    keys: CacheKeys,
    ttl_millis: i64,
    fetch_timeout: Duration,
    inflight: Mutex<Option<InFlight<U::Record>>>,
}

impl<S, U: UpstreamSource> Clone for CacheOrchestrator<S, U> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, U> CacheOrchestrator<S, U>
where
    S: PersistentStore + 'static,
    U: UpstreamSource,
    U::Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Creates an orchestrator over a shared store and an upstream source
    pub fn new(store: Arc<S>, source: U, config: CacheConfig) -> Self {
        let ttl_millis = i64::try_from(config.ttl.as_millis()).unwrap_or(i64::MAX);
        Self {
            inner: Arc::new(Inner {
                store,
                source,
                keys: CacheKeys::for_namespace(&config.namespace),
                ttl_millis,
                fetch_timeout: config.fetch_timeout,
                inflight: Mutex::new(None),
            }),
        }
    }

    /// Keys this orchestrator reads and writes
    pub fn keys(&self) -> &CacheKeys {
        &self.inner.keys
    }

    /// Resolves the record, reporting progress as a stream
    ///
    /// The stream is lazy: nothing is read or fetched until it is polled past
    /// the initial `Loading`. It yields `Loading` followed by exactly one
    /// terminal state and then ends.
    pub fn refresh(&self, force_refresh: bool) -> BoxStream<'static, LoadState<U::Record>> {
        let this = self.clone();
        stream::once(future::ready(LoadState::Loading))
            .chain(stream::once(async move {
                match this.resolve(force_refresh).await {
                    Ok(record) => LoadState::Success(record),
                    Err(err) => LoadState::Error(err.to_string()),
                }
            }))
            .boxed()
    }

    /// Resolves the record without progress reporting
    ///
    /// Uses the same decision and side effects as [`refresh`](Self::refresh);
    /// returns `None` exactly when `refresh` would end in `Error`.
    pub async fn get_data(&self, force_refresh: bool) -> Option<U::Record> {
        self.resolve(force_refresh).await.ok()
    }

    /// Time of the last successful upstream fetch, `None` if never
    pub fn last_update_time(&self) -> Option<DateTime<Utc>> {
        match self.inner.read_millis(&self.inner.keys.updated_at) {
            0 => None,
            millis => DateTime::<Utc>::from_timestamp_millis(millis),
        }
    }

    /// Time after which the cached record is stale, `None` if nothing was cached
    pub fn expiry_time(&self) -> Option<DateTime<Utc>> {
        match self.inner.read_millis(&self.inner.keys.expires_at) {
            0 => None,
            millis => DateTime::<Utc>::from_timestamp_millis(millis),
        }
    }

    /// Deletes the cached record and its timestamps
    ///
    /// Calling this on an empty cache succeeds.
    pub fn clear_cache(&self) -> Result<(), StoreError> {
        let keys = &self.inner.keys;
        let store = &self.inner.store;
        store.remove(&keys.payload)?;
        store.remove(&keys.expires_at)?;
        store.remove(&keys.updated_at)?;
        info!(payload_key = %keys.payload, "cache cleared");
        Ok(())
    }

    async fn resolve(&self, force_refresh: bool) -> Outcome<U::Record> {
        let inner = &self.inner;
        let cached = inner.read_cached();
        let expires_at = inner.read_millis(&inner.keys.expires_at);
        let now = Utc::now().timestamp_millis();

        let cached = match cached {
            Some(record) if !force_refresh && now <= expires_at => {
                debug!(expires_in_ms = expires_at - now, "serving cached record");
                return Ok(record);
            }
            other => other,
        };

        debug!(
            force_refresh,
            has_cached = cached.is_some(),
            expired = now > expires_at,
            "fetching from upstream"
        );

        match self.fetch_shared().await {
            Ok(fresh) => Ok(fresh),
            Err(err) => match cached {
                Some(stale) => {
                    warn!(error = %err, "upstream fetch failed, serving stale record");
                    Ok(stale)
                }
                None => {
                    warn!(error = %err, "upstream fetch failed and nothing is cached");
                    Err(err)
                }
            },
        }
    }

    /// Joins the in-flight upstream fetch, starting one if none is running
    async fn fetch_shared(&self) -> Outcome<U::Record> {
        let flight = {
            let mut slot = self.inner.lock_inflight();
            match slot.as_ref() {
                Some(running) if running.peek().is_none() => {
                    debug!("joining in-flight upstream fetch");
                    running.clone()
                }
                _ => {
                    let inner = Arc::clone(&self.inner);
                    let started = async move { inner.fetch_and_store().await }
                        .boxed()
                        .shared();
                    *slot = Some(started.clone());
                    started
                }
            }
        };

        let outcome = flight.clone().await;

        let mut slot = self.inner.lock_inflight();
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&flight)) {
            *slot = None;
        }
        outcome
    }
}

impl<S, U> Inner<S, U>
where
    S: PersistentStore + 'static,
    U: UpstreamSource,
    U::Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn lock_inflight(&self) -> std::sync::MutexGuard<'_, Option<InFlight<U::Record>>> {
        self.inflight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the cached record; unreadable or undecodable data counts as absent
    fn read_cached(&self) -> Option<U::Record> {
        let raw = match self.store.get_string(&self.keys.payload) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, key = %self.keys.payload, "failed to read cached record");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, key = %self.keys.payload, "discarding undecodable cached record");
                None
            }
        }
    }

    /// Reads a timestamp slot; absent or unreadable values read as 0
    fn read_millis(&self, key: &str) -> i64 {
        self.store.get_i64(key, 0).unwrap_or_else(|e| {
            warn!(error = %e, key, "failed to read timestamp");
            0
        })
    }

    async fn fetch_and_store(&self) -> Outcome<U::Record> {
        // Bounded so every flight settles for the callers sharing it
        let fetch = AssertUnwindSafe(self.source.fetch()).catch_unwind();
        let record = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(Ok(record))) => record,
            Ok(Ok(Err(e))) => return Err(Arc::new(LoadError::Upstream(e))),
            Ok(Err(panic)) => return Err(Arc::new(LoadError::Panicked(panic_message(&*panic)))),
            Err(_) => {
                let timeout = SourceError::Timeout(self.fetch_timeout);
                return Err(Arc::new(LoadError::Upstream(timeout)));
            }
        };
        self.persist(&record);
        Ok(record)
    }

    /// Writes payload, then expiry, then last update
    ///
    /// Failures are logged; the fetched record is still returned to callers.
    fn persist(&self, record: &U::Record) {
        let payload = match serde_json::to_string(record) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to encode fetched record, not caching it");
                return;
            }
        };

        let now = Utc::now().timestamp_millis();
        let expires_at = now.saturating_add(self.ttl_millis);
        let written = self
            .store
            .put_string(&self.keys.payload, &payload)
            .and_then(|()| self.store.put_i64(&self.keys.expires_at, expires_at))
            .and_then(|()| self.store.put_i64(&self.keys.updated_at, now));

        match written {
            Ok(()) => info!(updated_at = now, expires_at, "cached fresh record"),
            Err(e) => warn!(error = %e, "failed to persist fetched record"),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
