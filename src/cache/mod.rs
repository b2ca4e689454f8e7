//! TTL cache with stale fallback for a single record
//!
//! The orchestrator decides whether to serve the cached record, fetch a new
//! one, or fall back to an expired copy when the upstream is unavailable.
//! Progress is reported as a short stream of [`LoadState`] values.

mod orchestrator;
mod state;

pub use orchestrator::{
    CacheConfig, CacheKeys, CacheOrchestrator, DEFAULT_FETCH_TIMEOUT, DEFAULT_NAMESPACE,
    DEFAULT_TTL,
};
pub use state::{LoadError, LoadState};
