//! Booking Cache Library
//!
//! Serves a single booking record from a TTL cache, refreshing it from an
//! upstream source when stale and falling back to the cached copy when the
//! upstream is unavailable.

pub mod cache;
pub mod cli;
pub mod data;
pub mod logging;
pub mod refresh;
pub mod store;
