//! Logging setup using `tracing` and `tracing-subscriber`
//!
//! The library only emits `tracing` events; the binary installs a subscriber
//! writing to stderr so stdout carries nothing but command output.
//!
//! - `warn`: upstream failures, stale fallbacks, store problems (default)
//! - `info`: fetches that updated the cache, cache clears
//! - `debug`: cache hit/miss decisions, single-flight joins

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps the `-v` count to a log level
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber
///
/// `RUST_LOG` overrides the verbosity flag when set. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_logging(verbose: u8) {
    let filter = build_env_filter(level_for_verbosity(verbose));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build an `EnvFilter` from the given level, respecting `RUST_LOG` env var.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level))
}

/// Our crate at `level`, external crates stay at warn to reduce noise
fn default_filter(level: Level) -> EnvFilter {
    let level = level.as_str().to_lowercase();
    EnvFilter::new(format!("warn,bookingcache={}", level))
}
