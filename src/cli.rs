//! Command-line interface parsing for the booking cache
//!
//! Parses arguments with clap and turns them into an [`AppConfig`] holding the
//! cache configuration, the upstream to use, and where the cache lives.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;

use crate::cache::{CacheConfig, DEFAULT_NAMESPACE};
use crate::data::{BookingSource, BundledSource, FileSource, HttpSource};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// TTL of zero would make every read a fetch
    #[error("Invalid TTL: must be at least 1 minute")]
    InvalidTtl,

    /// Fetch timeout of zero would fail every fetch
    #[error("Invalid timeout: must be at least 1 second")]
    InvalidTimeout,

    /// Watch interval of zero
    #[error("Invalid interval: must be at least 1 second")]
    InvalidInterval,

    /// Namespace is used to build store keys
    #[error("Invalid namespace: '{0}'. Use letters, digits, '-' or '_'")]
    InvalidNamespace(String),
}

/// Booking cache - show a booking, refreshing it from upstream when stale
#[derive(Parser, Debug)]
#[command(name = "bookingcache")]
#[command(about = "Serve a booking from a local cache with stale fallback")]
#[command(version)]
pub struct Cli {
    /// Where to fetch the booking from: a JSON file path or an http(s) URL
    ///
    /// When omitted, the booking bundled with the binary is used.
    #[arg(long, global = true, env = "BOOKINGCACHE_SOURCE", value_name = "PATH|URL")]
    pub source: Option<String>,

    /// Directory for cached data (defaults to the platform cache directory)
    #[arg(long, global = true, env = "BOOKINGCACHE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Minutes before a cached booking is considered stale
    #[arg(long, global = true, default_value_t = 10, value_name = "MINUTES")]
    pub ttl_minutes: u64,

    /// Seconds an upstream fetch may take before it is abandoned
    #[arg(long, global = true, default_value_t = 30, value_name = "SECONDS")]
    pub timeout_secs: u64,

    /// Prefix for the cache keys
    #[arg(long, global = true, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands; `show` runs when none is given
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the booking, fetching it if the cache is missing or stale
    Show {
        /// Fetch from upstream even if the cache is fresh
        #[arg(long)]
        force: bool,
        /// Print the booking as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print when the booking was last fetched from upstream
    LastUpdate,
    /// Remove the cached booking
    Clear,
    /// Keep refreshing the booking periodically until interrupted
    Watch {
        /// Seconds between refreshes
        #[arg(long, default_value_t = 300)]
        interval_secs: u64,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Show {
            force: false,
            json: false,
        }
    }
}

/// Which upstream the booking comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// The booking compiled into the binary
    Bundled,
    /// A JSON file on disk
    File(PathBuf),
    /// A JSON document served over HTTP
    Http(String),
}

impl SourceSpec {
    /// Interprets a `--source` value
    ///
    /// Values starting with `http://` or `https://` are URLs, anything else is
    /// a file path.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => SourceSpec::Bundled,
            Some(v) if v.starts_with("http://") || v.starts_with("https://") => {
                SourceSpec::Http(v.to_string())
            }
            Some(v) => SourceSpec::File(PathBuf::from(v)),
        }
    }
}

impl From<SourceSpec> for BookingSource {
    fn from(spec: SourceSpec) -> Self {
        match spec {
            SourceSpec::Bundled => BookingSource::Bundled(BundledSource::new()),
            SourceSpec::File(path) => BookingSource::File(FileSource::new(path)),
            SourceSpec::Http(url) => BookingSource::Http(HttpSource::new(url)),
        }
    }
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Cache namespace and TTL
    pub cache: CacheConfig,
    /// Upstream to fetch from
    pub source: SourceSpec,
    /// Explicit cache directory, if given
    pub cache_dir: Option<PathBuf>,
    /// What to run
    pub command: Command,
}

impl AppConfig {
    /// Creates an AppConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(AppConfig)` with validated settings
    /// * `Err(CliError)` if a value is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if cli.ttl_minutes == 0 {
            return Err(CliError::InvalidTtl);
        }
        if cli.timeout_secs == 0 {
            return Err(CliError::InvalidTimeout);
        }
        if !is_valid_namespace(&cli.namespace) {
            return Err(CliError::InvalidNamespace(cli.namespace.clone()));
        }

        let command = cli.command.clone().unwrap_or_default();
        if let Command::Watch { interval_secs: 0 } = command {
            return Err(CliError::InvalidInterval);
        }

        Ok(AppConfig {
            cache: CacheConfig {
                namespace: cli.namespace.clone(),
                ttl: Duration::from_secs(cli.ttl_minutes.saturating_mul(60)),
                fetch_timeout: Duration::from_secs(cli.timeout_secs),
            },
            source: SourceSpec::parse(cli.source.as_deref()),
            cache_dir: cli.cache_dir.clone(),
            command,
        })
    }
}

fn is_valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args_defaults_to_show() {
        let cli = Cli::parse_from(["bookingcache"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.ttl_minutes, 10);
        assert_eq!(cli.namespace, "booking");

        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(config.command, Command::default());
        assert_eq!(config.cache, CacheConfig::default());
    }

    #[test]
    fn test_cli_parse_show_flags() {
        let cli = Cli::parse_from(["bookingcache", "show", "--force", "--json"]);
        assert_eq!(
            cli.command,
            Some(Command::Show {
                force: true,
                json: true
            })
        );
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::parse_from(["bookingcache", "clear", "--cache-dir", "/tmp/bc", "-vv"]);
        assert_eq!(cli.command, Some(Command::Clear));
        assert_eq!(cli.cache_dir, Some(PathBuf::from("/tmp/bc")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_ttl_minutes_becomes_duration() {
        let cli = Cli::parse_from(["bookingcache", "--ttl-minutes", "30"]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(config.cache.ttl, Duration::from_secs(1800));
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let cli = Cli::parse_from(["bookingcache", "--ttl-minutes", "0"]);
        let err = AppConfig::from_cli(&cli).unwrap_err();
        assert!(err.to_string().contains("Invalid TTL"));
    }

    #[test]
    fn test_timeout_secs_becomes_fetch_timeout() {
        let cli = Cli::parse_from(["bookingcache", "show", "--timeout-secs", "5"]);
        let config = AppConfig::from_cli(&cli).unwrap();
        assert_eq!(config.cache.fetch_timeout, Duration::from_secs(5));

        let cli = Cli::parse_from(["bookingcache", "--timeout-secs", "0"]);
        assert!(matches!(
            AppConfig::from_cli(&cli),
            Err(CliError::InvalidTimeout)
        ));
    }

    #[test]
    fn test_zero_watch_interval_is_rejected() {
        let cli = Cli::parse_from(["bookingcache", "watch", "--interval-secs", "0"]);
        assert!(matches!(
            AppConfig::from_cli(&cli),
            Err(CliError::InvalidInterval)
        ));
    }

    #[test]
    fn test_bad_namespace_is_rejected() {
        let cli = Cli::parse_from(["bookingcache", "--namespace", "../x"]);
        let err = AppConfig::from_cli(&cli).unwrap_err();
        assert!(err.to_string().contains("../x"));
    }

    #[test]
    fn test_source_spec_parse() {
        assert_eq!(SourceSpec::parse(None), SourceSpec::Bundled);
        assert_eq!(
            SourceSpec::parse(Some("https://example.com/b.json")),
            SourceSpec::Http("https://example.com/b.json".to_string())
        );
        assert_eq!(
            SourceSpec::parse(Some("http://localhost:8080/b.json")),
            SourceSpec::Http("http://localhost:8080/b.json".to_string())
        );
        assert_eq!(
            SourceSpec::parse(Some("data/booking.json")),
            SourceSpec::File(PathBuf::from("data/booking.json"))
        );
    }

    #[test]
    fn test_source_spec_builds_matching_source() {
        let source = BookingSource::from(SourceSpec::File(PathBuf::from("b.json")));
        assert!(matches!(source, BookingSource::File(_)));
        let source = BookingSource::from(SourceSpec::Bundled);
        assert!(matches!(source, BookingSource::Bundled(_)));
    }
}
