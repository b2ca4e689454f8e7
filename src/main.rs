//! Booking Cache CLI - show a cached booking, refreshing it when stale
//!
//! Prints progress to stderr and the booking itself to stdout.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use clap::Parser;
use futures::StreamExt;

use bookingcache::cache::{CacheOrchestrator, LoadState};
use bookingcache::cli::{AppConfig, Cli, Command};
use bookingcache::data::{Booking, BookingSource};
use bookingcache::logging::init_logging;
use bookingcache::refresh::{RefreshConfig, RefreshHandle, RefreshMessage};
use bookingcache::store::FileStore;

type BookingCache = CacheOrchestrator<FileStore, BookingSource>;

/// Formats a timestamp in the local timezone for humans
fn local_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn print_booking(booking: &Booking, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(booking)?);
    } else {
        println!("{}", booking);
    }
    Ok(())
}

/// Runs one refresh, printing each state; returns false if it ended in an error
async fn show(cache: &BookingCache, force: bool, json: bool) -> Result<bool, Box<dyn Error>> {
    let mut states = cache.refresh(force);
    let mut ok = false;

    while let Some(state) = states.next().await {
        match state {
            LoadState::Loading => eprintln!("Loading booking..."),
            LoadState::Success(booking) => {
                print_booking(&booking, json)?;
                ok = true;
            }
            LoadState::Error(message) => eprintln!("Error: {}", message),
        }
    }

    if ok {
        match cache.last_update_time() {
            Some(time) => eprintln!("Last updated {}", local_time(time)),
            None => eprintln!("Never updated from upstream"),
        }
    }
    Ok(ok)
}

/// Refreshes on an interval until Ctrl-C
async fn watch(cache: BookingCache, interval: Duration) -> Result<(), Box<dyn Error>> {
    let config = RefreshConfig {
        interval,
        enabled: true,
    };
    let mut handle = RefreshHandle::spawn(cache, config);
    handle.request_refresh(false).await;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            message = handle.receiver.recv() => match message {
                Some(RefreshMessage::RefreshStarted { .. }) => {
                    eprintln!("[{}] refreshing", local_time(Utc::now()));
                }
                Some(RefreshMessage::State(LoadState::Success(booking))) => {
                    print_booking(&booking, false)?;
                }
                Some(RefreshMessage::State(LoadState::Error(message))) => {
                    eprintln!("Error: {}", message);
                }
                Some(RefreshMessage::State(LoadState::Loading)) => {}
                Some(RefreshMessage::RefreshCompleted) => {}
                None => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    handle.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match AppConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(ExitCode::from(2));
        }
    };

    let store = match config.cache_dir {
        Some(dir) => FileStore::with_dir(dir),
        None => FileStore::new().ok_or("could not determine a cache directory; pass --cache-dir")?,
    };
    let cache = CacheOrchestrator::new(
        Arc::new(store),
        BookingSource::from(config.source),
        config.cache,
    );

    match config.command {
        Command::Show { force, json } => {
            if !show(&cache, force, json).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::LastUpdate => match cache.last_update_time() {
            Some(time) => println!("{}", time.to_rfc3339()),
            None => println!("never"),
        },
        Command::Clear => {
            cache.clear_cache()?;
            println!("Cache cleared");
        }
        Command::Watch { interval_secs } => {
            watch(cache, Duration::from_secs(interval_secs)).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
