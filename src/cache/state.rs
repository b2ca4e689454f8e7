//! Observable progress of one refresh

use thiserror::Error;

use crate::data::SourceError;

/// Progress signal emitted by a refresh
///
/// Every refresh yields `Loading` first and then exactly one of `Success` or
/// `Error`. A `Success` does not say whether the record came from the upstream
/// or the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState<R> {
    /// A refresh is in progress
    Loading,
    /// A usable record, fresh or cached
    Success(R),
    /// No usable record exists; the message says why
    Error(String),
}

impl<R> LoadState<R> {
    /// Whether this state ends the refresh
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadState::Loading)
    }

    /// Borrows the record carried by `Success`
    pub fn record(&self) -> Option<&R> {
        match self {
            LoadState::Success(record) => Some(record),
            _ => None,
        }
    }

    /// Takes the record carried by `Success`
    pub fn into_record(self) -> Option<R> {
        match self {
            LoadState::Success(record) => Some(record),
            _ => None,
        }
    }
}

/// Why a refresh ended without any record
#[derive(Debug, Error)]
pub enum LoadError {
    /// The upstream failed and nothing was cached
    #[error("no data available: {0}")]
    Upstream(#[source] SourceError),

    /// The upstream panicked while fetching and nothing was cached
    #[error("no data available: upstream fetch panicked: {0}")]
    Panicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_loading_is_non_terminal() {
        assert!(!LoadState::<u32>::Loading.is_terminal());
        assert!(LoadState::Success(1).is_terminal());
        assert!(LoadState::<u32>::Error("x".to_string()).is_terminal());
    }

    #[test]
    fn test_record_accessors() {
        let state = LoadState::Success("booking".to_string());
        assert_eq!(state.record().map(String::as_str), Some("booking"));
        assert_eq!(state.into_record().as_deref(), Some("booking"));
        assert!(LoadState::<String>::Error("gone".to_string())
            .into_record()
            .is_none());
    }

    #[test]
    fn test_load_error_keeps_upstream_detail() {
        let err = LoadError::Upstream(SourceError::NotFound("/tmp/booking.json".to_string()));
        let message = err.to_string();
        assert!(message.starts_with("no data available"));
        assert!(message.contains("/tmp/booking.json"));
    }
}
