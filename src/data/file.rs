//! Booking document read from disk on every fetch

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Booking, SourceError, UpstreamSource};

/// Source that reads and decodes a JSON booking file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UpstreamSource for FileSource {
    type Record = Booking;

    async fn fetch(&self) -> Result<Booking, SourceError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SourceError::NotFound(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Booking::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_booking;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reads_booking_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("booking.json");
        let booking = sample_booking("BK-FILE");
        std::fs::write(&path, serde_json::to_string(&booking).unwrap()).unwrap();

        let fetched = FileSource::new(&path).fetch().await.unwrap();
        assert_eq!(fetched, booking);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = FileSource::new(temp_dir.path().join("absent.json"));

        match source.fetch().await {
            Err(SourceError::NotFound(path)) => assert!(path.contains("absent.json")),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_truncated_file_is_malformed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("booking.json");
        std::fs::write(&path, "{\"reference\": \"BK-").unwrap();

        let result = FileSource::new(path).fetch().await;
        assert!(matches!(result, Err(SourceError::Malformed(_))));
    }
}
