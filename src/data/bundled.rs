//! Booking document compiled into the binary
//!
//! Mirrors a read-only bundled resource: the data never changes at runtime,
//! but it still goes through the same decode and validation as any other
//! upstream so a bad build surfaces as a fetch failure.

use super::{Booking, SourceError, UpstreamSource};

/// The booking shipped with the binary
const BUNDLED_BOOKING: &str = include_str!("../../assets/booking.json");

/// Source that decodes a booking document held in memory
#[derive(Debug, Clone)]
pub struct BundledSource {
    document: &'static str,
}

impl BundledSource {
    /// Creates a source over the booking bundled with the binary
    pub fn new() -> Self {
        Self {
            document: BUNDLED_BOOKING,
        }
    }

    /// Creates a source over an arbitrary static document
    pub fn from_static(document: &'static str) -> Self {
        Self { document }
    }
}

impl Default for BundledSource {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamSource for BundledSource {
    type Record = Booking;

    async fn fetch(&self) -> Result<Booking, SourceError> {
        Booking::from_json(self.document)
    }
}
