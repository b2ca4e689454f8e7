//! Booking data model and upstream sources
//!
//! This module contains the `Booking` record served by the cache together with
//! the [`UpstreamSource`] implementations that can produce one.

pub mod bundled;
pub mod file;
pub mod http;
pub mod source;

pub use bundled::BundledSource;
pub use file::FileSource;
pub use http::HttpSource;
pub use source::{SourceError, UpstreamSource};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Any of the shipped booking sources, chosen at runtime
#[derive(Debug, Clone)]
pub enum BookingSource {
    Bundled(BundledSource),
    File(FileSource),
    Http(HttpSource),
}

impl UpstreamSource for BookingSource {
    type Record = Booking;

    async fn fetch(&self) -> Result<Booking, SourceError> {
        match self {
            BookingSource::Bundled(source) => source.fetch().await,
            BookingSource::File(source) => source.fetch().await,
            BookingSource::Http(source) => source.fetch().await,
        }
    }
}

/// A single reservation as delivered by the upstream
///
/// Bookings are replaced wholesale on refresh; nothing in the crate mutates
/// one after it has been fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Confirmation reference, e.g. "BK-20261018-0042"
    pub reference: String,
    /// Lead guest on the reservation
    pub guest: Guest,
    /// Name of the property being booked
    pub property: String,
    /// Room or unit type
    pub room_type: String,
    /// Arrival date
    pub check_in: NaiveDate,
    /// Departure date
    pub check_out: NaiveDate,
    /// Number of guests staying
    pub guests: u32,
    /// Current lifecycle status
    pub status: BookingStatus,
    /// Total price for the stay
    pub total: Price,
}

/// Lead guest contact details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Monetary amount in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in cents (or the currency's minor unit)
    pub amount_cents: i64,
    /// ISO 4217 code
    pub currency: Currency,
}

/// Three-letter ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency([u8; 3]);

impl Currency {
    pub fn as_str(&self) -> &str {
        // Constructed only from ASCII uppercase letters
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl TryFrom<String> for Currency {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = value.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(format!("invalid currency code '{}'", value));
        }
        let mut code = [0u8; 3];
        for (slot, b) in code.iter_mut().zip(bytes) {
            *slot = b.to_ascii_uppercase();
        }
        Ok(Currency(code))
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.as_str().to_string()
    }
}

/// Lifecycle status of a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
    CheckedIn,
    CheckedOut,
}

impl BookingStatus {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Pending => "Pending",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::CheckedIn => "Checked in",
            BookingStatus::CheckedOut => "Checked out",
        }
    }
}

impl Booking {
    /// Decodes a booking document and checks it is usable
    ///
    /// Both decode and validation failures map to [`SourceError::Malformed`].
    pub fn from_json(raw: &str) -> Result<Self, SourceError> {
        let booking: Booking = serde_json::from_str(raw)
            .map_err(|e| SourceError::Malformed(format!("invalid booking document: {}", e)))?;
        booking.validate().map_err(SourceError::Malformed)?;
        Ok(booking)
    }

    /// Number of nights between check-in and check-out
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(0)
    }

    /// Rejects documents that decoded but are not a usable booking
    ///
    /// # Returns
    /// * `Ok(())` if the booking is internally consistent
    /// * `Err(String)` describing the first problem found
    pub fn validate(&self) -> Result<(), String> {
        if self.reference.trim().is_empty() {
            return Err("booking reference is empty".to_string());
        }
        if self.guest.name.trim().is_empty() {
            return Err("guest name is empty".to_string());
        }
        if self.check_out < self.check_in {
            return Err(format!(
                "check-out {} is before check-in {}",
                self.check_out, self.check_in
            ));
        }
        if self.total.amount_cents < 0 {
            return Err("total price is negative".to_string());
        }
        Ok(())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount_cents < 0 { "-" } else { "" };
        let abs = self.amount_cents.unsigned_abs();
        write!(f, "{}{}.{:02} {}", sign, abs / 100, abs % 100, self.currency.as_str())
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Booking {} ({})", self.reference, self.status.label())?;
        writeln!(f, "  Guest:     {}", self.guest.name)?;
        writeln!(f, "  Property:  {} - {}", self.property, self.room_type)?;
        writeln!(
            f,
            "  Stay:      {} to {} ({} nights, {} guests)",
            self.check_in,
            self.check_out,
            self.nights(),
            self.guests
        )?;
        write!(f, "  Total:     {}", self.total)
    }
}

#[cfg(test)]
pub(crate) fn sample_booking(reference: &str) -> Booking {
    Booking {
        reference: reference.to_string(),
        guest: Guest {
            name: "Ada Lovelace".to_string(),
            email: Some("ada@example.com".to_string()),
        },
        property: "Harbourview Hotel".to_string(),
        room_type: "Deluxe King".to_string(),
        check_in: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
        check_out: NaiveDate::from_ymd_opt(2026, 11, 5).unwrap(),
        guests: 2,
        status: BookingStatus::Confirmed,
        total: Price {
            amount_cents: 68_550,
            currency: Currency::try_from("CAD".to_string()).unwrap(),
        },
    }
}
