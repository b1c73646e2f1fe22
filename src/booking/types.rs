//! Core records for listings, sessions and reservations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of resource a listing is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A physical stay booked by date range.
    Dwelling,
    /// An experience exposing fixed-capacity timed sessions.
    Experience,
}

/// A bookable listing.
///
/// For dwellings `capacity` is the maximum guest count; for experiences it is
/// the seat limit every session inherits. `version` is the optimistic-lock
/// token guarding the listing's booking set (see [`super::storage::BookingStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    /// User who owns the listing.
    pub host_id: Uuid,
    pub title: String,
    /// Price per night (dwellings) or per seat (sessions).
    pub unit_price: Decimal,
    pub capacity: u32,
    pub latitude: f64,
    pub longitude: f64,
    /// Whether the listing currently accepts reservations.
    pub active: bool,
    pub kind: ResourceKind,
    pub version: u64,
}

/// Session status, derived from the participant counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Full,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Full => "full",
        }
    }
}

/// One time-boxed run of an experience.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// The experience resource this session belongs to.
    pub resource_id: Uuid,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    /// Seats reserved by non-cancelled bookings. Mutated only through the
    /// capacity arithmetic in [`super::capacity`].
    pub booked_participants: u32,
    pub status: SessionStatus,
    pub version: u64,
}

impl Session {
    /// Seats still open given the owning resource's capacity.
    #[must_use]
    pub fn remaining(&self, capacity: u32) -> u32 {
        capacity.saturating_sub(self.booked_participants)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.status == SessionStatus::Full
    }
}

/// A half-open `[check_in, check_out)` stay window.
///
/// A check-out at the same instant as another stay's check-in does not
/// conflict with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayDates {
    pub check_in: DateTime<Utc>,
    pub check_out: DateTime<Utc>,
}

impl StayDates {
    #[must_use]
    pub fn new(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> Self {
        Self {
            check_in,
            check_out,
        }
    }

    /// Number of nights the stay covers, by calendar date.
    #[must_use]
    pub fn nights(&self) -> i64 {
        (self.check_out.date_naive() - self.check_in.date_naive()).num_days()
    }

    /// Half-open interval overlap.
    #[must_use]
    pub fn overlaps(&self, other: &StayDates) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }
}

/// Reservation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific reservation data.
///
/// The two reservation shapes share one lifecycle; pricing, admission and
/// release dispatch on this union rather than on a class hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingKind {
    Dwelling { stay: StayDates, guests: u32 },
    Session { session_id: Uuid, quantity: u32 },
}

impl BookingKind {
    /// Total price for this reservation at the given unit price.
    ///
    /// Dwellings price per night, sessions per seat.
    #[must_use]
    pub fn total_price(&self, unit_price: Decimal) -> Decimal {
        match self {
            Self::Dwelling { stay, .. } => unit_price * Decimal::from(stay.nights().max(0)),
            Self::Session { quantity, .. } => unit_price * Decimal::from(*quantity),
        }
    }

    /// The stay window, when this is a dwelling reservation.
    #[must_use]
    pub fn stay(&self) -> Option<&StayDates> {
        match self {
            Self::Dwelling { stay, .. } => Some(stay),
            Self::Session { .. } => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dwelling { .. } => "dwelling",
            Self::Session { .. } => "session",
        }
    }
}

/// A reservation against a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub resource_id: Uuid,
    /// Guest who made the reservation.
    pub customer_id: Uuid,
    /// Fixed at creation; never mutated afterwards.
    pub total_price: Decimal,
    pub status: BookingStatus,
    /// Set to true exactly once, by a successful settlement.
    pub paid: bool,
    pub kind: BookingKind,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 14, 0, 0).unwrap()
    }

    #[test]
    fn test_nights_by_calendar_date() {
        let stay = StayDates::new(date(2025, 6, 10), date(2025, 6, 15));
        assert_eq!(stay.nights(), 5);

        // Same calendar day counts as zero nights even when the instants differ.
        let same_day = StayDates::new(
            Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 6, 10, 20, 0, 0).unwrap(),
        );
        assert_eq!(same_day.nights(), 0);
    }

    #[test]
    fn test_dwelling_total_price() {
        let kind = BookingKind::Dwelling {
            stay: StayDates::new(date(2025, 6, 10), date(2025, 6, 13)),
            guests: 2,
        };
        assert_eq!(kind.total_price(Decimal::new(150_00, 2)), Decimal::new(450_00, 2));
    }

    #[test]
    fn test_session_total_price() {
        let kind = BookingKind::Session {
            session_id: Uuid::new_v4(),
            quantity: 4,
        };
        assert_eq!(kind.total_price(Decimal::new(25_50, 2)), Decimal::new(102_00, 2));
    }

    #[test]
    fn test_session_remaining() {
        let session = Session {
            id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            starts_at: date(2025, 7, 1),
            ends_at: date(2025, 7, 1),
            booked_participants: 8,
            status: SessionStatus::Active,
            version: 0,
        };
        assert_eq!(session.remaining(10), 2);
        assert_eq!(session.remaining(8), 0);
        assert_eq!(session.remaining(4), 0);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(BookingStatus::Pending.as_str(), "pending");
        assert_eq!(BookingStatus::Confirmed.to_string(), "confirmed");
        assert_eq!(SessionStatus::Full.as_str(), "full");
    }
}
