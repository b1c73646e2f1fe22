//! Date-range availability for dwellings.
//!
//! A dwelling's non-cancelled reservations must have pairwise disjoint
//! half-open `[check_in, check_out)` windows. Touching boundaries are not a
//! conflict: a check-out at the same instant as the next check-in is allowed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::BookingError;
use super::types::{Booking, BookingKind, StayDates};

/// Validate a proposed stay before any overlap test.
///
/// Both instants must be in the future at submission time, check-out must be
/// strictly after check-in, and the stay must cover at least one night.
pub fn validate_stay(stay: &StayDates, now: DateTime<Utc>) -> Result<(), BookingError> {
    if stay.check_in <= now {
        return Err(BookingError::InvalidStay {
            reason: "check-in must be in the future".to_string(),
        });
    }
    if stay.check_out <= stay.check_in {
        return Err(BookingError::InvalidStay {
            reason: "check-out must be after check-in".to_string(),
        });
    }
    if stay.nights() < 1 {
        return Err(BookingError::InvalidStay {
            reason: "stay must cover at least one night".to_string(),
        });
    }
    Ok(())
}

/// Find a non-cancelled dwelling reservation whose window overlaps the
/// proposed stay. Session reservations never conflict on dates.
pub fn find_conflict<'a>(
    existing: impl IntoIterator<Item = &'a Booking>,
    proposed: &StayDates,
) -> Option<Uuid> {
    existing.into_iter().find_map(|booking| {
        if booking.is_cancelled() {
            return None;
        }
        match &booking.kind {
            BookingKind::Dwelling { stay, .. } if stay.overlaps(proposed) => Some(booking.id),
            _ => None,
        }
    })
}
