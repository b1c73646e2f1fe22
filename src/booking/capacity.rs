//! Seat accounting for fixed-capacity sessions.
//!
//! The participant counter is the single source of truth for a session's
//! status: it reaches capacity, the session is FULL; it drops back below,
//! the session is ACTIVE again. Callers must commit the returned session
//! through a versioned store write so the read and the write form one
//! atomic unit.

use super::error::BookingError;
use super::types::{Session, SessionStatus};

/// Reserve `quantity` seats on a session with the given capacity.
///
/// Rejects a request that would push the counter above capacity, reporting
/// how many seats are actually left.
pub fn reserve_seats(
    session: &Session,
    quantity: u32,
    capacity: u32,
) -> Result<Session, BookingError> {
    if quantity == 0 {
        return Err(BookingError::InvalidQuantity);
    }

    let remaining = session.remaining(capacity);
    if quantity > remaining {
        return Err(BookingError::NotEnoughSlots {
            requested: quantity,
            remaining,
        });
    }

    let booked = session.booked_participants + quantity;
    Ok(Session {
        booked_participants: booked,
        status: derive_status(booked, capacity),
        ..session.clone()
    })
}

/// Release `quantity` seats on cancellation.
///
/// The counter never drops below zero; a FULL session whose counter falls
/// below capacity reverts to ACTIVE.
pub fn release_seats(session: &Session, quantity: u32, capacity: u32) -> Session {
    let booked = session.booked_participants.saturating_sub(quantity);
    Session {
        booked_participants: booked,
        status: derive_status(booked, capacity),
        ..session.clone()
    }
}

fn derive_status(booked: u32, capacity: u32) -> SessionStatus {
    if booked >= capacity {
        SessionStatus::Full
    } else {
        SessionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn session(booked: u32, status: SessionStatus) -> Session {
        Session {
            id: Uuid::new_v4(),
            resource_id: Uuid::new_v4(),
            starts_at: Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap(),
            ends_at: Utc.with_ymd_and_hms(2025, 7, 1, 11, 0, 0).unwrap(),
            booked_participants: booked,
            status,
            version: 3,
        }
    }

    #[test]
    fn test_reserve_within_capacity() {
        let updated = reserve_seats(&session(5, SessionStatus::Active), 3, 10).unwrap();
        assert_eq!(updated.booked_participants, 8);
        assert_eq!(updated.status, SessionStatus::Active);
        // Version is untouched; the store bumps it on commit.
        assert_eq!(updated.version, 3);
    }

    #[test]
    fn test_reserve_to_exact_capacity_marks_full() {
        let updated = reserve_seats(&session(8, SessionStatus::Active), 2, 10).unwrap();
        assert_eq!(updated.booked_participants, 10);
        assert_eq!(updated.status, SessionStatus::Full);
    }

    #[test]
    fn test_reserve_over_capacity_reports_remaining() {
        let err = reserve_seats(&session(8, SessionStatus::Active), 3, 10).unwrap_err();
        assert_eq!(
            err,
            BookingError::NotEnoughSlots {
                requested: 3,
                remaining: 2
            }
        );
    }

    #[test]
    fn test_reserve_on_full_session_reports_zero_remaining() {
        let err = reserve_seats(&session(10, SessionStatus::Full), 1, 10).unwrap_err();
        assert_eq!(
            err,
            BookingError::NotEnoughSlots {
                requested: 1,
                remaining: 0
            }
        );
    }

    #[test]
    fn test_reserve_zero_rejected() {
        let err = reserve_seats(&session(0, SessionStatus::Active), 0, 10).unwrap_err();
        assert_eq!(err, BookingError::InvalidQuantity);
    }

    #[test]
    fn test_release_reverts_full_to_active() {
        let updated = release_seats(&session(10, SessionStatus::Full), 4, 10);
        assert_eq!(updated.booked_participants, 6);
        assert_eq!(updated.status, SessionStatus::Active);
    }

    #[test]
    fn test_release_never_goes_below_zero() {
        let updated = release_seats(&session(2, SessionStatus::Active), 5, 10);
        assert_eq!(updated.booked_participants, 0);
        assert_eq!(updated.status, SessionStatus::Active);
    }

    #[test]
    fn test_release_that_keeps_session_full() {
        // Capacity shrank after overbooking elsewhere; releasing one seat of
        // twelve on a ten-seat session leaves it full.
        let updated = release_seats(&session(12, SessionStatus::Full), 1, 10);
        assert_eq!(updated.booked_participants, 11);
        assert_eq!(updated.status, SessionStatus::Full);
    }
}
