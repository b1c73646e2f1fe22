//! Booking-specific error types.
//!
//! Every rejection in the reservation lifecycle is a typed, user-visible
//! error; these convert to `QuaysideError` for HTTP responses.

use std::fmt;
use uuid::Uuid;

use super::types::BookingStatus;

/// Booking-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    // Lookup errors
    /// The listing was not found.
    ResourceNotFound { id: Uuid },
    /// The session was not found.
    SessionNotFound { id: Uuid },
    /// The reservation was not found.
    BookingNotFound { id: Uuid },

    // Admission errors
    /// The listing is not accepting reservations.
    ResourceInactive { id: Uuid },
    /// A dwelling operation was attempted on an experience or vice versa.
    WrongResourceKind { id: Uuid, expected: &'static str },
    /// The requested dates are invalid before any overlap check.
    InvalidStay { reason: String },
    /// Guest count outside the listing's capacity.
    InvalidGuestCount { requested: u32, capacity: u32 },
    /// A seat quantity of zero was requested.
    InvalidQuantity,
    /// The requested dates overlap an existing reservation.
    DatesUnavailable { resource_id: Uuid },
    /// The session cannot seat the requested quantity.
    NotEnoughSlots { requested: u32, remaining: u32 },

    // Authorization errors
    /// Hosts cannot reserve their own listings.
    OwnListing { resource_id: Uuid },
    /// Only the guest who made a reservation may cancel or pay for it.
    NotBookingOwner { booking_id: Uuid },
    /// Only the listing's host may confirm a reservation.
    NotResourceHost { booking_id: Uuid },

    // State errors
    /// The reservation is already confirmed.
    AlreadyConfirmed { id: Uuid },
    /// The reservation is already cancelled.
    AlreadyCancelled { id: Uuid },
    /// The reservation is in a state the transition does not accept.
    InvalidTransition { id: Uuid, status: BookingStatus },

    // Concurrency
    /// The write lost a race and retries were exhausted.
    ConcurrentModification { id: Uuid },
}

impl fmt::Display for BookingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourceNotFound { id } => write!(f, "Listing not found: {id}"),
            Self::SessionNotFound { id } => write!(f, "Session not found: {id}"),
            Self::BookingNotFound { id } => write!(f, "Reservation not found: {id}"),
            Self::ResourceInactive { id } => {
                write!(f, "Listing {id} is not accepting reservations")
            }
            Self::WrongResourceKind { id, expected } => {
                write!(f, "Listing {id} is not a {expected}")
            }
            Self::InvalidStay { reason } => write!(f, "Invalid stay dates: {reason}"),
            Self::InvalidGuestCount { requested, capacity } => {
                write!(f, "Guest count {requested} is outside capacity {capacity}")
            }
            Self::InvalidQuantity => write!(f, "Seat quantity must be at least 1"),
            Self::DatesUnavailable { resource_id } => {
                write!(f, "Requested dates are unavailable for listing {resource_id}")
            }
            Self::NotEnoughSlots { requested, remaining } => {
                write!(f, "Not enough slots for {requested} seats, {remaining} remaining")
            }
            Self::OwnListing { resource_id } => {
                write!(f, "Hosts cannot reserve their own listing {resource_id}")
            }
            Self::NotBookingOwner { booking_id } => {
                write!(f, "Reservation {booking_id} belongs to another guest")
            }
            Self::NotResourceHost { booking_id } => {
                write!(f, "Only the host may confirm reservation {booking_id}")
            }
            Self::AlreadyConfirmed { id } => {
                write!(f, "Reservation {id} is already confirmed")
            }
            Self::AlreadyCancelled { id } => {
                write!(f, "Reservation {id} is already cancelled")
            }
            Self::InvalidTransition { id, status } => {
                write!(f, "Reservation {id} cannot change state while {status}")
            }
            Self::ConcurrentModification { id } => {
                write!(f, "Concurrent modification detected for {id}, please retry")
            }
        }
    }
}

impl std::error::Error for BookingError {}

impl From<BookingError> for crate::error::QuaysideError {
    fn from(err: BookingError) -> Self {
        match &err {
            BookingError::ResourceNotFound { .. }
            | BookingError::SessionNotFound { .. }
            | BookingError::BookingNotFound { .. } => {
                crate::error::QuaysideError::NotFound(err.to_string())
            }

            BookingError::OwnListing { .. }
            | BookingError::NotBookingOwner { .. }
            | BookingError::NotResourceHost { .. } => {
                crate::error::QuaysideError::Forbidden(err.to_string())
            }

            BookingError::ResourceInactive { .. }
            | BookingError::WrongResourceKind { .. }
            | BookingError::InvalidStay { .. }
            | BookingError::InvalidGuestCount { .. }
            | BookingError::InvalidQuantity
            | BookingError::DatesUnavailable { .. }
            | BookingError::NotEnoughSlots { .. }
            | BookingError::AlreadyConfirmed { .. }
            | BookingError::AlreadyCancelled { .. }
            | BookingError::InvalidTransition { .. } => {
                crate::error::QuaysideError::BadRequest(err.to_string())
            }

            BookingError::ConcurrentModification { .. } => {
                crate::error::QuaysideError::Internal(err.to_string())
            }
        }
    }
}

impl BookingError {
    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}
