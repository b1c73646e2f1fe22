//! Reservation core: listings, sessions and the booking lifecycle.
//!
//! A listing is either a dwelling, reserved by date range, or an experience
//! exposing fixed-capacity sessions reserved by seat count. Both reservation
//! kinds share one state machine (PENDING -> CONFIRMED / CANCELLED plus an
//! independent paid flag) driven by [`BookingManager`].
//!
//! # Example
//!
//! ```rust,ignore
//! use quayside::booking::{BookingManager, NewDwellingBooking};
//!
//! let bookings = BookingManager::new(store, notifier, directory);
//!
//! let booking = bookings.book_dwelling(guest_id, NewDwellingBooking {
//!     resource_id,
//!     stay,
//!     guests: 2,
//! }).await?;
//!
//! // Later, on guest request:
//! bookings.cancel(guest_id, booking.id).await?;
//! ```

pub mod availability;
pub mod capacity;
pub mod error;
pub mod manager;
pub mod storage;
pub mod types;

// Manager exports
pub use manager::{BookingManager, NewDwellingBooking, NewSessionBooking};

// Type exports
pub use types::{
    Booking, BookingKind, BookingStatus, Resource, ResourceKind, Session, SessionStatus,
    StayDates,
};

// Storage exports
pub use storage::BookingStore;

// Error exports
pub use error::BookingError;

// Test exports
#[cfg(any(test, feature = "test-stores"))]
pub use storage::test::InMemoryStore;
