//! Storage trait for reservation data.
//!
//! Implement this trait to persist listings, sessions and reservations to
//! your database. An in-memory implementation is provided for testing.
//!
//! The three conditional-write methods are the concurrency guard for the
//! whole reservation core: admission decisions (date availability, seat
//! capacity) are only valid if the write that follows them observes the
//! same version the decision was made against.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::types::{Booking, BookingStatus, Resource, Session};

/// Trait for storing reservation data.
#[async_trait]
pub trait BookingStore: Send + Sync {
    // Catalog seeding (the catalog CRUD itself lives outside this core)

    async fn insert_resource(&self, resource: &Resource) -> Result<()>;

    async fn get_resource(&self, id: Uuid) -> Result<Option<Resource>>;

    async fn insert_session(&self, session: &Session) -> Result<()>;

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>>;

    // Reservation reads

    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>>;

    /// All reservations against a listing, cancelled ones included.
    async fn bookings_for_resource(&self, resource_id: Uuid) -> Result<Vec<Booking>>;

    /// Unpaid PENDING reservations created before the cutoff, for the
    /// stale-reservation sweep.
    async fn pending_bookings_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;

    // Conditional writes

    /// Insert a dwelling reservation, guarded by the listing's version.
    ///
    /// Returns `Ok(true)` and bumps the listing version if it still equals
    /// `expected_resource_version`; returns `Ok(false)` without writing
    /// otherwise. Implementations MUST make the version check and the insert
    /// one atomic unit, e.g. `UPDATE resources SET version = version + 1
    /// WHERE id = $1 AND version = $2` in the same transaction as the
    /// insert. Two creates racing for overlapping dates then cannot both
    /// commit: the loser observes the bumped version and re-checks.
    async fn insert_booking_versioned(
        &self,
        booking: &Booking,
        expected_resource_version: u64,
    ) -> Result<bool>;

    /// Save a session's counter and status together with a reservation
    /// write, guarded by the session's version.
    ///
    /// The reservation is upserted: inserted on seat reservation, replaced
    /// on cancellation. On success the stored session version is
    /// `expected_version + 1`. Returns `Ok(false)` without writing on a
    /// version mismatch. The same atomicity requirement as
    /// [`insert_booking_versioned`](Self::insert_booking_versioned) applies.
    async fn save_session_with_booking(
        &self,
        session: &Session,
        expected_version: u64,
        booking: &Booking,
    ) -> Result<bool>;

    /// Transition a reservation's status only if its current status is one
    /// of `from`. Returns the updated reservation, or `None` if the guard
    /// failed (including a reservation that no longer exists).
    async fn transition_booking(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
    ) -> Result<Option<Booking>>;
}

/// In-memory store for tests and examples.
#[cfg(any(test, feature = "test-stores"))]
pub mod test {
    use super::*;
    use crate::settlement::storage::Payment;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub(crate) struct StoreState {
        pub(crate) resources: HashMap<Uuid, Resource>,
        pub(crate) sessions: HashMap<Uuid, Session>,
        pub(crate) bookings: HashMap<Uuid, Booking>,
        pub(crate) payments: HashMap<Uuid, Payment>,
        pub(crate) payment_refs: HashMap<String, Uuid>,
    }

    /// In-memory reservation and payment store.
    ///
    /// All state lives under a single lock, so every trait method is
    /// naturally one atomic unit. Production stores must provide the same
    /// guarantees with database transactions.
    #[derive(Clone, Default)]
    pub struct InMemoryStore {
        pub(crate) state: Arc<RwLock<StoreState>>,
    }

    impl InMemoryStore {
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl BookingStore for InMemoryStore {
        async fn insert_resource(&self, resource: &Resource) -> Result<()> {
            let mut state = self.state.write().await;
            state.resources.insert(resource.id, resource.clone());
            Ok(())
        }

        async fn get_resource(&self, id: Uuid) -> Result<Option<Resource>> {
            let state = self.state.read().await;
            Ok(state.resources.get(&id).cloned())
        }

        async fn insert_session(&self, session: &Session) -> Result<()> {
            let mut state = self.state.write().await;
            state.sessions.insert(session.id, session.clone());
            Ok(())
        }

        async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
            let state = self.state.read().await;
            Ok(state.sessions.get(&id).cloned())
        }

        async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>> {
            let state = self.state.read().await;
            Ok(state.bookings.get(&id).cloned())
        }

        async fn bookings_for_resource(&self, resource_id: Uuid) -> Result<Vec<Booking>> {
            let state = self.state.read().await;
            Ok(state
                .bookings
                .values()
                .filter(|b| b.resource_id == resource_id)
                .cloned()
                .collect())
        }

        async fn pending_bookings_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
            let state = self.state.read().await;
            Ok(state
                .bookings
                .values()
                .filter(|b| {
                    b.status == BookingStatus::Pending && !b.paid && b.created_at < cutoff
                })
                .cloned()
                .collect())
        }

        async fn insert_booking_versioned(
            &self,
            booking: &Booking,
            expected_resource_version: u64,
        ) -> Result<bool> {
            let mut state = self.state.write().await;
            let resource = state.resources.get_mut(&booking.resource_id).ok_or_else(|| {
                crate::error::QuaysideError::not_found(format!(
                    "Listing not found: {}",
                    booking.resource_id
                ))
            })?;

            if resource.version != expected_resource_version {
                return Ok(false);
            }

            resource.version += 1;
            state.bookings.insert(booking.id, booking.clone());
            Ok(true)
        }

        async fn save_session_with_booking(
            &self,
            session: &Session,
            expected_version: u64,
            booking: &Booking,
        ) -> Result<bool> {
            let mut state = self.state.write().await;
            let current = state.sessions.get_mut(&session.id).ok_or_else(|| {
                crate::error::QuaysideError::not_found(format!(
                    "Session not found: {}",
                    session.id
                ))
            })?;

            if current.version != expected_version {
                return Ok(false);
            }

            *current = Session {
                version: expected_version + 1,
                ..session.clone()
            };
            state.bookings.insert(booking.id, booking.clone());
            Ok(true)
        }

        async fn transition_booking(
            &self,
            id: Uuid,
            from: &[BookingStatus],
            to: BookingStatus,
        ) -> Result<Option<Booking>> {
            let mut state = self.state.write().await;
            let Some(booking) = state.bookings.get_mut(&id) else {
                return Ok(None);
            };

            if !from.contains(&booking.status) {
                return Ok(None);
            }

            booking.status = to;
            Ok(Some(booking.clone()))
        }
    }
}
