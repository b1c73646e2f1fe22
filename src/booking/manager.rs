//! Reservation lifecycle management.
//!
//! Owns the PENDING -> CONFIRMED / CANCELLED state machine for both
//! reservation kinds. Admission (date availability, seat capacity) is
//! re-checked inside a versioned-write retry loop so that two racing
//! requests can never both commit; see [`super::storage::BookingStore`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::notify::{Directory, Notification, NotificationKind, Notifier};

use super::availability::{find_conflict, validate_stay};
use super::capacity::{release_seats, reserve_seats};
use super::error::BookingError;
use super::storage::BookingStore;
use super::types::{
    Booking, BookingKind, BookingStatus, Resource, ResourceKind, StayDates,
};

/// Maximum number of retries for optimistic locking conflicts.
const MAX_RETRIES: u32 = 3;

/// A request to reserve a dwelling by date range.
#[derive(Debug, Clone)]
pub struct NewDwellingBooking {
    pub resource_id: Uuid,
    pub stay: StayDates,
    pub guests: u32,
}

/// A request to reserve seats on a session.
#[derive(Debug, Clone)]
pub struct NewSessionBooking {
    pub session_id: Uuid,
    pub quantity: u32,
}

/// Reservation lifecycle operations.
///
/// The acting user is an explicit parameter on every operation; there is no
/// ambient "current user" in the core.
#[derive(Clone)]
pub struct BookingManager<S: BookingStore, N: Notifier, D: Directory> {
    store: S,
    notifier: N,
    directory: D,
}

impl<S: BookingStore, N: Notifier, D: Directory> BookingManager<S, N, D> {
    /// Create a new booking manager.
    #[must_use]
    pub fn new(store: S, notifier: N, directory: D) -> Self {
        Self {
            store,
            notifier,
            directory,
        }
    }

    /// Reserve a dwelling for a date range.
    ///
    /// The reservation is created PENDING and unpaid; the total price is the
    /// nightly rate times the number of nights, fixed at creation.
    pub async fn book_dwelling(
        &self,
        customer_id: Uuid,
        request: NewDwellingBooking,
    ) -> Result<Booking> {
        validate_stay(&request.stay, Utc::now())?;

        for _attempt in 0..MAX_RETRIES {
            let resource = self.require_resource(request.resource_id).await?;
            check_bookable(&resource, customer_id, ResourceKind::Dwelling)?;

            if request.guests == 0 || request.guests > resource.capacity {
                return Err(BookingError::InvalidGuestCount {
                    requested: request.guests,
                    capacity: resource.capacity,
                }
                .into());
            }

            let existing = self.store.bookings_for_resource(resource.id).await?;
            if find_conflict(existing.iter(), &request.stay).is_some() {
                return Err(BookingError::DatesUnavailable {
                    resource_id: resource.id,
                }
                .into());
            }

            let kind = BookingKind::Dwelling {
                stay: request.stay,
                guests: request.guests,
            };
            let booking = new_booking(&resource, customer_id, kind);

            if self
                .store
                .insert_booking_versioned(&booking, resource.version)
                .await?
            {
                tracing::info!(
                    target: "quayside::booking",
                    booking_id = %booking.id,
                    resource_id = %resource.id,
                    nights = request.stay.nights(),
                    "dwelling reservation created"
                );
                self.notify_requested(&resource, &booking).await;
                return Ok(booking);
            }

            tracing::debug!(
                resource_id = %resource.id,
                "admission check lost a concurrent write, retrying"
            );
        }

        Err(BookingError::ConcurrentModification {
            id: request.resource_id,
        }
        .into())
    }

    /// Reserve seats on a session.
    ///
    /// The seat counter and the reservation row are committed as one unit;
    /// a request that would overshoot capacity is rejected with the number
    /// of seats actually remaining.
    pub async fn book_session(
        &self,
        customer_id: Uuid,
        request: NewSessionBooking,
    ) -> Result<Booking> {
        for _attempt in 0..MAX_RETRIES {
            let session = self
                .store
                .get_session(request.session_id)
                .await?
                .ok_or(BookingError::SessionNotFound {
                    id: request.session_id,
                })?;
            let resource = self.require_resource(session.resource_id).await?;
            check_bookable(&resource, customer_id, ResourceKind::Experience)?;

            let reserved = reserve_seats(&session, request.quantity, resource.capacity)?;

            let kind = BookingKind::Session {
                session_id: session.id,
                quantity: request.quantity,
            };
            let booking = new_booking(&resource, customer_id, kind);

            if self
                .store
                .save_session_with_booking(&reserved, session.version, &booking)
                .await?
            {
                tracing::info!(
                    target: "quayside::booking",
                    booking_id = %booking.id,
                    session_id = %session.id,
                    seats = request.quantity,
                    booked = reserved.booked_participants,
                    status = reserved.status.as_str(),
                    "session reservation created"
                );
                self.notify_requested(&resource, &booking).await;
                return Ok(booking);
            }

            tracing::debug!(
                session_id = %session.id,
                "seat counter lost a concurrent write, retrying"
            );
        }

        Err(BookingError::ConcurrentModification {
            id: request.session_id,
        }
        .into())
    }

    /// Confirm a PENDING reservation. Host-initiated; settlement confirms
    /// through its own atomic path.
    pub async fn confirm(&self, actor_id: Uuid, booking_id: Uuid) -> Result<Booking> {
        let booking = self.require_booking(booking_id).await?;
        let resource = self.require_resource(booking.resource_id).await?;

        if actor_id != resource.host_id {
            return Err(BookingError::NotResourceHost { booking_id }.into());
        }
        match booking.status {
            BookingStatus::Confirmed => {
                return Err(BookingError::AlreadyConfirmed { id: booking_id }.into());
            }
            BookingStatus::Cancelled => {
                return Err(BookingError::AlreadyCancelled { id: booking_id }.into());
            }
            BookingStatus::Pending => {}
        }

        match self
            .store
            .transition_booking(booking_id, &[BookingStatus::Pending], BookingStatus::Confirmed)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    target: "quayside::booking",
                    booking_id = %booking_id,
                    "reservation confirmed"
                );
                self.notifier
                    .notify(Notification {
                        recipient: updated.customer_id,
                        kind: NotificationKind::BookingConfirmed,
                        title: "Reservation confirmed".to_string(),
                        message: format!("Your reservation for {} is confirmed", resource.title),
                        reference: updated.id,
                    })
                    .await;
                Ok(updated)
            }
            None => Err(self.transition_failure(booking_id).await.into()),
        }
    }

    /// Cancel a reservation. Guest-initiated; permitted from PENDING or
    /// CONFIRMED, and releases the date range or seat count it held.
    pub async fn cancel(&self, actor_id: Uuid, booking_id: Uuid) -> Result<Booking> {
        let booking = self.require_booking(booking_id).await?;

        if actor_id != booking.customer_id {
            return Err(BookingError::NotBookingOwner { booking_id }.into());
        }
        if booking.is_cancelled() {
            return Err(BookingError::AlreadyCancelled { id: booking_id }.into());
        }

        let cancelled = self.release_and_cancel(booking).await?;
        let resource = self.require_resource(cancelled.resource_id).await?;

        let guest = self.guest_name(cancelled.customer_id).await;
        self.notifier
            .notify(Notification {
                recipient: resource.host_id,
                kind: NotificationKind::BookingCancelled,
                title: "Reservation cancelled".to_string(),
                message: format!("{guest} cancelled their reservation for {}", resource.title),
                reference: cancelled.id,
            })
            .await;

        Ok(cancelled)
    }

    /// Cancel unpaid PENDING reservations created before the cutoff.
    ///
    /// This is the entry point for the periodic stale-reservation sweep; the
    /// scheduler that calls it lives outside the core. Each expiry goes
    /// through the ordinary cancellation path, so held dates and seats are
    /// released.
    pub async fn expire_stale_pending(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let stale = self.store.pending_bookings_before(cutoff).await?;
        let mut expired = 0usize;

        for booking in stale {
            let booking_id = booking.id;
            match self.release_and_cancel(booking).await {
                Ok(_) => expired += 1,
                Err(e) => {
                    // Another worker may have resolved it since the listing;
                    // skip and keep sweeping.
                    tracing::warn!(
                        target: "quayside::booking",
                        booking_id = %booking_id,
                        error = %e,
                        "failed to expire stale reservation"
                    );
                }
            }
        }

        if expired > 0 {
            tracing::info!(
                target: "quayside::booking",
                expired,
                cutoff = %cutoff,
                "expired stale pending reservations"
            );
        }
        Ok(expired)
    }

    /// Seats still open on a session, backing the remaining-capacity hint
    /// and session listings.
    pub async fn remaining_seats(&self, session_id: Uuid) -> Result<u32> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(BookingError::SessionNotFound { id: session_id })?;
        let resource = self.require_resource(session.resource_id).await?;
        Ok(session.remaining(resource.capacity))
    }

    /// Apply the cancellation state change and release whatever the
    /// reservation held. Authorization is the caller's responsibility.
    async fn release_and_cancel(&self, booking: Booking) -> Result<Booking> {
        match &booking.kind {
            BookingKind::Dwelling { .. } => {
                match self
                    .store
                    .transition_booking(
                        booking.id,
                        &[BookingStatus::Pending, BookingStatus::Confirmed],
                        BookingStatus::Cancelled,
                    )
                    .await?
                {
                    Some(updated) => {
                        tracing::info!(
                            target: "quayside::booking",
                            booking_id = %booking.id,
                            "dwelling reservation cancelled"
                        );
                        Ok(updated)
                    }
                    None => Err(self.transition_failure(booking.id).await.into()),
                }
            }
            BookingKind::Session {
                session_id,
                quantity,
            } => {
                for _attempt in 0..MAX_RETRIES {
                    let current = self.require_booking(booking.id).await?;
                    if current.is_cancelled() {
                        return Err(BookingError::AlreadyCancelled { id: booking.id }.into());
                    }

                    let session = self.store.get_session(*session_id).await?.ok_or(
                        BookingError::SessionNotFound { id: *session_id },
                    )?;
                    let resource = self.require_resource(session.resource_id).await?;

                    let released = release_seats(&session, *quantity, resource.capacity);
                    let mut cancelled = current;
                    cancelled.status = BookingStatus::Cancelled;

                    if self
                        .store
                        .save_session_with_booking(&released, session.version, &cancelled)
                        .await?
                    {
                        tracing::info!(
                            target: "quayside::booking",
                            booking_id = %booking.id,
                            session_id = %session.id,
                            booked = released.booked_participants,
                            status = released.status.as_str(),
                            "session reservation cancelled"
                        );
                        return Ok(cancelled);
                    }
                }

                Err(BookingError::ConcurrentModification { id: booking.id }.into())
            }
        }
    }

    /// Translate a failed conditional transition into the precise rejection.
    async fn transition_failure(&self, booking_id: Uuid) -> BookingError {
        match self.store.get_booking(booking_id).await {
            Ok(Some(current)) => match current.status {
                BookingStatus::Cancelled => BookingError::AlreadyCancelled { id: booking_id },
                BookingStatus::Confirmed => BookingError::AlreadyConfirmed { id: booking_id },
                status => BookingError::InvalidTransition {
                    id: booking_id,
                    status,
                },
            },
            _ => BookingError::BookingNotFound { id: booking_id },
        }
    }

    async fn require_resource(&self, id: Uuid) -> Result<Resource> {
        Ok(self
            .store
            .get_resource(id)
            .await?
            .ok_or(BookingError::ResourceNotFound { id })?)
    }

    async fn require_booking(&self, id: Uuid) -> Result<Booking> {
        Ok(self
            .store
            .get_booking(id)
            .await?
            .ok_or(BookingError::BookingNotFound { id })?)
    }

    async fn guest_name(&self, customer_id: Uuid) -> String {
        self.directory
            .display_name(customer_id)
            .await
            .unwrap_or_else(|| "A guest".to_string())
    }

    async fn notify_requested(&self, resource: &Resource, booking: &Booking) {
        let guest = self.guest_name(booking.customer_id).await;
        let message = match &booking.kind {
            BookingKind::Dwelling { stay, guests } => format!(
                "{guest} requested {} for {} night(s), {} guest(s)",
                resource.title,
                stay.nights(),
                guests
            ),
            BookingKind::Session { quantity, .. } => format!(
                "{guest} requested {} seat(s) for {}",
                quantity, resource.title
            ),
        };

        self.notifier
            .notify(Notification {
                recipient: resource.host_id,
                kind: NotificationKind::BookingRequested,
                title: "New reservation request".to_string(),
                message,
                reference: booking.id,
            })
            .await;
    }
}

/// Shared admission guards for both reservation kinds.
fn check_bookable(
    resource: &Resource,
    customer_id: Uuid,
    expected: ResourceKind,
) -> std::result::Result<(), BookingError> {
    if resource.kind != expected {
        return Err(BookingError::WrongResourceKind {
            id: resource.id,
            expected: match expected {
                ResourceKind::Dwelling => "dwelling",
                ResourceKind::Experience => "experience",
            },
        });
    }
    if !resource.active {
        return Err(BookingError::ResourceInactive { id: resource.id });
    }
    if customer_id == resource.host_id {
        return Err(BookingError::OwnListing {
            resource_id: resource.id,
        });
    }
    Ok(())
}

fn new_booking(resource: &Resource, customer_id: Uuid, kind: BookingKind) -> Booking {
    Booking {
        id: Uuid::new_v4(),
        resource_id: resource.id,
        customer_id,
        total_price: kind.total_price(resource.unit_price),
        status: BookingStatus::Pending,
        paid: false,
        kind,
        created_at: Utc::now(),
    }
}
