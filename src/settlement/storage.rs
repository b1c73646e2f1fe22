//! Payment records and their storage trait.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created at redirect time, awaiting the gateway callback.
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Whether a callback has already resolved this payment.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// How the payment is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Redirect through the VNPay gateway.
    Vnpay,
}

/// Fields assigned by the gateway, written only by the callback handler.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayFields {
    /// Gateway-side transaction number (`vnp_TransactionNo`).
    pub transaction_no: Option<String>,
    /// Bank the customer paid through (`vnp_BankCode`).
    pub bank_code: Option<String>,
    /// Card type used (`vnp_CardType`).
    pub card_type: Option<String>,
    /// Raw response code reported by the gateway (`vnp_ResponseCode`).
    pub response_code: Option<String>,
    /// Settlement time as reported by the gateway (`vnp_PayDate`).
    pub paid_at: Option<NaiveDateTime>,
}

/// A payment attempt against a reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub booking_id: Uuid,
    /// Guest the money comes from.
    pub payer_id: Uuid,
    /// Equals the reservation's total price at creation time.
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Locally generated reference, unique across all payments, issued
    /// before the redirect goes out.
    pub txn_ref: String,
    pub gateway: GatewayFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trait for storing payment data.
///
/// An in-memory implementation covering both this trait and
/// [`crate::booking::storage::BookingStore`] is provided for testing.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a new PENDING payment.
    ///
    /// Rejects a duplicate transaction reference; backing stores should
    /// enforce this with a unique constraint.
    async fn insert_payment(&self, payment: &Payment) -> Result<()>;

    async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>>;

    async fn get_payment_by_txn_ref(&self, txn_ref: &str) -> Result<Option<Payment>>;

    /// Overwrite a payment record without touching its reservation.
    ///
    /// Used when a replayed callback refreshes gateway metadata on an
    /// already-resolved payment.
    async fn save_payment(&self, payment: &Payment) -> Result<()>;

    /// Persist a resolved payment and its reservation effect together.
    ///
    /// When `settle_booking` is set, the owning reservation's `paid` flag is
    /// raised and a PENDING reservation moves to CONFIRMED. Implementations
    /// MUST commit the payment row and the reservation mutation as one
    /// atomic unit (one database transaction), or not at all.
    async fn record_settlement(&self, payment: &Payment, settle_booking: bool) -> Result<()>;
}

#[cfg(any(test, feature = "test-stores"))]
mod in_memory {
    use super::*;
    use crate::booking::storage::test::InMemoryStore;
    use crate::booking::types::BookingStatus;
    use crate::settlement::error::SettlementError;

    #[async_trait]
    impl PaymentStore for InMemoryStore {
        async fn insert_payment(&self, payment: &Payment) -> Result<()> {
            let mut state = self.state.write().await;
            if state.payment_refs.contains_key(&payment.txn_ref) {
                return Err(SettlementError::DuplicateTxnRef {
                    txn_ref: payment.txn_ref.clone(),
                }
                .into());
            }
            state
                .payment_refs
                .insert(payment.txn_ref.clone(), payment.id);
            state.payments.insert(payment.id, payment.clone());
            Ok(())
        }

        async fn get_payment(&self, id: Uuid) -> Result<Option<Payment>> {
            let state = self.state.read().await;
            Ok(state.payments.get(&id).cloned())
        }

        async fn get_payment_by_txn_ref(&self, txn_ref: &str) -> Result<Option<Payment>> {
            let state = self.state.read().await;
            let id = state.payment_refs.get(txn_ref);
            Ok(id.and_then(|id| state.payments.get(id)).cloned())
        }

        async fn save_payment(&self, payment: &Payment) -> Result<()> {
            let mut state = self.state.write().await;
            state.payments.insert(payment.id, payment.clone());
            Ok(())
        }

        async fn record_settlement(&self, payment: &Payment, settle_booking: bool) -> Result<()> {
            let mut state = self.state.write().await;

            if settle_booking {
                let booking =
                    state
                        .bookings
                        .get_mut(&payment.booking_id)
                        .ok_or_else(|| {
                            crate::error::QuaysideError::not_found(format!(
                                "Reservation not found: {}",
                                payment.booking_id
                            ))
                        })?;
                booking.paid = true;
                if booking.status == BookingStatus::Pending {
                    booking.status = BookingStatus::Confirmed;
                }
            }

            state.payments.insert(payment.id, payment.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::storage::test::InMemoryStore;
    use crate::booking::storage::BookingStore;
    use crate::booking::types::{
        Booking, BookingKind, BookingStatus, Resource, ResourceKind, StayDates,
    };

    fn payment(booking_id: Uuid, txn_ref: &str) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            booking_id,
            payer_id: Uuid::new_v4(),
            amount: Decimal::new(500_00, 2),
            method: PaymentMethod::Vnpay,
            status: PaymentStatus::Pending,
            txn_ref: txn_ref.to_string(),
            gateway: GatewayFields::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn seeded_booking(store: &InMemoryStore) -> Booking {
        let resource = Resource {
            id: Uuid::new_v4(),
            host_id: Uuid::new_v4(),
            title: "Loft".to_string(),
            unit_price: Decimal::new(250_00, 2),
            capacity: 2,
            latitude: 0.0,
            longitude: 0.0,
            active: true,
            kind: ResourceKind::Dwelling,
            version: 0,
        };
        store.insert_resource(&resource).await.unwrap();

        let booking = Booking {
            id: Uuid::new_v4(),
            resource_id: resource.id,
            customer_id: Uuid::new_v4(),
            total_price: Decimal::new(500_00, 2),
            status: BookingStatus::Pending,
            paid: false,
            kind: BookingKind::Dwelling {
                stay: StayDates::new(
                    Utc::now() + chrono::Duration::days(5),
                    Utc::now() + chrono::Duration::days(7),
                ),
                guests: 2,
            },
            created_at: Utc::now(),
        };
        store.insert_booking_versioned(&booking, 0).await.unwrap();
        booking
    }

    #[tokio::test]
    async fn test_duplicate_txn_ref_rejected() {
        let store = InMemoryStore::new();
        let booking = seeded_booking(&store).await;

        store
            .insert_payment(&payment(booking.id, "ref-1"))
            .await
            .unwrap();
        let result = store.insert_payment(&payment(booking.id, "ref-1")).await;
        assert!(matches!(
            result,
            Err(crate::error::QuaysideError::BadRequest(ref msg)) if msg.contains("already exists")
        ));
    }

    #[tokio::test]
    async fn test_lookup_by_txn_ref() {
        let store = InMemoryStore::new();
        let booking = seeded_booking(&store).await;
        let p = payment(booking.id, "ref-2");
        store.insert_payment(&p).await.unwrap();

        let found = store.get_payment_by_txn_ref("ref-2").await.unwrap();
        assert_eq!(found.unwrap().id, p.id);
        assert!(store.get_payment_by_txn_ref("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_settlement_marks_booking_paid_and_confirmed() {
        let store = InMemoryStore::new();
        let booking = seeded_booking(&store).await;
        let mut p = payment(booking.id, "ref-3");
        store.insert_payment(&p).await.unwrap();

        p.status = PaymentStatus::Success;
        store.record_settlement(&p, true).await.unwrap();

        let stored = store.get_booking(booking.id).await.unwrap().unwrap();
        assert!(stored.paid);
        assert_eq!(stored.status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_record_settlement_failed_leaves_booking_unpaid() {
        let store = InMemoryStore::new();
        let booking = seeded_booking(&store).await;
        let mut p = payment(booking.id, "ref-4");
        store.insert_payment(&p).await.unwrap();

        p.status = PaymentStatus::Failed;
        store.record_settlement(&p, false).await.unwrap();

        let stored = store.get_booking(booking.id).await.unwrap().unwrap();
        assert!(!stored.paid);
        assert_eq!(stored.status, BookingStatus::Pending);
    }
}
