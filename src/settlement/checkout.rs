//! Outbound payment redirects.
//!
//! For a PENDING reservation this issues a transaction reference, persists a
//! PENDING payment row, and builds the signed gateway URL the guest is sent
//! to. The amount on the wire is the decimal total scaled by 100 with no
//! fractional units.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::booking::storage::BookingStore;
use crate::booking::types::BookingStatus;
use crate::config::VnpayConfig;
use crate::error::Result;

use super::error::SettlementError;
use super::signing;
use super::storage::{GatewayFields, Payment, PaymentMethod, PaymentStatus, PaymentStore};

/// Protocol version spoken to the gateway.
const VNP_VERSION: &str = "2.1.0";
/// Command for a purchase redirect.
const VNP_COMMAND_PAY: &str = "pay";

/// A ready-to-use payment redirect.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaymentRedirect {
    /// Fully signed gateway URL to send the guest to.
    pub url: String,
    /// Transaction reference identifying the payment in the callback.
    pub txn_ref: String,
}

/// Builds signed payment redirects for pending reservations.
pub struct CheckoutManager<S: BookingStore + PaymentStore> {
    store: S,
    config: VnpayConfig,
}

impl<S: BookingStore + PaymentStore + Clone> Clone for CheckoutManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: BookingStore + PaymentStore> CheckoutManager<S> {
    /// Create a new checkout manager.
    #[must_use]
    pub fn new(store: S, config: VnpayConfig) -> Self {
        Self { store, config }
    }

    /// Issue a payment redirect for a reservation.
    ///
    /// The payment row is persisted PENDING before the URL leaves this
    /// method, so every redirect that reaches a guest has a reference the
    /// callback can resolve.
    pub async fn create_payment_redirect(
        &self,
        payer_id: Uuid,
        booking_id: Uuid,
        client_ip: &str,
    ) -> Result<PaymentRedirect> {
        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(SettlementError::BookingNotFound { id: booking_id })?;

        if booking.customer_id != payer_id {
            return Err(SettlementError::NotPayer { booking_id }.into());
        }
        if booking.paid {
            return Err(SettlementError::AlreadyPaid { id: booking_id }.into());
        }
        if booking.status != BookingStatus::Pending {
            return Err(SettlementError::BookingNotPending {
                id: booking_id,
                status: booking.status,
            }
            .into());
        }

        let now = Utc::now();
        let txn_ref = Uuid::new_v4().simple().to_string();
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id,
            payer_id,
            amount: booking.total_price,
            method: PaymentMethod::Vnpay,
            status: PaymentStatus::Pending,
            txn_ref: txn_ref.clone(),
            gateway: GatewayFields::default(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_payment(&payment).await?;

        let url = self.build_redirect_url(&payment, now, client_ip)?;

        tracing::info!(
            target: "quayside::settlement",
            booking_id = %booking_id,
            txn_ref = %txn_ref,
            amount = %payment.amount,
            "payment redirect issued"
        );

        Ok(PaymentRedirect { url, txn_ref })
    }

    fn build_redirect_url(
        &self,
        payment: &Payment,
        created_at: DateTime<Utc>,
        client_ip: &str,
    ) -> Result<String> {
        let expires_at = created_at + Duration::minutes(self.config.expire_minutes);

        let mut params = BTreeMap::new();
        params.insert("vnp_Version".to_string(), VNP_VERSION.to_string());
        params.insert("vnp_Command".to_string(), VNP_COMMAND_PAY.to_string());
        params.insert("vnp_TmnCode".to_string(), self.config.tmn_code.clone());
        params.insert("vnp_Amount".to_string(), wire_amount(payment.amount)?.to_string());
        params.insert("vnp_CurrCode".to_string(), self.config.currency.clone());
        params.insert("vnp_TxnRef".to_string(), payment.txn_ref.clone());
        params.insert(
            "vnp_OrderInfo".to_string(),
            format!("Payment for reservation {}", payment.booking_id),
        );
        params.insert("vnp_Locale".to_string(), self.config.locale.clone());
        params.insert("vnp_ReturnUrl".to_string(), self.config.return_url.clone());
        params.insert("vnp_IpAddr".to_string(), client_ip.to_string());
        params.insert(
            "vnp_CreateDate".to_string(),
            created_at.format("%Y%m%d%H%M%S").to_string(),
        );
        params.insert(
            "vnp_ExpireDate".to_string(),
            expires_at.format("%Y%m%d%H%M%S").to_string(),
        );

        let query = signing::signed_query(&params, self.config.secret.expose_secret())?;
        Ok(format!("{}?{}", self.config.pay_url, query))
    }
}

/// Scale a decimal amount to the gateway's integer minor-unit form
/// (amount times 100, truncated).
fn wire_amount(amount: Decimal) -> Result<i64> {
    (amount * Decimal::from(100))
        .trunc()
        .to_i64()
        .ok_or_else(|| crate::error::QuaysideError::internal("Payment amount out of range"))
}
