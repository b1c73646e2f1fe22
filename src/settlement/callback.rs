//! Inbound gateway callback reconciliation.
//!
//! The gateway notifies settlement results with a signed GET request. The
//! handler verifies authenticity before touching any state, resolves the
//! payment exactly once, and is safe to replay: a duplicate delivery
//! refreshes gateway metadata but never re-applies the reservation effect.

use chrono::{NaiveDateTime, Utc};
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use url::form_urlencoded;

use crate::booking::storage::BookingStore;
use crate::config::VnpayConfig;
use crate::error::Result;
use crate::notify::{Notification, NotificationKind, Notifier};

use super::error::SettlementError;
use super::signing;
use super::storage::{GatewayFields, PaymentStatus, PaymentStore};

/// Response code the gateway sends for a successful settlement.
const SUCCESS_RESPONSE_CODE: &str = "00";
/// Fixed timestamp layout used by the gateway (`vnp_PayDate`).
const PAY_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// How a verified callback was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// The payment settled and the reservation is now paid.
    Succeeded,
    /// The gateway declined; the payment is FAILED and the reservation
    /// stays unpaid.
    Failed,
    /// The payment was already resolved by an earlier delivery; only
    /// gateway metadata was refreshed.
    AlreadyResolved,
}

/// Result of processing a callback.
#[derive(Debug, Clone)]
pub struct CallbackResolution {
    pub outcome: SettlementOutcome,
    pub txn_ref: String,
    /// Where to send the end user, with the transaction reference attached.
    pub redirect_url: String,
}

/// Reconciles gateway callbacks against payments.
pub struct CallbackHandler<S: BookingStore + PaymentStore, N: Notifier> {
    store: S,
    notifier: N,
    config: VnpayConfig,
}

impl<S: BookingStore + PaymentStore + Clone, N: Notifier + Clone> Clone for CallbackHandler<S, N> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            notifier: self.notifier.clone(),
            config: self.config.clone(),
        }
    }
}

impl<S: BookingStore + PaymentStore, N: Notifier> CallbackHandler<S, N> {
    /// Create a new callback handler.
    #[must_use]
    pub fn new(store: S, notifier: N, config: VnpayConfig) -> Self {
        Self {
            store,
            notifier,
            config,
        }
    }

    /// Verify and apply one gateway callback.
    ///
    /// Rejects without any state change when the signature does not verify
    /// or the transaction reference is unknown. Otherwise resolves the
    /// payment at most once and always persists the gateway's metadata.
    pub async fn handle(&self, params: &BTreeMap<String, String>) -> Result<CallbackResolution> {
        if !signing::verify(params, self.config.secret.expose_secret())? {
            tracing::warn!(
                target: "quayside::settlement",
                "rejected gateway callback with invalid signature"
            );
            return Err(SettlementError::InvalidSignature.into());
        }

        let txn_ref = params
            .get("vnp_TxnRef")
            .ok_or(SettlementError::MissingParam { name: "vnp_TxnRef" })?
            .clone();

        let mut payment = self
            .store
            .get_payment_by_txn_ref(&txn_ref)
            .await?
            .ok_or_else(|| SettlementError::PaymentNotFound {
                txn_ref: txn_ref.clone(),
            })?;

        let gateway = gateway_fields(params);

        // Duplicate delivery: keep the verdict from the first callback,
        // refresh metadata only.
        if payment.status.is_resolved() {
            tracing::info!(
                target: "quayside::settlement",
                txn_ref = %txn_ref,
                status = payment.status.as_str(),
                "replayed callback for resolved payment"
            );
            let settled = payment.status == PaymentStatus::Success;
            payment.gateway = gateway;
            payment.updated_at = Utc::now();
            self.store.save_payment(&payment).await?;
            return Ok(self.resolution(SettlementOutcome::AlreadyResolved, txn_ref, settled));
        }

        let response_code = params
            .get("vnp_ResponseCode")
            .ok_or(SettlementError::MissingParam {
                name: "vnp_ResponseCode",
            })?;
        let settled = response_code == SUCCESS_RESPONSE_CODE;

        payment.status = if settled {
            PaymentStatus::Success
        } else {
            PaymentStatus::Failed
        };
        payment.gateway = gateway;
        payment.updated_at = Utc::now();

        self.store.record_settlement(&payment, settled).await?;

        tracing::info!(
            target: "quayside::settlement",
            txn_ref = %txn_ref,
            booking_id = %payment.booking_id,
            response_code = %response_code,
            status = payment.status.as_str(),
            "gateway callback applied"
        );

        self.notify_payer(&payment, settled).await;

        let outcome = if settled {
            SettlementOutcome::Succeeded
        } else {
            SettlementOutcome::Failed
        };
        Ok(self.resolution(outcome, txn_ref, settled))
    }

    fn resolution(
        &self,
        outcome: SettlementOutcome,
        txn_ref: String,
        settled: bool,
    ) -> CallbackResolution {
        let base = if settled {
            &self.config.success_redirect
        } else {
            &self.config.failure_redirect
        };
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("txn_ref", &txn_ref)
            .finish();

        CallbackResolution {
            outcome,
            redirect_url: format!("{base}?{query}"),
            txn_ref,
        }
    }

    async fn notify_payer(&self, payment: &super::storage::Payment, settled: bool) {
        let (kind, title, message) = if settled {
            (
                NotificationKind::PaymentReceived,
                "Payment received",
                format!("Your payment of {} was received", payment.amount),
            )
        } else {
            (
                NotificationKind::PaymentFailed,
                "Payment failed",
                "Your payment was declined by the gateway".to_string(),
            )
        };

        self.notifier
            .notify(Notification {
                recipient: payment.payer_id,
                kind,
                title: title.to_string(),
                message,
                reference: payment.booking_id,
            })
            .await;
    }
}

/// Extract the gateway-assigned fields from a verified callback.
fn gateway_fields(params: &BTreeMap<String, String>) -> GatewayFields {
    GatewayFields {
        transaction_no: params.get("vnp_TransactionNo").cloned(),
        bank_code: params.get("vnp_BankCode").cloned(),
        card_type: params.get("vnp_CardType").cloned(),
        response_code: params.get("vnp_ResponseCode").cloned(),
        paid_at: params.get("vnp_PayDate").and_then(|raw| {
            match NaiveDateTime::parse_from_str(raw, PAY_DATE_FORMAT) {
                Ok(parsed) => Some(parsed),
                Err(_) => {
                    tracing::warn!(
                        target: "quayside::settlement",
                        value = %raw,
                        "unparseable vnp_PayDate on callback"
                    );
                    None
                }
            }
        }),
    }
}
