//! Settlement-specific error types.

use std::fmt;
use uuid::Uuid;

use crate::booking::types::BookingStatus;

/// Settlement-specific errors.
///
/// Note that a declined payment is not an error: the gateway reporting a
/// non-success response code resolves the payment to FAILED, which is a
/// normal terminal state. These errors cover requests the core refuses to
/// act on at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// The reservation to pay for was not found.
    BookingNotFound { id: Uuid },
    /// Only the guest who made the reservation may pay for it.
    NotPayer { booking_id: Uuid },
    /// Payment links are only issued for PENDING reservations.
    BookingNotPending { id: Uuid, status: BookingStatus },
    /// The reservation has already been paid.
    AlreadyPaid { id: Uuid },
    /// A payment with this transaction reference already exists.
    DuplicateTxnRef { txn_ref: String },
    /// No payment matches the callback's transaction reference.
    PaymentNotFound { txn_ref: String },
    /// The callback signature did not verify.
    InvalidSignature,
    /// The callback is missing a required parameter.
    MissingParam { name: &'static str },
}

impl fmt::Display for SettlementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BookingNotFound { id } => write!(f, "Reservation not found: {id}"),
            Self::NotPayer { booking_id } => {
                write!(f, "Reservation {booking_id} belongs to another guest")
            }
            Self::BookingNotPending { id, status } => {
                write!(f, "Reservation {id} is {status}, only pending reservations can be paid")
            }
            Self::AlreadyPaid { id } => write!(f, "Reservation {id} is already paid"),
            Self::DuplicateTxnRef { txn_ref } => {
                write!(f, "Transaction reference already exists: {txn_ref}")
            }
            Self::PaymentNotFound { txn_ref } => {
                write!(f, "Payment not found for transaction reference {txn_ref}")
            }
            Self::InvalidSignature => write!(f, "Invalid gateway signature"),
            Self::MissingParam { name } => write!(f, "Missing callback parameter: {name}"),
        }
    }
}

impl std::error::Error for SettlementError {}

impl From<SettlementError> for crate::error::QuaysideError {
    fn from(err: SettlementError) -> Self {
        match &err {
            SettlementError::BookingNotFound { .. }
            | SettlementError::PaymentNotFound { .. } => {
                crate::error::QuaysideError::NotFound(err.to_string())
            }

            SettlementError::NotPayer { .. } => {
                crate::error::QuaysideError::Forbidden(err.to_string())
            }

            SettlementError::BookingNotPending { .. }
            | SettlementError::AlreadyPaid { .. }
            | SettlementError::DuplicateTxnRef { .. }
            | SettlementError::InvalidSignature
            | SettlementError::MissingParam { .. } => {
                crate::error::QuaysideError::BadRequest(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SettlementError::PaymentNotFound {
            txn_ref: "ab12".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Payment not found for transaction reference ab12"
        );

        // The signature failure message carries no detail that would help an
        // attacker probe the verification.
        assert_eq!(
            SettlementError::InvalidSignature.to_string(),
            "Invalid gateway signature"
        );
    }

    #[test]
    fn test_convert_to_quayside_error() {
        let err: crate::error::QuaysideError = SettlementError::PaymentNotFound {
            txn_ref: "x".to_string(),
        }
        .into();
        assert!(matches!(err, crate::error::QuaysideError::NotFound(_)));

        let err: crate::error::QuaysideError = SettlementError::InvalidSignature.into();
        assert!(matches!(err, crate::error::QuaysideError::BadRequest(_)));

        let err: crate::error::QuaysideError = SettlementError::NotPayer {
            booking_id: Uuid::new_v4(),
        }
        .into();
        assert!(matches!(err, crate::error::QuaysideError::Forbidden(_)));
    }
}
