//! Settlement through the VNPay redirect gateway.
//!
//! Paying for a reservation is a round trip: [`CheckoutManager`] issues a
//! signed redirect URL and a PENDING payment row, the guest pays on the
//! gateway's pages, and the gateway calls back with a signed result that
//! [`CallbackHandler`] reconciles against exactly one payment exactly once.
//!
//! # Example
//!
//! ```rust,ignore
//! use quayside::settlement::{CheckoutManager, CallbackHandler};
//!
//! let checkout = CheckoutManager::new(store.clone(), config.vnpay.clone());
//! let redirect = checkout
//!     .create_payment_redirect(guest_id, booking_id, client_ip)
//!     .await?;
//! // Send the guest to redirect.url; the gateway will call back.
//!
//! let callback = CallbackHandler::new(store, notifier, config.vnpay);
//! let resolution = callback.handle(&query_params).await?;
//! // Redirect the guest to resolution.redirect_url.
//! ```

pub mod callback;
pub mod checkout;
pub mod error;
pub mod signing;
pub mod storage;

// Checkout exports
pub use checkout::{CheckoutManager, PaymentRedirect};

// Callback exports
pub use callback::{CallbackHandler, CallbackResolution, SettlementOutcome};

// Storage exports
pub use storage::{GatewayFields, Payment, PaymentMethod, PaymentStatus, PaymentStore};

// Error exports
pub use error::SettlementError;
