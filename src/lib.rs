//! Quayside - the reservation and settlement core of a two-sided stays and
//! experiences marketplace.
//!
//! Hosts list dwellings (reserved by date range) or experiences (reserved by
//! seats on fixed-capacity sessions); guests reserve them and pay through a
//! signed redirect to the VNPay gateway. The crate guarantees that a
//! dwelling is never double-booked, a session is never over-booked, and an
//! asynchronous, untrusted gateway callback settles exactly one payment
//! exactly once.
//!
//! # Features
//!
//! - **Bookings**: one PENDING -> CONFIRMED / CANCELLED state machine for
//!   both reservation kinds, with versioned writes guarding every admission
//!   decision
//! - **Settlement**: signed redirect construction and constant-time callback
//!   verification with replay-safe reconciliation
//! - **Storage**: trait-based stores with an in-memory implementation for
//!   tests (`test-stores` feature)
//! - **HTTP**: an axum router exposing the core operations
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quayside::{ConfigBuilder, routes};
//! use quayside::booking::BookingManager;
//! use quayside::notify::{NoDirectory, TracingNotifier};
//! use quayside::settlement::{CallbackHandler, CheckoutManager};
//!
//! # #[cfg(feature = "test-stores")]
//! #[tokio::main]
//! async fn main() {
//!     quayside::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build().unwrap();
//!     let store = quayside::booking::InMemoryStore::new();
//!
//!     let state = routes::AppState {
//!         bookings: BookingManager::new(store.clone(), TracingNotifier, NoDirectory),
//!         checkout: CheckoutManager::new(store.clone(), config.vnpay.clone()),
//!         callback: CallbackHandler::new(store, TracingNotifier, config.vnpay.clone()),
//!     };
//!
//!     let app = routes::router(state);
//!     let listener = tokio::net::TcpListener::bind(config.server.addr().unwrap())
//!         .await
//!         .unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! # #[cfg(not(feature = "test-stores"))]
//! # fn main() {}
//! ```

pub mod booking;
mod config;
mod error;
pub mod notify;
pub mod routes;
pub mod settlement;

// Re-exports for public API
pub use config::{Config, ConfigBuilder, LoggingConfig, ServerConfig, VnpayConfig};
pub use error::{ErrorResponse, QuaysideError, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// This should be called early in your application, typically in main().
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "quayside=debug")
/// - `QUAYSIDE_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_logs = std::env::var("QUAYSIDE_LOG_JSON")
        .map(|v| v.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    let env_filter = EnvFilter::new(&config.logging.level);

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
