//! HTTP wiring for the reservation and settlement core.
//!
//! A thin axum layer: handlers deserialize, pass the acting user through to
//! the managers, and serialize the result. Authentication lives in the
//! embedding application; it supplies the acting user id in the request
//! body, having verified it however it sees fit.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::booking::storage::BookingStore;
use crate::booking::types::{Booking, StayDates};
use crate::booking::{BookingManager, NewDwellingBooking, NewSessionBooking};
use crate::error::Result;
use crate::notify::{Directory, Notifier};
use crate::settlement::storage::PaymentStore;
use crate::settlement::{CallbackHandler, CheckoutManager, PaymentRedirect};

/// Shared state handed to every handler.
pub struct AppState<S, N, D>
where
    S: BookingStore + PaymentStore + Clone,
    N: Notifier + Clone,
    D: Directory + Clone,
{
    pub bookings: BookingManager<S, N, D>,
    pub checkout: CheckoutManager<S>,
    pub callback: CallbackHandler<S, N>,
}

impl<S, N, D> Clone for AppState<S, N, D>
where
    S: BookingStore + PaymentStore + Clone,
    N: Notifier + Clone,
    D: Directory + Clone,
{
    fn clone(&self) -> Self {
        Self {
            bookings: self.bookings.clone(),
            checkout: self.checkout.clone(),
            callback: self.callback.clone(),
        }
    }
}

/// Build the core's router.
pub fn router<S, N, D>(state: AppState<S, N, D>) -> Router
where
    S: BookingStore + PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    D: Directory + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/bookings/dwellings", post(book_dwelling))
        .route("/bookings/sessions", post(book_session))
        .route("/bookings/:id/confirm", post(confirm_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/pay", post(pay_booking))
        .route("/payments/vnpay/return", get(vnpay_return))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct BookDwellingRequest {
    customer_id: Uuid,
    resource_id: Uuid,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    guests: u32,
}

#[derive(Debug, Deserialize)]
struct BookSessionRequest {
    customer_id: Uuid,
    session_id: Uuid,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct ActorRequest {
    actor_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct PayRequest {
    payer_id: Uuid,
}

async fn book_dwelling<S, N, D>(
    State(state): State<AppState<S, N, D>>,
    Json(request): Json<BookDwellingRequest>,
) -> Result<(StatusCode, Json<Booking>)>
where
    S: BookingStore + PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    D: Directory + Clone + Send + Sync + 'static,
{
    let booking = state
        .bookings
        .book_dwelling(
            request.customer_id,
            NewDwellingBooking {
                resource_id: request.resource_id,
                stay: StayDates::new(request.check_in, request.check_out),
                guests: request.guests,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn book_session<S, N, D>(
    State(state): State<AppState<S, N, D>>,
    Json(request): Json<BookSessionRequest>,
) -> Result<(StatusCode, Json<Booking>)>
where
    S: BookingStore + PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    D: Directory + Clone + Send + Sync + 'static,
{
    let booking = state
        .bookings
        .book_session(
            request.customer_id,
            NewSessionBooking {
                session_id: request.session_id,
                quantity: request.quantity,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn confirm_booking<S, N, D>(
    State(state): State<AppState<S, N, D>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<Booking>>
where
    S: BookingStore + PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    D: Directory + Clone + Send + Sync + 'static,
{
    let booking = state.bookings.confirm(request.actor_id, id).await?;
    Ok(Json(booking))
}

async fn cancel_booking<S, N, D>(
    State(state): State<AppState<S, N, D>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<Booking>>
where
    S: BookingStore + PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    D: Directory + Clone + Send + Sync + 'static,
{
    let booking = state.bookings.cancel(request.actor_id, id).await?;
    Ok(Json(booking))
}

async fn pay_booking<S, N, D>(
    State(state): State<AppState<S, N, D>>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<PayRequest>,
) -> Result<Json<PaymentRedirect>>
where
    S: BookingStore + PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    D: Directory + Clone + Send + Sync + 'static,
{
    let client_ip = client_ip(&headers);
    let redirect = state
        .checkout
        .create_payment_redirect(request.payer_id, id, &client_ip)
        .await?;
    Ok(Json(redirect))
}

async fn vnpay_return<S, N, D>(
    State(state): State<AppState<S, N, D>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Redirect>
where
    S: BookingStore + PaymentStore + Clone + Send + Sync + 'static,
    N: Notifier + Clone + Send + Sync + 'static,
    D: Directory + Clone + Send + Sync + 'static,
{
    let resolution = state.callback.handle(&params).await?;
    Ok(Redirect::to(&resolution.redirect_url))
}

/// Best-effort client address for the gateway's `vnp_IpAddr` parameter.
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "127.0.0.1".to_string())
}
