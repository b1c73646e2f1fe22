//! End-to-end settlement: redirect construction, callback reconciliation,
//! idempotent replay, signature integrity, and the HTTP callback endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use quayside::booking::{
    Booking, BookingManager, BookingStatus, BookingStore, InMemoryStore, NewDwellingBooking,
    Resource, ResourceKind, StayDates,
};
use quayside::notify::test::CaptureNotifier;
use quayside::notify::NoDirectory;
use quayside::settlement::{
    signing, CallbackHandler, CheckoutManager, PaymentStatus, PaymentStore, SettlementOutcome,
};
use quayside::{routes, VnpayConfig};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-secret";

fn gateway_config() -> VnpayConfig {
    VnpayConfig {
        tmn_code: "QSIDE01".to_string(),
        secret: SECRET.to_string().into(),
        ..VnpayConfig::default()
    }
}

async fn seeded_pending_booking(store: &InMemoryStore) -> (Resource, Booking) {
    let resource = Resource {
        id: Uuid::new_v4(),
        host_id: Uuid::new_v4(),
        title: "Old-quarter apartment".to_string(),
        unit_price: Decimal::new(450_000, 0),
        capacity: 3,
        latitude: 21.03,
        longitude: 105.85,
        active: true,
        kind: ResourceKind::Dwelling,
        version: 0,
    };
    store.insert_resource(&resource).await.unwrap();

    let manager = BookingManager::new(store.clone(), CaptureNotifier::new(), NoDirectory);
    let check_in = Utc::now() + Duration::days(14);
    let booking = manager
        .book_dwelling(
            Uuid::new_v4(),
            NewDwellingBooking {
                resource_id: resource.id,
                stay: StayDates::new(check_in, check_in + Duration::days(2)),
                guests: 2,
            },
        )
        .await
        .unwrap();
    (resource, booking)
}

/// Re-sign a parameter map the way the gateway signs its callbacks.
fn gateway_signed(mut params: BTreeMap<String, String>) -> BTreeMap<String, String> {
    let signature = signing::sign(&signing::hash_data(&params), SECRET).unwrap();
    params.insert(signing::SECURE_HASH_PARAM.to_string(), signature);
    params
}

fn callback_params(txn_ref: &str, response_code: &str) -> BTreeMap<String, String> {
    gateway_signed(
        [
            ("vnp_TxnRef", txn_ref),
            ("vnp_ResponseCode", response_code),
            ("vnp_TransactionNo", "14579301"),
            ("vnp_BankCode", "NCB"),
            ("vnp_CardType", "ATM"),
            ("vnp_PayDate", "20250615101530"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
    )
}

#[tokio::test]
async fn redirect_then_callback_settles_exactly_once() {
    let store = InMemoryStore::new();
    let (_, booking) = seeded_pending_booking(&store).await;

    let checkout = CheckoutManager::new(store.clone(), gateway_config());
    let redirect = checkout
        .create_payment_redirect(booking.customer_id, booking.id, "203.0.113.9")
        .await
        .unwrap();

    // The issued payment copies the reservation's total price.
    let payment = store
        .get_payment_by_txn_ref(&redirect.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.amount, booking.total_price);
    assert_eq!(payment.status, PaymentStatus::Pending);

    // The redirect URL itself verifies under the shared secret.
    let query = redirect.url.split_once('?').unwrap().1;
    let params: BTreeMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert!(signing::verify(&params, SECRET).unwrap());

    let handler = CallbackHandler::new(store.clone(), CaptureNotifier::new(), gateway_config());
    let resolution = handler
        .handle(&callback_params(&redirect.txn_ref, "00"))
        .await
        .unwrap();
    assert_eq!(resolution.outcome, SettlementOutcome::Succeeded);

    let settled = store.get_booking(booking.id).await.unwrap().unwrap();
    assert!(settled.paid);
    assert_eq!(settled.status, BookingStatus::Confirmed);
    // Price invariance across the whole flow.
    assert_eq!(settled.total_price, booking.total_price);
}

#[tokio::test]
async fn replaying_the_same_callback_applies_once() {
    let store = InMemoryStore::new();
    let (_, booking) = seeded_pending_booking(&store).await;

    let checkout = CheckoutManager::new(store.clone(), gateway_config());
    let redirect = checkout
        .create_payment_redirect(booking.customer_id, booking.id, "127.0.0.1")
        .await
        .unwrap();

    let notifier = CaptureNotifier::new();
    let handler = CallbackHandler::new(store.clone(), notifier.clone(), gateway_config());
    let callback = callback_params(&redirect.txn_ref, "00");

    let first = handler.handle(&callback).await.unwrap();
    let second = handler.handle(&callback).await.unwrap();

    assert_eq!(first.outcome, SettlementOutcome::Succeeded);
    assert_eq!(second.outcome, SettlementOutcome::AlreadyResolved);

    let payment = store
        .get_payment_by_txn_ref(&redirect.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Success);
    assert_eq!(notifier.sent().await.len(), 1);
}

#[tokio::test]
async fn any_tampered_parameter_invalidates_the_signature() {
    let store = InMemoryStore::new();
    let (_, booking) = seeded_pending_booking(&store).await;

    let checkout = CheckoutManager::new(store.clone(), gateway_config());
    let redirect = checkout
        .create_payment_redirect(booking.customer_id, booking.id, "127.0.0.1")
        .await
        .unwrap();

    let handler = CallbackHandler::new(store.clone(), CaptureNotifier::new(), gateway_config());
    let genuine = callback_params(&redirect.txn_ref, "00");

    // Flip one character in each parameter in turn; every mutation must be
    // rejected without touching the payment or the reservation.
    for key in ["vnp_TxnRef", "vnp_ResponseCode", "vnp_TransactionNo", "vnp_BankCode"] {
        let mut tampered = genuine.clone();
        let mut value = tampered[key].clone();
        let last = value.pop().unwrap();
        value.push(if last == '0' { '1' } else { '0' });
        tampered.insert(key.to_string(), value);

        assert!(handler.handle(&tampered).await.is_err(), "tampered {key} accepted");
    }

    let payment = store
        .get_payment_by_txn_ref(&redirect.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert!(!store.get_booking(booking.id).await.unwrap().unwrap().paid);
}

#[tokio::test]
async fn declined_settlement_is_terminal_but_not_an_error() {
    let store = InMemoryStore::new();
    let (_, booking) = seeded_pending_booking(&store).await;

    let checkout = CheckoutManager::new(store.clone(), gateway_config());
    let redirect = checkout
        .create_payment_redirect(booking.customer_id, booking.id, "127.0.0.1")
        .await
        .unwrap();

    let handler = CallbackHandler::new(store.clone(), CaptureNotifier::new(), gateway_config());
    let resolution = handler
        .handle(&callback_params(&redirect.txn_ref, "51"))
        .await
        .unwrap();
    assert_eq!(resolution.outcome, SettlementOutcome::Failed);

    let payment = store
        .get_payment_by_txn_ref(&redirect.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert_eq!(payment.gateway.response_code.as_deref(), Some("51"));

    // The reservation survives unpaid and can be paid again.
    let retry = checkout
        .create_payment_redirect(booking.customer_id, booking.id, "127.0.0.1")
        .await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn callback_endpoint_rejects_tampered_query_with_json_error() {
    let store = InMemoryStore::new();
    let (_, booking) = seeded_pending_booking(&store).await;

    let checkout = CheckoutManager::new(store.clone(), gateway_config());
    let redirect = checkout
        .create_payment_redirect(booking.customer_id, booking.id, "127.0.0.1")
        .await
        .unwrap();

    let state = routes::AppState {
        bookings: BookingManager::new(store.clone(), CaptureNotifier::new(), NoDirectory),
        checkout,
        callback: CallbackHandler::new(store.clone(), CaptureNotifier::new(), gateway_config()),
    };
    let app = routes::router(state);

    let mut params = callback_params(&redirect.txn_ref, "00");
    params.insert("vnp_Amount".to_string(), "1".to_string());
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/payments/vnpay/return?{query}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].as_str().unwrap().contains("signature"));
    assert!(body["error_id"].as_str().is_some());

    // Nothing settled.
    assert!(!store.get_booking(booking.id).await.unwrap().unwrap().paid);
}

#[tokio::test]
async fn callback_endpoint_redirects_the_end_user() {
    let store = InMemoryStore::new();
    let (_, booking) = seeded_pending_booking(&store).await;

    let checkout = CheckoutManager::new(store.clone(), gateway_config());
    let redirect = checkout
        .create_payment_redirect(booking.customer_id, booking.id, "127.0.0.1")
        .await
        .unwrap();

    let state = routes::AppState {
        bookings: BookingManager::new(store.clone(), CaptureNotifier::new(), NoDirectory),
        checkout,
        callback: CallbackHandler::new(store.clone(), CaptureNotifier::new(), gateway_config()),
    };
    let app = routes::router(state);

    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(callback_params(&redirect.txn_ref, "00"))
        .finish();
    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/payments/vnpay/return?{query}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers().get("location").unwrap().to_str().unwrap();
    assert!(location.contains("success"));
    assert!(location.contains(&redirect.txn_ref));

    let settled = store.get_booking(booking.id).await.unwrap().unwrap();
    assert!(settled.paid);
}
