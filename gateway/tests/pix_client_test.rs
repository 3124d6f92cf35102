//! Wire-level tests for the PIX client against a mock provider.
//!
//! Run with: `cargo test --test pix_client_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use chrono::{Duration, Utc};
use rifa_core::gateway::{ChargeStatus, GatewayError, NewCharge, PaymentGateway};
use rifa_core::types::Money;
use rifa_gateway::PixClient;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn charge_request() -> NewCharge {
    NewCharge {
        amount: Money::from_cents(2500),
        description: "Weekend raffle".to_string(),
        payer_email: "buyer@example.com".to_string(),
        expires_at: Utc::now() + Duration::minutes(30),
        idempotency_key: "purchase-test-key".to_string(),
    }
}

#[tokio::test]
async fn create_charge_posts_pix_body_and_parses_checkout_url() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .and(bearer_token("token-123"))
        .and(header("X-Idempotency-Key", "purchase-test-key"))
        .and(body_partial_json(json!({
            "transaction_amount": 25.0,
            "payment_method_id": "pix",
            "notification_url": "https://rifa.example.com/api/payments/notification",
            "payer": { "email": "buyer@example.com" }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 4_242_424_242_i64,
            "status": "pending",
            "point_of_interaction": {
                "transaction_data": {
                    "ticket_url": "https://pay.example.com/pix/4242424242"
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PixClient::new(
        server.uri(),
        "token-123".to_string(),
        "https://rifa.example.com/api/payments/notification".to_string(),
    );

    let charge = client
        .create_charge(&charge_request())
        .await
        .expect("charge created");

    assert_eq!(charge.id, "4242424242");
    assert_eq!(charge.pay_url, "https://pay.example.com/pix/4242424242");
    assert_eq!(charge.status, ChargeStatus::Pending);
}

#[tokio::test]
async fn create_charge_without_checkout_url_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": 7,
            "status": "pending"
        })))
        .mount(&server)
        .await;

    let client = PixClient::new(server.uri(), "token".to_string(), "https://x/notify".to_string());
    let err = client
        .create_charge(&charge_request())
        .await
        .expect_err("no ticket_url in response");
    assert!(matches!(err, GatewayError::MalformedResponse(_)));
}

#[tokio::test]
async fn create_charge_maps_api_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/payments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "invalid payer email"
        })))
        .mount(&server)
        .await;

    let client = PixClient::new(server.uri(), "token".to_string(), "https://x/notify".to_string());
    let err = client
        .create_charge(&charge_request())
        .await
        .expect_err("provider rejected the charge");
    match err {
        GatewayError::Api { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid payer email");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn charge_status_parses_every_known_wire_status() {
    for (wire, expected) in [
        ("pending", ChargeStatus::Pending),
        ("approved", ChargeStatus::Approved),
        ("rejected", ChargeStatus::Rejected),
        ("cancelled", ChargeStatus::Cancelled),
        ("refunded", ChargeStatus::Refunded),
        ("charged_back", ChargeStatus::ChargedBack),
        ("something_new", ChargeStatus::Unknown),
    ] {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/payments/55"))
            .and(bearer_token("token-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 55,
                "status": wire
            })))
            .mount(&server)
            .await;

        let client = PixClient::new(
            server.uri(),
            "token-123".to_string(),
            "https://x/notify".to_string(),
        );
        let status = client.charge_status("55").await.expect("status query");
        assert_eq!(status, expected, "wire status {wire}");
    }
}

#[tokio::test]
async fn charge_status_maps_unknown_charge_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/payments/404404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Payment not found"
        })))
        .mount(&server)
        .await;

    let client = PixClient::new(server.uri(), "token".to_string(), "https://x/notify".to_string());
    let err = client
        .charge_status("404404")
        .await
        .expect_err("provider does not know the charge");
    assert!(matches!(err, GatewayError::Api { status: 404, .. }));
}
