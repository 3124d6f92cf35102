//! PIX payment provider client implementation.

use crate::types::{ApiErrorBody, CreatePaymentBody, Payer, PaymentResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rifa_core::gateway::{
    Charge, ChargeStatus, GatewayError, GatewayResult, NewCharge, PaymentGateway,
};

/// PIX payment provider client.
///
/// Wraps the provider's `/v1/payments` API: charge creation (with an
/// idempotency key per purchase attempt) and status re-queries driven by
/// webhook notifications.
#[derive(Clone)]
pub struct PixClient {
    client: Client,
    base_url: String,
    access_token: String,
    notification_url: String,
}

impl PixClient {
    /// Create a client against the given provider base URL.
    ///
    /// `notification_url` is the publicly reachable webhook endpoint the
    /// provider pushes status updates to; it is attached to every charge.
    #[must_use]
    pub fn new(base_url: String, access_token: String, notification_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            notification_url,
        }
    }

    /// Create a client with access token from the `PIX_ACCESS_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::RequestFailed`] if the variable is not set.
    pub fn from_env(base_url: String, notification_url: String) -> GatewayResult<Self> {
        let access_token = std::env::var("PIX_ACCESS_TOKEN")
            .map_err(|_| GatewayError::RequestFailed("PIX_ACCESS_TOKEN is not set".to_string()))?;
        Ok(Self::new(base_url, access_token, notification_url))
    }

    async fn error_from_response(response: reqwest::Response) -> GatewayError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorBody>().await {
            Ok(body) => body.message.unwrap_or_default(),
            Err(_) => String::new(),
        };
        GatewayError::Api { status, message }
    }

    fn map_transport_error(err: &reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout
        } else {
            GatewayError::RequestFailed(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentGateway for PixClient {
    async fn create_charge(&self, request: &NewCharge) -> GatewayResult<Charge> {
        #[allow(clippy::cast_precision_loss)] // amounts are far below 2^52 cents
        let transaction_amount = request.amount.cents() as f64 / 100.0;
        let body = CreatePaymentBody {
            transaction_amount,
            description: request.description.clone(),
            payment_method_id: "pix".to_string(),
            notification_url: self.notification_url.clone(),
            payer: Payer {
                email: request.payer_email.clone(),
            },
            date_of_expiration: request.expires_at.to_rfc3339(),
        };

        let response = self
            .client
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.access_token)
            .header("X-Idempotency-Key", &request.idempotency_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        if response.status() != StatusCode::OK && response.status() != StatusCode::CREATED {
            return Err(Self::error_from_response(response).await);
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        let pay_url = payment
            .point_of_interaction
            .and_then(|poi| poi.transaction_data)
            .and_then(|data| data.ticket_url)
            .ok_or_else(|| {
                GatewayError::MalformedResponse("charge response carries no ticket_url".to_string())
            })?;

        let charge = Charge {
            id: payment.id.to_string(),
            pay_url,
            status: ChargeStatus::from_wire(&payment.status),
        };

        tracing::debug!(
            charge_id = %charge.id,
            status = %charge.status,
            idempotency_key = %request.idempotency_key,
            "charge created"
        );

        Ok(charge)
    }

    async fn charge_status(&self, charge_id: &str) -> GatewayResult<ChargeStatus> {
        let response = self
            .client
            .get(format!("{}/v1/payments/{charge_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| Self::map_transport_error(&e))?;

        if response.status() != StatusCode::OK {
            return Err(Self::error_from_response(response).await);
        }

        let payment: PaymentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(e.to_string()))?;

        Ok(ChargeStatus::from_wire(&payment.status))
    }
}
