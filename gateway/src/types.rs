//! Wire types for the PIX payment provider API.
//!
//! Shapes follow the provider's `/v1/payments` contract: charges are created
//! with the `pix` payment method and carry a `notification_url` the provider
//! calls back on status changes; the checkout link comes back nested under
//! `point_of_interaction.transaction_data.ticket_url`.

use serde::{Deserialize, Serialize};

/// Request body for creating a PIX charge.
#[derive(Clone, Debug, Serialize)]
pub struct CreatePaymentBody {
    /// Total amount in currency units (the provider takes decimals)
    pub transaction_amount: f64,
    /// Human-readable description shown to the payer
    pub description: String,
    /// Always `"pix"` for this client
    pub payment_method_id: String,
    /// Webhook target for asynchronous status updates
    pub notification_url: String,
    /// Payer identification
    pub payer: Payer,
    /// RFC 3339 expiry; unpaid charges lapse at this instant
    pub date_of_expiration: String,
}

/// Payer identification block.
#[derive(Clone, Debug, Serialize)]
pub struct Payer {
    /// Payer's e-mail address
    pub email: String,
}

/// Response body for a created or queried payment.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentResponse {
    /// Provider-assigned numeric charge id
    pub id: i64,
    /// Wire status string (`pending`, `approved`, ...)
    pub status: String,
    /// Checkout details; present on creation
    pub point_of_interaction: Option<PointOfInteraction>,
}

/// Container for PIX checkout data.
#[derive(Clone, Debug, Deserialize)]
pub struct PointOfInteraction {
    /// PIX transaction data
    pub transaction_data: Option<TransactionData>,
}

/// PIX transaction data.
#[derive(Clone, Debug, Deserialize)]
pub struct TransactionData {
    /// URL the payer completes the payment at
    pub ticket_url: Option<String>,
}

/// Error body the provider returns on non-success statuses.
#[derive(Clone, Debug, Deserialize)]
pub struct ApiErrorBody {
    /// Provider error message
    pub message: Option<String>,
}
