//! Ticket purchase endpoint.
//!
//! `POST /api/raffles/:id/tickets` drives the purchase orchestrator: the
//! response is immediate with a Pending payment and the reserved numbers;
//! approval arrives asynchronously through the payment webhook.

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rifa_core::types::{Payment, RaffleId, TicketNumber};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to purchase tickets.
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    /// How many numbers to buy (must be an allowed increment)
    pub quantity: u32,
    /// E-mail the PIX charge is issued against
    pub email: String,
}

/// Payment representation returned by the API.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    /// Payment id
    pub id: Uuid,
    /// External charge id
    pub transaction_id: String,
    /// Raffle the numbers belong to
    pub raffle_id: Uuid,
    /// Total amount in cents
    pub amount_cents: u64,
    /// Payment status (`PENDING`, `APPROVED`, ...)
    pub status: String,
    /// The numbers held under this charge
    pub ticket_numbers: Vec<u32>,
    /// PIX checkout URL
    pub pay_url: String,
    /// When the charge was requested
    pub created_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: *payment.id.as_uuid(),
            transaction_id: payment.transaction_id,
            raffle_id: *payment.raffle_id.as_uuid(),
            amount_cents: payment.amount.cents(),
            status: payment.status.as_str().to_string(),
            ticket_numbers: payment
                .ticket_numbers
                .iter()
                .map(TicketNumber::value)
                .collect(),
            pay_url: payment.pay_url,
            created_at: payment.created_at,
        }
    }
}

/// Response after a purchase attempt.
#[derive(Debug, Serialize)]
pub struct PurchaseResponse {
    /// The Pending payment (complete it at `payment.pay_url`)
    pub payment: PaymentResponse,
    /// The reserved numbers, in allocation order
    pub numbers: Vec<u32>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Purchase tickets for a raffle.
///
/// # Errors
///
/// - 422 for invalid quantity / closed raffle / malformed e-mail.
/// - 404 for an unknown raffle.
/// - 409 for insufficient inventory (terminal) or conflicts (retryable).
/// - 502 when the payment provider fails (the reservation was released).
pub async fn purchase_tickets(
    user: CurrentUser,
    Path(raffle_id): Path<Uuid>,
    State(state): State<AppState>,
    Json(request): Json<PurchaseRequest>,
) -> Result<(StatusCode, Json<PurchaseResponse>), AppError> {
    if !request.email.contains('@') {
        return Err(AppError::validation("email is not a valid address"));
    }

    let receipt = state
        .purchase
        .purchase(
            RaffleId::from_uuid(raffle_id),
            user.user_id,
            &request.email,
            request.quantity,
        )
        .await?;

    metrics::counter!("rifa.purchases.pending").increment(1);

    let numbers = receipt.numbers.iter().map(TicketNumber::value).collect();
    Ok((
        StatusCode::CREATED,
        Json(PurchaseResponse {
            payment: receipt.payment.into(),
            numbers,
        }),
    ))
}
