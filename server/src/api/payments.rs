//! Payment endpoints: the provider webhook and the caller's history.
//!
//! The webhook body carries only a charge id (`{"data": {"id": ...}}` from
//! the provider, or `{"externalId": ...}` from manual re-drives); the
//! reconciliation handler re-queries the provider for the authoritative
//! status, so a forged webhook can at worst trigger an extra status query.

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use rifa_core::store::PaymentStore;
use rifa_core::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tickets::PaymentResponse;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Webhook notification payload.
#[derive(Debug, Deserialize)]
pub struct NotificationRequest {
    /// Provider-style payload: `{"data": {"id": <charge id>}}`
    pub data: Option<NotificationData>,
    /// Manual re-drive payload: `{"externalId": "<charge id>"}`
    #[serde(rename = "externalId")]
    pub external_id: Option<String>,
}

/// Nested provider payload.
#[derive(Debug, Deserialize)]
pub struct NotificationData {
    /// Charge id; the provider sends numbers, re-drives send strings
    pub id: Option<Value>,
}

impl NotificationRequest {
    /// The charge id carried by the notification, if any.
    #[must_use]
    pub fn charge_id(&self) -> Option<String> {
        if let Some(external_id) = &self.external_id {
            return Some(external_id.clone());
        }
        match self.data.as_ref()?.id.as_ref()? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct NotificationAck {
    /// Whether the update was applied to a known payment
    pub accepted: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Receive a payment-status notification.
///
/// Unknown charge ids are acknowledged with `accepted: false` and logged -
/// answering with an error would only make the provider redeliver a
/// notification that can never succeed.
///
/// # Errors
///
/// - 400 when the body carries no charge id.
/// - 502 when the provider status re-query fails (the provider will
///   redeliver).
pub async fn payment_notification(
    State(state): State<AppState>,
    Json(request): Json<NotificationRequest>,
) -> Result<Json<NotificationAck>, AppError> {
    let Some(charge_id) = request.charge_id() else {
        return Err(AppError::bad_request("notification carries no charge id"));
    };

    match state.reconcile.on_status_update(&charge_id).await {
        Ok(_) => Ok(Json(NotificationAck { accepted: true })),
        Err(CoreError::NotFound { .. }) => {
            tracing::warn!(
                transaction_id = %charge_id,
                "notification for unknown payment ignored"
            );
            Ok(Json(NotificationAck { accepted: false }))
        }
        Err(other) => Err(other.into()),
    }
}

/// The caller's payments, newest first.
///
/// # Errors
///
/// Storage errors map to 500.
pub async fn my_payments(
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let payments = state.payments.for_user(user.user_id).await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}
