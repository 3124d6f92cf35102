//! Health and readiness endpoints.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use rifa_core::store::PaymentStore;
use serde::Serialize;

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process is serving
    pub status: &'static str,
}

/// Liveness probe. Answers as long as the process serves requests.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness probe. Performs one cheap indexed storage round-trip so a
/// broken database connection flips readiness before traffic arrives.
///
/// # Errors
///
/// Returns a 500 when storage is unreachable.
pub async fn readiness_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    state.payments.by_transaction("readiness-probe").await?;
    Ok(Json(HealthResponse { status: "ok" }))
}
