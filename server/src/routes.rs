//! Router configuration.

use crate::api::{health, payments, raffles, tickets};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - Health checks (no authentication)
/// - Raffle management and winner draw (admin)
/// - Ticket purchase and per-user history (authenticated)
/// - Payment webhook (public; the handler re-queries the provider)
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Raffles
        .route("/raffles", post(raffles::create_raffle))
        .route("/raffles", get(raffles::list_raffles))
        .route("/raffles/:id", get(raffles::get_raffle))
        .route("/raffles/:id/draw-winner", post(raffles::draw_winner))
        // Tickets
        .route("/raffles/:id/tickets", post(tickets::purchase_tickets))
        .route("/tickets/mine", get(raffles::my_tickets))
        // Payments
        .route("/payments/notification", post(payments::payment_notification))
        .route("/payments/mine", get(payments::my_payments));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
