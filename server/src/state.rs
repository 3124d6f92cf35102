//! Application state shared across HTTP handlers.

use crate::auth::TokenVerifier;
use rifa_core::notify::BlobStore;
use rifa_core::pool::TicketPool;
use rifa_core::store::{PaymentStore, RaffleStore, TicketStore};
use rifa_core::{Clock, PurchaseService, ReconciliationService, WinnerSelector};
use std::sync::Arc;

/// Shared resources for the HTTP layer.
///
/// Everything sits behind trait objects so the HTTP tests can wire the
/// in-memory doubles from `rifa-testing` in place of PostgreSQL and the
/// real PIX provider. Cloning is cheap (all members are `Arc`s).
#[derive(Clone)]
pub struct AppState {
    /// Purchase orchestrator
    pub purchase: Arc<PurchaseService>,
    /// Reconciliation handler
    pub reconcile: Arc<ReconciliationService>,
    /// Winner selector
    pub winner: Arc<WinnerSelector>,
    /// Raffle storage
    pub raffles: Arc<dyn RaffleStore>,
    /// Payment storage
    pub payments: Arc<dyn PaymentStore>,
    /// Committed-ticket storage
    pub tickets: Arc<dyn TicketStore>,
    /// Ticket pool (slot seeding and availability queries)
    pub pool: Arc<dyn TicketPool>,
    /// Raffle image storage
    pub blobs: Arc<dyn BlobStore>,
    /// Bearer-token verifier
    pub verifier: TokenVerifier,
    /// Clock used for raffle timestamps
    pub clock: Arc<dyn Clock>,
}
