//! Reconciliation handler for asynchronous payment-status updates.
//!
//! The webhook payload carries only a charge id; the handler re-queries the
//! gateway for the authoritative status and applies the per-payment state
//! machine:
//!
//! ```text
//! Pending --approved--------------------------------> Approved (terminal)
//! Pending --rejected/cancelled/refunded/charged_back-> Cancelled (terminal)
//! terminal --(any)--> no-op
//! ```
//!
//! Duplicate deliveries are harmless: the composite store transition is
//! conditional on the payment still being Pending, so replays surface as
//! [`Reconciled::AlreadyTerminal`] and change nothing.

use crate::error::{CoreError, Result};
use crate::gateway::{ChargeStatus, PaymentGateway};
use crate::notify::{Notification, Notifier};
use crate::store::{RaffleStore, Reconciled, ReconciliationStore};
use std::sync::Arc;

/// Applies gateway status updates to payments and the ticket pool.
#[derive(Clone)]
pub struct ReconciliationService {
    gateway: Arc<dyn PaymentGateway>,
    store: Arc<dyn ReconciliationStore>,
    raffles: Arc<dyn RaffleStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReconciliationService {
    /// Wire a reconciliation service from its collaborators.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn PaymentGateway>,
        store: Arc<dyn ReconciliationStore>,
        raffles: Arc<dyn RaffleStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gateway,
            store,
            raffles,
            notifier,
        }
    }

    /// Handle a status notification for `charge_id`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Upstream`] when the gateway status query fails.
    /// - [`CoreError::NotFound`] when no payment references the charge id;
    ///   callers log this and do not retry.
    /// - [`CoreError::InvariantViolation`] / [`CoreError::Storage`] from the
    ///   composite store transition.
    pub async fn on_status_update(&self, charge_id: &str) -> Result<Reconciled> {
        let status = self
            .gateway
            .charge_status(charge_id)
            .await
            .map_err(|e| CoreError::Upstream(e.to_string()))?;

        tracing::info!(
            transaction_id = %charge_id,
            status = %status,
            "payment status update"
        );

        let outcome = match status {
            ChargeStatus::Approved => self.store.approve(charge_id).await?,
            ChargeStatus::Rejected
            | ChargeStatus::Cancelled
            | ChargeStatus::Refunded
            | ChargeStatus::ChargedBack => self.store.cancel(charge_id).await?,
            ChargeStatus::Pending => Reconciled::Ignored,
            ChargeStatus::Unknown => {
                tracing::warn!(
                    transaction_id = %charge_id,
                    "gateway reported a status this system does not know; ignoring"
                );
                Reconciled::Ignored
            }
        };

        match &outcome {
            Reconciled::Approved { payment, tickets } => {
                tracing::info!(
                    transaction_id = %charge_id,
                    payment_id = %payment.id,
                    tickets = tickets.len(),
                    "payment approved, tickets committed"
                );
                self.confirm_to_buyer(&outcome).await;
            }
            Reconciled::Cancelled { payment } => {
                tracing::info!(
                    transaction_id = %charge_id,
                    payment_id = %payment.id,
                    released = payment.ticket_numbers.len(),
                    "payment cancelled, reservation released"
                );
            }
            Reconciled::AlreadyTerminal(terminal) => {
                tracing::debug!(
                    transaction_id = %charge_id,
                    status = %terminal,
                    "duplicate notification for settled payment ignored"
                );
            }
            Reconciled::Ignored => {}
        }

        Ok(outcome)
    }

    /// Best-effort buyer confirmation. Never fails the reconciliation.
    async fn confirm_to_buyer(&self, outcome: &Reconciled) {
        let Reconciled::Approved { payment, tickets } = outcome else {
            return;
        };

        let raffle_name = match self.raffles.get(payment.raffle_id).await {
            Ok(Some(raffle)) => raffle.name,
            Ok(None) | Err(_) => payment.raffle_id.to_string(),
        };

        let notification = Notification::PaymentApproved {
            to: payment.payer_email.clone(),
            raffle_name,
            numbers: tickets.iter().map(|t| t.number).collect(),
        };

        if let Err(notify_err) = self.notifier.notify(&notification).await {
            tracing::warn!(
                payment_id = %payment.id,
                error = %notify_err,
                "buyer confirmation failed; payment remains approved"
            );
        }
    }
}
