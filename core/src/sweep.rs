//! Hold-expiry sweep.
//!
//! Bounds "apparent limbo" in time: Reserved slots whose hold deadline has
//! elapsed revert to Free, and Pending payments older than the hold window
//! that never received a terminal notification are cancelled (which also
//! releases their slots). The server drives this from a periodic task.

use crate::clock::Clock;
use crate::error::Result;
use crate::pool::TicketPool;
use crate::settings::PurchaseRules;
use crate::store::{PaymentStore, Reconciled, ReconciliationStore};
use std::sync::Arc;

/// What one sweep pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending payments flipped to Cancelled
    pub payments_cancelled: u32,
    /// Expired Reserved slots reverted to Free (orphans from crashed
    /// purchase attempts; slots of cancelled payments are counted under
    /// `payments_cancelled`)
    pub slots_released: u32,
}

/// Periodically reclaims expired reservation holds.
#[derive(Clone)]
pub struct HoldSweeper {
    pool: Arc<dyn TicketPool>,
    payments: Arc<dyn PaymentStore>,
    reconciliation: Arc<dyn ReconciliationStore>,
    clock: Arc<dyn Clock>,
    rules: PurchaseRules,
}

impl HoldSweeper {
    /// Wire a sweeper from its collaborators.
    #[must_use]
    pub fn new(
        pool: Arc<dyn TicketPool>,
        payments: Arc<dyn PaymentStore>,
        reconciliation: Arc<dyn ReconciliationStore>,
        clock: Arc<dyn Clock>,
        rules: PurchaseRules,
    ) -> Self {
        Self {
            pool,
            payments,
            reconciliation,
            clock,
            rules,
        }
    }

    /// Run one sweep pass.
    ///
    /// Stale payments are cancelled first so their slots are released under
    /// the payment's own atomic transition; the residual expired-hold pass
    /// then only reclaims orphans whose payment never materialized.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] when a storage query fails;
    /// per-payment cancel failures are logged and skipped so one bad row
    /// cannot wedge the sweep.
    pub async fn run_once(&self) -> Result<SweepReport> {
        let now = self.clock.now();
        let cutoff = now - self.rules.hold_window;
        let mut report = SweepReport::default();

        let stale = self
            .payments
            .stale_pending(cutoff, self.rules.sweep_batch)
            .await?;
        for payment in stale {
            match self.reconciliation.cancel(&payment.transaction_id).await {
                Ok(Reconciled::Cancelled { .. }) => {
                    report.payments_cancelled += 1;
                    tracing::info!(
                        payment_id = %payment.id,
                        transaction_id = %payment.transaction_id,
                        "stale pending payment cancelled by sweep"
                    );
                }
                Ok(_) => {}
                Err(cancel_err) => {
                    tracing::error!(
                        payment_id = %payment.id,
                        error = %cancel_err,
                        "sweep failed to cancel stale payment"
                    );
                }
            }
        }

        report.slots_released = self
            .pool
            .release_expired(now, self.rules.sweep_batch)
            .await?;

        if report.payments_cancelled > 0 || report.slots_released > 0 {
            tracing::info!(
                payments_cancelled = report.payments_cancelled,
                slots_released = report.slots_released,
                "hold sweep pass complete"
            );
        }

        Ok(report)
    }
}
