//! Composite reconciliation transitions over PostgreSQL.
//!
//! Approval and cancellation each run in one transaction: the payment-status
//! flip is a conditional `UPDATE ... WHERE status = 'PENDING'`, so a
//! duplicate delivery matches zero rows and becomes an idempotent no-op,
//! and the slot transition shares the transaction so a crash can never
//! leave payment and pool state disagreeing.

use crate::pool::commit_slots_in_tx;
use crate::rows::{numbers_to_ints, payment_from_row};
use crate::{storage_err, PgStore};
use async_trait::async_trait;
use rifa_core::error::{CoreError, Result};
use rifa_core::store::{PaymentStore, Reconciled, ReconciliationStore};
use rifa_core::types::{Payment, PaymentStatus};

const PAYMENT_COLUMNS: &str = "id, transaction_id, user_id, raffle_id, amount_cents, \
                               payer_email, status, ticket_numbers, pay_url, created_at";

impl PgStore {
    /// Conditionally flip a Pending payment to `target` inside `tx`.
    ///
    /// Returns the updated payment, or `None` when the payment was no longer
    /// Pending (zero rows matched).
    async fn flip_pending_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        transaction_id: &str,
        target: PaymentStatus,
    ) -> Result<Option<Payment>> {
        let row = sqlx::query(&format!(
            r"
            UPDATE payments
            SET status = $2
            WHERE transaction_id = $1 AND status = 'PENDING'
            RETURNING {PAYMENT_COLUMNS}
            "
        ))
        .bind(transaction_id)
        .bind(target.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| storage_err("failed to update payment status", &e))?;

        row.as_ref().map(payment_from_row).transpose()
    }

    /// Resolve the idempotent no-op case: the payment exists but is already
    /// terminal, or does not exist at all.
    async fn settled_or_missing(&self, transaction_id: &str) -> Result<Reconciled> {
        match self.by_transaction(transaction_id).await? {
            Some(payment) if payment.status.is_terminal() => {
                Ok(Reconciled::AlreadyTerminal(payment.status))
            }
            Some(payment) => Err(CoreError::InvariantViolation(format!(
                "payment {} is {} but its conditional update matched no row",
                payment.id, payment.status
            ))),
            None => Err(CoreError::not_found("Payment", transaction_id)),
        }
    }
}

#[async_trait]
impl ReconciliationStore for PgStore {
    async fn approve(&self, transaction_id: &str) -> Result<Reconciled> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| storage_err("failed to begin approval", &e))?;

        let Some(payment) =
            Self::flip_pending_in_tx(&mut tx, transaction_id, PaymentStatus::Approved).await?
        else {
            tx.rollback()
                .await
                .map_err(|e| storage_err("failed to roll back approval", &e))?;
            return self.settled_or_missing(transaction_id).await;
        };

        // Same transaction: payment flip and slot commit settle together.
        let tickets = commit_slots_in_tx(
            &mut tx,
            payment.raffle_id,
            &payment.ticket_numbers,
            payment.user_id,
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit approval", &e))?;

        metrics::counter!("rifa.payments.approved").increment(1);
        Ok(Reconciled::Approved { payment, tickets })
    }

    async fn cancel(&self, transaction_id: &str) -> Result<Reconciled> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| storage_err("failed to begin cancellation", &e))?;

        let Some(payment) =
            Self::flip_pending_in_tx(&mut tx, transaction_id, PaymentStatus::Cancelled).await?
        else {
            tx.rollback()
                .await
                .map_err(|e| storage_err("failed to roll back cancellation", &e))?;
            return self.settled_or_missing(transaction_id).await;
        };

        let ints = numbers_to_ints(&payment.ticket_numbers)?;
        sqlx::query(
            r"
            UPDATE ticket_slots
            SET status = 'FREE', reserved_until = NULL
            WHERE raffle_id = $1 AND ticket_number = ANY($2) AND status = 'RESERVED'
            ",
        )
        .bind(payment.raffle_id.as_uuid())
        .bind(&ints)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_err("failed to release cancelled numbers", &e))?;

        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit cancellation", &e))?;

        metrics::counter!("rifa.payments.cancelled").increment(1);
        Ok(Reconciled::Cancelled { payment })
    }
}
