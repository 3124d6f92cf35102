//! Raffle, payment and ticket stores over PostgreSQL.

use crate::rows::{
    cents_to_db, numbers_to_ints, payment_from_row, raffle_from_row, ticket_from_row,
};
use crate::{storage_err, PgStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rifa_core::error::{CoreError, Result};
use rifa_core::store::{PaymentStore, RaffleStore, TicketStore};
use rifa_core::types::{Payment, Raffle, RaffleId, Ticket, TicketId, UserId};

#[async_trait]
impl RaffleStore for PgStore {
    async fn insert(&self, raffle: &Raffle) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO raffles
                (id, name, description, ticket_price_cents, starts_at, ends_at,
                 quantity_numbers, image_url, organizer, winning_ticket, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(raffle.id.as_uuid())
        .bind(&raffle.name)
        .bind(&raffle.description)
        .bind(cents_to_db(raffle.ticket_price)?)
        .bind(raffle.starts_at)
        .bind(raffle.ends_at)
        .bind(
            i32::try_from(raffle.quantity_numbers)
                .map_err(|_| CoreError::Storage("quantity out of range".to_string()))?,
        )
        .bind(&raffle.image_url)
        .bind(raffle.organizer.as_uuid())
        .bind(raffle.winning_ticket.as_ref().map(TicketId::as_uuid))
        .bind(raffle.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| storage_err("failed to insert raffle", &e))?;
        Ok(())
    }

    async fn get(&self, raffle_id: RaffleId) -> Result<Option<Raffle>> {
        let row = sqlx::query(
            r"
            SELECT id, name, description, ticket_price_cents, starts_at, ends_at,
                   quantity_numbers, image_url, organizer, winning_ticket, created_at
            FROM raffles
            WHERE id = $1
            ",
        )
        .bind(raffle_id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| storage_err("failed to get raffle", &e))?;

        row.as_ref().map(raffle_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Raffle>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, description, ticket_price_cents, starts_at, ends_at,
                   quantity_numbers, image_url, organizer, winning_ticket, created_at
            FROM raffles
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_err("failed to list raffles", &e))?;

        rows.iter().map(raffle_from_row).collect()
    }

    async fn set_winner_if_unset(&self, raffle_id: RaffleId, ticket_id: TicketId) -> Result<bool> {
        let updated = sqlx::query(
            r"
            UPDATE raffles
            SET winning_ticket = $2
            WHERE id = $1 AND winning_ticket IS NULL
            ",
        )
        .bind(raffle_id.as_uuid())
        .bind(ticket_id.as_uuid())
        .execute(self.pool())
        .await
        .map_err(|e| storage_err("failed to record winner", &e))?
        .rows_affected();

        Ok(updated == 1)
    }
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO payments
                (id, transaction_id, user_id, raffle_id, amount_cents, payer_email,
                 status, ticket_numbers, pay_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(payment.id.as_uuid())
        .bind(&payment.transaction_id)
        .bind(payment.user_id.as_uuid())
        .bind(payment.raffle_id.as_uuid())
        .bind(cents_to_db(payment.amount)?)
        .bind(&payment.payer_email)
        .bind(payment.status.as_str())
        .bind(numbers_to_ints(&payment.ticket_numbers)?)
        .bind(&payment.pay_url)
        .bind(payment.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return CoreError::Conflict(format!(
                        "transaction {} already recorded",
                        payment.transaction_id
                    ));
                }
            }
            storage_err("failed to insert payment", &e)
        })?;
        Ok(())
    }

    async fn by_transaction(&self, transaction_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query(
            r"
            SELECT id, transaction_id, user_id, raffle_id, amount_cents, payer_email,
                   status, ticket_numbers, pay_url, created_at
            FROM payments
            WHERE transaction_id = $1
            ",
        )
        .bind(transaction_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| storage_err("failed to get payment", &e))?;

        row.as_ref().map(payment_from_row).transpose()
    }

    async fn for_user(&self, user: UserId) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r"
            SELECT id, transaction_id, user_id, raffle_id, amount_cents, payer_email,
                   status, ticket_numbers, pay_url, created_at
            FROM payments
            WHERE user_id = $1
            ORDER BY created_at DESC
            ",
        )
        .bind(user.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_err("failed to list payments", &e))?;

        rows.iter().map(payment_from_row).collect()
    }

    async fn stale_pending(&self, cutoff: DateTime<Utc>, limit: u32) -> Result<Vec<Payment>> {
        let rows = sqlx::query(
            r"
            SELECT id, transaction_id, user_id, raffle_id, amount_cents, payer_email,
                   status, ticket_numbers, pay_url, created_at
            FROM payments
            WHERE status = 'PENDING' AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            ",
        )
        .bind(cutoff)
        .bind(i64::from(limit))
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_err("failed to list stale payments", &e))?;

        rows.iter().map(payment_from_row).collect()
    }
}

#[async_trait]
impl TicketStore for PgStore {
    async fn for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r"
            SELECT id, raffle_id, owner_id, ticket_number, issued_at
            FROM tickets
            WHERE raffle_id = $1
            ORDER BY issued_at ASC, ticket_number ASC
            ",
        )
        .bind(raffle_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_err("failed to list raffle tickets", &e))?;

        rows.iter().map(ticket_from_row).collect()
    }

    async fn for_user(&self, user: UserId) -> Result<Vec<Ticket>> {
        let rows = sqlx::query(
            r"
            SELECT id, raffle_id, owner_id, ticket_number, issued_at
            FROM tickets
            WHERE owner_id = $1
            ORDER BY issued_at DESC
            ",
        )
        .bind(user.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_err("failed to list user tickets", &e))?;

        rows.iter().map(ticket_from_row).collect()
    }
}
