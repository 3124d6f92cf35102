//! `TicketPool` over PostgreSQL.
//!
//! Every transition is one conditional `UPDATE` bounded to exactly the
//! affected rows; the affected-row count is compared against the requested
//! set, and a mismatch rolls the transaction back and surfaces a conflict
//! (reserve) or an invariant violation (commit). No partial transitions are
//! ever visible.

use crate::rows::{numbers_to_ints, ticket_from_row};
use crate::{storage_err, PgStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rifa_core::error::{CoreError, Result};
use rifa_core::pool::TicketPool;
use rifa_core::types::{RaffleId, Ticket, TicketId, TicketNumber, UserId};

#[async_trait]
impl TicketPool for PgStore {
    async fn seed(&self, raffle_id: RaffleId, quantity: u32) -> Result<()> {
        let quantity = i32::try_from(quantity)
            .map_err(|_| CoreError::Storage("slot count out of range".to_string()))?;
        sqlx::query(
            r"
            INSERT INTO ticket_slots (raffle_id, ticket_number, status)
            SELECT $1, n, 'FREE'
            FROM generate_series(1, $2) AS n
            ",
        )
        .bind(raffle_id.as_uuid())
        .bind(quantity)
        .execute(self.pool())
        .await
        .map_err(|e| storage_err("failed to seed ticket slots", &e))?;
        Ok(())
    }

    async fn count_free(&self, raffle_id: RaffleId) -> Result<u32> {
        let (count,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM ticket_slots
            WHERE raffle_id = $1 AND status = 'FREE'
            ",
        )
        .bind(raffle_id.as_uuid())
        .fetch_one(self.pool())
        .await
        .map_err(|e| storage_err("failed to count free slots", &e))?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn free_numbers(&self, raffle_id: RaffleId) -> Result<Vec<TicketNumber>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            r"
            SELECT ticket_number
            FROM ticket_slots
            WHERE raffle_id = $1 AND status = 'FREE'
            ORDER BY ticket_number
            ",
        )
        .bind(raffle_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| storage_err("failed to read free slots", &e))?;

        rows.iter()
            .map(|(n,)| {
                u32::try_from(*n)
                    .map(TicketNumber::new)
                    .map_err(|_| CoreError::Storage(format!("stored ticket number {n} is negative")))
            })
            .collect()
    }

    async fn reserve(
        &self,
        raffle_id: RaffleId,
        numbers: &[TicketNumber],
        reserved_until: DateTime<Utc>,
    ) -> Result<()> {
        let ints = numbers_to_ints(numbers)?;
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| storage_err("failed to begin reserve", &e))?;

        let updated = sqlx::query(
            r"
            UPDATE ticket_slots
            SET status = 'RESERVED', reserved_until = $3
            WHERE raffle_id = $1 AND ticket_number = ANY($2) AND status = 'FREE'
            ",
        )
        .bind(raffle_id.as_uuid())
        .bind(&ints)
        .bind(reserved_until)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_err("failed to reserve slots", &e))?
        .rows_affected();

        if updated != numbers.len() as u64 {
            tx.rollback()
                .await
                .map_err(|e| storage_err("failed to roll back reserve", &e))?;
            metrics::counter!("rifa.pool.reserve_conflicts").increment(1);
            return Err(CoreError::Conflict(format!(
                "reserved {updated} of {} requested numbers",
                numbers.len()
            )));
        }

        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit reserve", &e))?;
        Ok(())
    }

    async fn release(&self, raffle_id: RaffleId, numbers: &[TicketNumber]) -> Result<()> {
        let ints = numbers_to_ints(numbers)?;
        let released = sqlx::query(
            r"
            UPDATE ticket_slots
            SET status = 'FREE', reserved_until = NULL
            WHERE raffle_id = $1 AND ticket_number = ANY($2) AND status = 'RESERVED'
            ",
        )
        .bind(raffle_id.as_uuid())
        .bind(&ints)
        .execute(self.pool())
        .await
        .map_err(|e| storage_err("failed to release slots", &e))?
        .rows_affected();

        tracing::debug!(
            raffle_id = %raffle_id,
            requested = numbers.len(),
            released,
            "slots released"
        );
        Ok(())
    }

    async fn commit(
        &self,
        raffle_id: RaffleId,
        numbers: &[TicketNumber],
        owner: UserId,
    ) -> Result<Vec<Ticket>> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| storage_err("failed to begin commit", &e))?;
        let tickets = commit_slots_in_tx(&mut tx, raffle_id, numbers, owner).await?;
        tx.commit()
            .await
            .map_err(|e| storage_err("failed to commit slot sale", &e))?;
        Ok(tickets)
    }

    async fn release_expired(&self, now: DateTime<Utc>, limit: u32) -> Result<u32> {
        let released = sqlx::query(
            r"
            UPDATE ticket_slots
            SET status = 'FREE', reserved_until = NULL
            WHERE (raffle_id, ticket_number) IN (
                SELECT raffle_id, ticket_number
                FROM ticket_slots
                WHERE status = 'RESERVED' AND reserved_until < $1
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            ",
        )
        .bind(now)
        .bind(i64::from(limit))
        .execute(self.pool())
        .await
        .map_err(|e| storage_err("failed to release expired holds", &e))?
        .rows_affected();

        Ok(u32::try_from(released).unwrap_or(u32::MAX))
    }
}

/// Convert Reserved slots to Sold and mint tickets, inside the caller's
/// transaction. Shared with the composite reconciliation transitions.
pub(crate) async fn commit_slots_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    raffle_id: RaffleId,
    numbers: &[TicketNumber],
    owner: UserId,
) -> Result<Vec<Ticket>> {
    let ints = numbers_to_ints(numbers)?;

    let updated = sqlx::query(
        r"
        UPDATE ticket_slots
        SET status = 'SOLD', reserved_until = NULL
        WHERE raffle_id = $1 AND ticket_number = ANY($2) AND status = 'RESERVED'
        ",
    )
    .bind(raffle_id.as_uuid())
    .bind(&ints)
    .execute(&mut **tx)
    .await
    .map_err(|e| storage_err("failed to mark slots sold", &e))?
    .rows_affected();

    if updated != numbers.len() as u64 {
        // The transaction is dropped (and rolled back) by the caller's `?`.
        metrics::counter!("rifa.pool.commit_violations").increment(1);
        tracing::error!(
            raffle_id = %raffle_id,
            requested = numbers.len(),
            updated,
            "commit requested for numbers that are not Reserved"
        );
        return Err(CoreError::InvariantViolation(format!(
            "only {updated} of {} numbers were Reserved at commit time",
            numbers.len()
        )));
    }

    let issued_at = Utc::now();
    let mut tickets = Vec::with_capacity(numbers.len());
    for number in numbers {
        let ticket = Ticket {
            id: TicketId::new(),
            raffle_id,
            owner,
            number: *number,
            issued_at,
        };
        let row = sqlx::query(
            r"
            INSERT INTO tickets (id, raffle_id, owner_id, ticket_number, issued_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, raffle_id, owner_id, ticket_number, issued_at
            ",
        )
        .bind(ticket.id.as_uuid())
        .bind(raffle_id.as_uuid())
        .bind(owner.as_uuid())
        .bind(i32::try_from(number.value()).map_err(|_| {
            CoreError::Storage(format!("ticket number {number} out of range"))
        })?)
        .bind(issued_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| storage_err("failed to mint ticket", &e))?;
        tickets.push(ticket_from_row(&row)?);
    }

    Ok(tickets)
}
