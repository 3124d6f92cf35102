//! Raffle winner selector.
//!
//! Draws one winner uniformly at random over a raffle's committed tickets
//! and records it exactly once; a second draw is a hard error, never a
//! silent overwrite.

use crate::error::{CoreError, Result};
use crate::store::{RaffleStore, TicketStore};
use crate::types::{RaffleId, Ticket};
use rand::Rng;
use std::sync::Arc;

/// Draws and records raffle winners.
#[derive(Clone)]
pub struct WinnerSelector {
    raffles: Arc<dyn RaffleStore>,
    tickets: Arc<dyn TicketStore>,
}

impl WinnerSelector {
    /// Wire a winner selector from its stores.
    #[must_use]
    pub fn new(raffles: Arc<dyn RaffleStore>, tickets: Arc<dyn TicketStore>) -> Self {
        Self { raffles, tickets }
    }

    /// Draw the winner for `raffle_id`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] when the raffle does not exist.
    /// - [`CoreError::NoTicketsSold`] when no committed tickets exist.
    /// - [`CoreError::AlreadyDrawn`] when a winner is already recorded
    ///   (including when a concurrent draw won the conditional update).
    /// - [`CoreError::Storage`] on storage failure.
    pub async fn draw(&self, raffle_id: RaffleId) -> Result<Ticket> {
        let raffle = self
            .raffles
            .get(raffle_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Raffle", raffle_id))?;

        if raffle.winning_ticket.is_some() {
            return Err(CoreError::AlreadyDrawn(raffle_id));
        }

        let tickets = self.tickets.for_raffle(raffle_id).await?;
        if tickets.is_empty() {
            return Err(CoreError::NoTicketsSold(raffle_id));
        }

        let index = rand::thread_rng().gen_range(0..tickets.len());
        let winner = tickets
            .get(index)
            .cloned()
            .ok_or_else(|| CoreError::InvariantViolation("winner index out of range".into()))?;

        // Conditional write: a concurrent draw may have recorded a winner
        // between the read above and this update.
        let recorded = self
            .raffles
            .set_winner_if_unset(raffle_id, winner.id)
            .await?;
        if !recorded {
            return Err(CoreError::AlreadyDrawn(raffle_id));
        }

        tracing::info!(
            raffle_id = %raffle_id,
            ticket_id = %winner.id,
            number = %winner.number,
            owner = %winner.owner,
            "winner drawn"
        );

        Ok(winner)
    }
}
