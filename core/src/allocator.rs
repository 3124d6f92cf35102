//! Reservation allocator.
//!
//! Picks `quantity` numbers from a raffle's Free set with an unbiased
//! Fisher-Yates shuffle and reserves them atomically. Concurrent allocators
//! racing for the same numbers resolve as a reserve conflict, in which case
//! the allocator re-reads the Free set and retries up to a configured bound.

use crate::error::{CoreError, Result};
use crate::pool::TicketPool;
use crate::settings::PurchaseRules;
use crate::types::{RaffleId, TicketNumber};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Allocates and reserves pseudo-random numbers from the ticket pool.
#[derive(Clone)]
pub struct Allocator {
    pool: Arc<dyn TicketPool>,
    rules: PurchaseRules,
}

impl Allocator {
    /// Create an allocator over `pool` with the given purchase rules.
    #[must_use]
    pub fn new(pool: Arc<dyn TicketPool>, rules: PurchaseRules) -> Self {
        Self { pool, rules }
    }

    /// Reserve `quantity` distinct free numbers until `reserved_until`.
    ///
    /// Returns the reserved numbers. The selection is uniform over the Free
    /// set read at attempt time; a competing writer changing any selected
    /// slot causes a fresh re-read and retry.
    ///
    /// # Errors
    ///
    /// - [`CoreError::InvalidQuantity`] when `quantity` is not an allowed
    ///   increment.
    /// - [`CoreError::InsufficientInventory`] when fewer than `quantity`
    ///   numbers are free, or every retry ended in a conflict.
    /// - [`CoreError::Storage`] on storage failure.
    pub async fn allocate(
        &self,
        raffle_id: RaffleId,
        quantity: u32,
        reserved_until: DateTime<Utc>,
    ) -> Result<Vec<TicketNumber>> {
        if !self.rules.allows_quantity(quantity) {
            return Err(CoreError::InvalidQuantity {
                quantity,
                allowed: self.rules.allowed_increments.clone(),
            });
        }

        let mut available = 0;
        for attempt in 1..=self.rules.max_reserve_attempts {
            let mut free = self.pool.free_numbers(raffle_id).await?;
            available = u32::try_from(free.len()).unwrap_or(u32::MAX);
            if available < quantity {
                return Err(CoreError::InsufficientInventory {
                    requested: quantity,
                    available,
                });
            }

            free.shuffle(&mut rand::thread_rng());
            free.truncate(quantity as usize);

            match self.pool.reserve(raffle_id, &free, reserved_until).await {
                Ok(()) => {
                    tracing::debug!(
                        raffle_id = %raffle_id,
                        quantity,
                        attempt,
                        "numbers reserved"
                    );
                    return Ok(free);
                }
                Err(CoreError::Conflict(reason)) => {
                    tracing::debug!(
                        raffle_id = %raffle_id,
                        attempt,
                        reason = %reason,
                        "reserve conflict, re-reading free set"
                    );
                }
                Err(other) => return Err(other),
            }
        }

        Err(CoreError::InsufficientInventory {
            requested: quantity,
            available,
        })
    }
}
