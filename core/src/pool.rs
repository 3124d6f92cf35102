//! Ticket pool contract.
//!
//! The pool exclusively owns `TicketSlot` state transitions. Every transition
//! executes as one atomic storage unit bounded to exactly the affected rows
//! (conditional updates in PostgreSQL, one mutex-guarded map in the
//! in-memory test implementation), so two concurrent purchasers can never
//! both reserve the same number.

use crate::error::Result;
use crate::types::{RaffleId, Ticket, TicketNumber, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// State transitions and queries over a raffle's sellable numbers.
///
/// Only the purchase orchestrator, the reconciliation handler and the hold
/// sweeper call these methods, and each call is one atomic unit of work.
#[async_trait]
pub trait TicketPool: Send + Sync {
    /// Seed slots 1..=`quantity` for a freshly created raffle, all Free.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn seed(&self, raffle_id: RaffleId, quantity: u32) -> Result<()>;

    /// Number of currently Free slots for the raffle.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn count_free(&self, raffle_id: RaffleId) -> Result<u32>;

    /// The current Free number set for the raffle, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn free_numbers(&self, raffle_id: RaffleId) -> Result<Vec<TicketNumber>>;

    /// Atomically move every number in `numbers` from Free to Reserved with
    /// the given hold deadline.
    ///
    /// All-or-nothing: if any number is no longer Free the whole reservation
    /// fails and no slot is touched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Conflict`] when any number's state changed
    /// since it was selected, [`crate::CoreError::Storage`] on storage
    /// failure.
    async fn reserve(
        &self,
        raffle_id: RaffleId,
        numbers: &[TicketNumber],
        reserved_until: DateTime<Utc>,
    ) -> Result<()>;

    /// Move Reserved numbers back to Free (compensation / expiry).
    ///
    /// Numbers that are not currently Reserved are left untouched; in
    /// particular a Sold slot is never reverted.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn release(&self, raffle_id: RaffleId, numbers: &[TicketNumber]) -> Result<()>;

    /// Permanently convert Reserved numbers to Sold, minting one [`Ticket`]
    /// per number for `owner`.
    ///
    /// Requires prior Reserved state for every number: moving straight
    /// Free→Sold is disallowed to prevent double-sell races.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::InvariantViolation`] if any number is not
    /// currently Reserved (nothing is committed in that case),
    /// [`crate::CoreError::Storage`] on storage failure.
    async fn commit(
        &self,
        raffle_id: RaffleId,
        numbers: &[TicketNumber],
        owner: UserId,
    ) -> Result<Vec<Ticket>>;

    /// Revert Reserved slots whose hold deadline has elapsed back to Free.
    ///
    /// Processes at most `limit` slots per call and returns how many were
    /// released. Called periodically by the hold sweeper.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn release_expired(&self, now: DateTime<Utc>, limit: u32) -> Result<u32>;
}
