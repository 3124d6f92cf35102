//! Storage-trait seams for raffles, payments and tickets.
//!
//! The core never talks to a database directly; it goes through these traits
//! so the PostgreSQL implementations (`rifa-postgres`) and the in-memory
//! test doubles (`rifa-testing`) are interchangeable.

use crate::error::Result;
use crate::types::{Payment, PaymentStatus, Raffle, RaffleId, Ticket, TicketId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistent storage for raffles.
#[async_trait]
pub trait RaffleStore: Send + Sync {
    /// Persist a new raffle and return the stored entity.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn insert(&self, raffle: &Raffle) -> Result<()>;

    /// Fetch a raffle by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn get(&self, raffle_id: RaffleId) -> Result<Option<Raffle>>;

    /// All raffles, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn list(&self) -> Result<Vec<Raffle>>;

    /// Record the winning ticket, but only if no winner is recorded yet.
    ///
    /// Returns `false` when the raffle already had a winner (the caller maps
    /// this to `AlreadyDrawn`); the existing winner is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn set_winner_if_unset(&self, raffle_id: RaffleId, ticket_id: TicketId) -> Result<bool>;
}

/// Persistent storage for payment records.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persist a freshly created (Pending) payment.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Conflict`] if the transaction id already
    /// exists, [`crate::CoreError::Storage`] on storage failure.
    async fn insert(&self, payment: &Payment) -> Result<()>;

    /// Look a payment up by its external charge id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn by_transaction(&self, transaction_id: &str) -> Result<Option<Payment>>;

    /// All payments made by `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn for_user(&self, user: UserId) -> Result<Vec<Payment>>;

    /// Pending payments created before `cutoff`, oldest first, at most
    /// `limit`. Used by the hold sweeper for expiry-driven fallback
    /// reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn stale_pending(&self, cutoff: DateTime<Utc>, limit: u32) -> Result<Vec<Payment>>;
}

/// Read access to committed tickets.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Every committed ticket of a raffle, in issue order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Ticket>>;

    /// Every committed ticket owned by `user`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Storage`] on storage failure.
    async fn for_user(&self, user: UserId) -> Result<Vec<Ticket>>;
}

/// Outcome of applying an asynchronous payment-status update.
#[derive(Clone, Debug, PartialEq)]
pub enum Reconciled {
    /// Payment flipped Pending→Approved; its numbers are now Sold and the
    /// returned tickets were minted for the buyer.
    Approved {
        /// The payment after the transition
        payment: Payment,
        /// Tickets minted by the commit
        tickets: Vec<Ticket>,
    },
    /// Payment flipped Pending→Cancelled; its numbers were released.
    Cancelled {
        /// The payment after the transition
        payment: Payment,
    },
    /// Payment was already in a terminal state; nothing was changed.
    AlreadyTerminal(PaymentStatus),
    /// The reported charge status requires no transition (e.g. still
    /// pending, or a status this system does not know).
    Ignored,
}

/// Composite, atomic payment-plus-pool transitions.
///
/// Approval must flip the payment status *and* commit its numbers in one
/// storage transaction (likewise cancellation and release) so a crash
/// mid-sequence cannot leave `Payment` and slot state inconsistent with
/// each other.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Atomically flip the payment Pending→Approved, convert its numbers
    /// Reserved→Sold and mint the buyer's tickets.
    ///
    /// Idempotent: a payment already in a terminal state yields
    /// [`Reconciled::AlreadyTerminal`] and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NotFound`] for an unknown transaction id,
    /// [`crate::CoreError::InvariantViolation`] if any of the payment's
    /// numbers is not Reserved (the whole transition rolls back), and
    /// [`crate::CoreError::Storage`] on storage failure.
    async fn approve(&self, transaction_id: &str) -> Result<Reconciled>;

    /// Atomically flip the payment Pending→Cancelled and release its
    /// numbers Reserved→Free.
    ///
    /// Idempotent in the same way as [`ReconciliationStore::approve`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::NotFound`] for an unknown transaction id
    /// and [`crate::CoreError::Storage`] on storage failure.
    async fn cancel(&self, transaction_id: &str) -> Result<Reconciled>;
}
