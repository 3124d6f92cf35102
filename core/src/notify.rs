//! Outbound notification contract (fire-and-forget).
//!
//! Notification failures never fail the primary operation; callers log and
//! move on. Implementations live in the server crate (console and SMTP).

use crate::error::Result;
use crate::types::{TicketNumber, UserId};
use async_trait::async_trait;

/// A message to deliver to a user, by template.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    /// Payment approved - confirm the buyer's numbers.
    PaymentApproved {
        /// Recipient e-mail address
        to: String,
        /// Name of the raffle the numbers belong to
        raffle_name: String,
        /// The buyer's committed numbers
        numbers: Vec<TicketNumber>,
    },
}

/// Fire-and-forget notification sender.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `notification`.
    ///
    /// # Errors
    ///
    /// Returns an error when delivery fails; callers treat this as a
    /// best-effort side effect and never propagate it.
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Blob storage for raffle images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` on behalf of `owner` and return a public URL.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Upstream`] when the store rejects the
    /// upload or cannot be reached.
    async fn upload(&self, owner: UserId, bytes: Vec<u8>, content_type: &str) -> Result<String>;
}
