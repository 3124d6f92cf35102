//! Payment gateway contract.
//!
//! The core depends on the external PIX provider only through this narrow
//! trait: create a charge, re-query a charge's status. The HTTP client that
//! implements it lives in the `rifa-gateway` crate; tests use the scripted
//! mock from `rifa-testing`.

use crate::types::Money;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Payment gateway result
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Payment gateway error.
///
/// These are transport/provider failures. A *declined* payment is not an
/// error here - it arrives later as a terminal [`ChargeStatus`].
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Request never completed (connection, TLS, DNS).
    #[error("gateway request failed: {0}")]
    RequestFailed(String),

    /// The provider answered with a non-success status.
    #[error("gateway API error (status {status}): {message}")]
    Api {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider error body, if any
        message: String,
    },

    /// The provider's response body did not match the expected shape.
    #[error("gateway response could not be parsed: {0}")]
    MalformedResponse(String),

    /// The request timed out.
    #[error("gateway timeout")]
    Timeout,
}

/// Asynchronous charge status as reported by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeStatus {
    /// Charge created, awaiting payer action
    Pending,
    /// Payer completed the payment
    Approved,
    /// Provider rejected the payment
    Rejected,
    /// Charge was cancelled (by expiry or payer)
    Cancelled,
    /// Payment was refunded after approval
    Refunded,
    /// Payment was charged back after approval
    ChargedBack,
    /// A status string this client does not know; handled as a no-op
    Unknown,
}

impl ChargeStatus {
    /// Map the provider's wire string to a status.
    ///
    /// Unknown strings map to [`ChargeStatus::Unknown`] rather than an error
    /// so that new provider statuses degrade to a logged no-op.
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        match value {
            "pending" | "in_process" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            "charged_back" => Self::ChargedBack,
            _ => Self::Unknown,
        }
    }

    /// Whether this status ends the payment's lifecycle at the provider.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::Rejected | Self::Cancelled | Self::Refunded | Self::ChargedBack
        )
    }
}

impl fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
            Self::ChargedBack => "charged_back",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Everything the gateway needs to create a charge.
#[derive(Clone, Debug)]
pub struct NewCharge {
    /// Total amount to charge
    pub amount: Money,
    /// Human-readable description shown to the payer
    pub description: String,
    /// Payer's e-mail address
    pub payer_email: String,
    /// When the charge expires if unpaid (the reservation hold deadline)
    pub expires_at: DateTime<Utc>,
    /// Unique key per purchase attempt; the provider deduplicates on it
    pub idempotency_key: String,
}

/// A charge as created at the provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Charge {
    /// Provider-assigned charge id (the payment's `transaction_id`)
    pub id: String,
    /// Checkout URL the payer completes the PIX payment at
    pub pay_url: String,
    /// Status at creation time (normally `Pending`)
    pub status: ChargeStatus,
}

/// Abstraction over the external PIX payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a charge for `request.amount`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the provider cannot be reached or
    /// answers with an error; the caller must compensate any reservation it
    /// holds before surfacing the failure.
    async fn create_charge(&self, request: &NewCharge) -> GatewayResult<Charge>;

    /// Re-query the current status of a charge.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError`] if the provider cannot be reached or the
    /// charge id is unknown to it.
    async fn charge_status(&self, charge_id: &str) -> GatewayResult<ChargeStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_statuses_map_to_known_variants() {
        assert_eq!(ChargeStatus::from_wire("approved"), ChargeStatus::Approved);
        assert_eq!(
            ChargeStatus::from_wire("charged_back"),
            ChargeStatus::ChargedBack
        );
        assert_eq!(ChargeStatus::from_wire("in_process"), ChargeStatus::Pending);
        assert_eq!(ChargeStatus::from_wire("whatever"), ChargeStatus::Unknown);
    }

    #[test]
    fn terminality() {
        assert!(!ChargeStatus::Pending.is_terminal());
        assert!(!ChargeStatus::Unknown.is_terminal());
        assert!(ChargeStatus::Approved.is_terminal());
        assert!(ChargeStatus::Refunded.is_terminal());
    }
}
