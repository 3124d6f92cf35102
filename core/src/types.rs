//! Domain types for the raffle backend.
//!
//! Value objects, entities, and state enums shared by every crate in the
//! workspace. Monetary amounts are cents-based to avoid floating-point
//! arithmetic errors; identifiers are UUID newtypes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a raffle
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RaffleId(Uuid);

impl RaffleId {
    /// Creates a new random `RaffleId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RaffleId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RaffleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RaffleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user (issued by the external identity provider)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a committed ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a payment record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new random `PaymentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `PaymentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sellable ticket number within a raffle's range (1-based)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketNumber(u32);

impl TicketNumber {
    /// Creates a new `TicketNumber`
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the raw number
    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TicketNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Money Value Object (cents-based to avoid floating point errors)
// ============================================================================

/// Represents money in cents to avoid floating-point arithmetic errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Creates a `Money` value from cents
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents
    #[must_use]
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns the amount in whole currency units (rounded down)
    #[must_use]
    pub const fn units(&self) -> u64 {
        self.0 / 100
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two money amounts with overflow checking
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }

    /// Multiplies money by a quantity with overflow checking
    #[must_use]
    pub const fn checked_multiply(self, quantity: u32) -> Option<Self> {
        match self.0.checked_mul(quantity as u64) {
            Some(result) => Some(Self(result)),
            None => None,
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.units(), self.0 % 100)
    }
}

// ============================================================================
// Raffle
// ============================================================================

/// Raffle entity. Core fields are immutable after creation; `winning_ticket`
/// is set exactly once when a winner is drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Raffle {
    /// Unique raffle identifier
    pub id: RaffleId,
    /// Raffle name
    pub name: String,
    /// Description shown to buyers (also used as the charge description)
    pub description: String,
    /// Price of a single ticket
    pub ticket_price: Money,
    /// When ticket sales open
    pub starts_at: DateTime<Utc>,
    /// When ticket sales close; past this instant the raffle is logically ended
    pub ends_at: DateTime<Utc>,
    /// Size of the ticket number range (numbers run 1..=`quantity_numbers`)
    pub quantity_numbers: u32,
    /// Public URL of the raffle image, if one was uploaded
    pub image_url: Option<String>,
    /// User who created the raffle
    pub organizer: UserId,
    /// Winning ticket, set exactly once by the winner selector
    pub winning_ticket: Option<TicketId>,
    /// When the raffle was created
    pub created_at: DateTime<Utc>,
}

impl Raffle {
    /// Whether the raffle is still open for purchases at `now`
    #[must_use]
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        now <= self.ends_at
    }
}

// ============================================================================
// Ticket Slots (the pool)
// ============================================================================

/// State of one sellable number within a raffle's pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    /// Available for reservation
    Free,
    /// Temporarily held pending a payment outcome
    Reserved,
    /// Permanently sold; exactly one committed [`Ticket`] references it
    Sold,
}

impl SlotStatus {
    /// Stable string encoding used by storage layers
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Reserved => "RESERVED",
            Self::Sold => "SOLD",
        }
    }

    /// Parse the storage encoding produced by [`SlotStatus::as_str`]
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FREE" => Some(Self::Free),
            "RESERVED" => Some(Self::Reserved),
            "SOLD" => Some(Self::Sold),
            _ => None,
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the ticket pool: a sellable number and its current state.
///
/// Invariant: for a given (raffle, number) pair at most one non-Free state
/// exists at a time, and `reserved_until` is `Some` iff the slot is Reserved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketSlot {
    /// Raffle this slot belongs to
    pub raffle_id: RaffleId,
    /// The sellable number
    pub number: TicketNumber,
    /// Current slot state
    pub status: SlotStatus,
    /// Reservation expiry; present exactly while the slot is Reserved
    pub reserved_until: Option<DateTime<Utc>>,
}

// ============================================================================
// Tickets
// ============================================================================

/// A committed, owned ticket. Created only by the reconciliation handler on
/// payment approval; immutable afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique ticket identifier
    pub id: TicketId,
    /// Raffle the ticket belongs to
    pub raffle_id: RaffleId,
    /// Ticket owner
    pub owner: UserId,
    /// The purchased number
    pub number: TicketNumber,
    /// When the ticket was minted
    pub issued_at: DateTime<Utc>,
}

// ============================================================================
// Payments
// ============================================================================

/// Payment record status.
///
/// Every non-Pending status is terminal. The reconciliation handler only ever
/// writes `Approved` or `Cancelled`; `Rejected` and `Refunded` are retained
/// for rows recorded by earlier writers and count as terminal for
/// idempotency purposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// Charge requested, outcome not yet known
    Pending,
    /// Charge approved; the payment's numbers are sold
    Approved,
    /// Charge failed (rejected, cancelled, refunded or charged back); the
    /// payment's numbers were released
    Cancelled,
    /// Legacy terminal state, treated like `Cancelled`
    Rejected,
    /// Legacy terminal state, treated like `Cancelled`
    Refunded,
}

impl PaymentStatus {
    /// Whether this status permits no further transitions
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Stable string encoding used by storage layers
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Cancelled => "CANCELLED",
            Self::Rejected => "REJECTED",
            Self::Refunded => "REFUNDED",
        }
    }

    /// Parse the storage encoding produced by [`PaymentStatus::as_str`]
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "CANCELLED" => Some(Self::Cancelled),
            "REJECTED" => Some(Self::Rejected),
            "REFUNDED" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment record linking an external charge to a set of reserved numbers.
///
/// Created Pending when a charge is requested; transitions to a terminal
/// state exactly once, driven only by the reconciliation handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique payment identifier
    pub id: PaymentId,
    /// External charge id (unique across payments)
    pub transaction_id: String,
    /// Buyer
    pub user_id: UserId,
    /// Raffle the numbers belong to
    pub raffle_id: RaffleId,
    /// Total charged amount
    pub amount: Money,
    /// E-mail the payer gave the gateway
    pub payer_email: String,
    /// Current payment status
    pub status: PaymentStatus,
    /// The numbers reserved (then sold or released) under this charge
    pub ticket_numbers: Vec<TicketNumber>,
    /// External checkout URL the buyer completes the PIX payment at
    pub pay_url: String,
    /// When the charge was requested
    pub created_at: DateTime<Utc>,
}
