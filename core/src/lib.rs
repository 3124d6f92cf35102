//! Rifa domain core - ticket reservation and payment reconciliation.
//!
//! This crate holds the logic that makes the raffle backend hard: allocating
//! scarce, uniquely-numbered tickets to a buyer, holding them during a
//! pending PIX payment, and either committing them (approved payment) or
//! releasing them back to the pool (expiry, rejection, error) - while
//! guaranteeing no number is ever sold twice and none is lost in limbo.
//!
//! # Architecture
//!
//! ```text
//! purchase request            gateway webhook              admin action
//!       │                          │                            │
//!       ▼                          ▼                            ▼
//! ┌──────────────┐  ┌───────────────────────┐  ┌──────────────────┐
//! │   Purchase   │  │    Reconciliation     │  │      Winner      │
//! │   Service    │  │       Service         │  │     Selector     │
//! └──────┬───────┘  └──────────┬────────────┘  └────────┬─────────┘
//!        │   Allocator         │ composite               │
//!        ▼                     ▼ approve/cancel          ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │     TicketPool / stores (atomic conditional transitions)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All I/O sits behind traits ([`pool::TicketPool`], the stores in [`store`],
//! [`gateway::PaymentGateway`], [`notify::Notifier`]); the PostgreSQL and
//! HTTP implementations live in sibling crates, and `rifa-testing` provides
//! in-memory doubles for every seam.

pub mod allocator;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod pool;
pub mod purchase;
pub mod reconcile;
pub mod settings;
pub mod store;
pub mod sweep;
pub mod types;
pub mod winner;

pub use allocator::Allocator;
pub use clock::{Clock, SystemClock};
pub use error::{CoreError, Result};
pub use purchase::{PurchaseReceipt, PurchaseService};
pub use reconcile::ReconciliationService;
pub use settings::PurchaseRules;
pub use store::Reconciled;
pub use sweep::{HoldSweeper, SweepReport};
pub use winner::WinnerSelector;
