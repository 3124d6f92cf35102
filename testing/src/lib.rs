//! In-memory test doubles for every Rifa seam.
//!
//! [`InMemoryStore`] implements the full storage surface (`TicketPool`, the
//! stores, `ReconciliationStore`) over one mutex-guarded map, which makes
//! each trait call atomic exactly the way a storage transaction is.
//! [`MockGateway`] is a scripted payment provider, [`FixedClock`] a
//! settable clock, [`RecordingNotifier`]/[`MemoryBlobStore`] capture side
//! effects for assertions.
//!
//! These doubles live in a dedicated crate so unit tests, integration tests
//! and the server's HTTP tests all share identical semantics.

pub mod clock;
pub mod gateway;
pub mod stores;

pub use clock::FixedClock;
pub use gateway::MockGateway;
pub use stores::{InMemoryStore, MemoryBlobStore, RecordingNotifier};
