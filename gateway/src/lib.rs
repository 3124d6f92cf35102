//! PIX payment-provider integration for the Rifa raffle backend.
//!
//! Implements [`rifa_core::gateway::PaymentGateway`] over the provider's
//! REST API. The core never sees HTTP: charges go out through
//! [`PixClient::new`]-constructed clients injected at process start (no
//! module-level provider singletons), and webhook deliveries are resolved by
//! re-querying [`PaymentGateway::charge_status`].

pub mod client;
pub mod types;

pub use client::PixClient;
pub use rifa_core::gateway::PaymentGateway;
