//! Payment orchestrator.
//!
//! Drives one purchase attempt end to end: validate the raffle window and
//! quantity, reserve numbers, request the external charge, persist the
//! Pending payment, and return immediately (approval arrives asynchronously
//! through the reconciliation handler).
//!
//! The compensation contract is the most safety-critical piece here: once
//! numbers are reserved, any downstream failure releases them before the
//! error surfaces, as an explicit branch - a failed purchase attempt must
//! never leave numbers stuck as Reserved.

use crate::allocator::Allocator;
use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::gateway::{NewCharge, PaymentGateway};
use crate::pool::TicketPool;
use crate::settings::PurchaseRules;
use crate::store::{PaymentStore, RaffleStore};
use crate::types::{Payment, PaymentId, PaymentStatus, RaffleId, TicketNumber, UserId};
use std::sync::Arc;
use uuid::Uuid;

/// What a successful purchase attempt returns: the Pending payment and the
/// numbers held for it.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseReceipt {
    /// The persisted Pending payment (carries the PIX checkout URL)
    pub payment: Payment,
    /// The reserved numbers, in allocation order
    pub numbers: Vec<TicketNumber>,
}

/// Orchestrates reservation, external charge and payment persistence.
#[derive(Clone)]
pub struct PurchaseService {
    raffles: Arc<dyn RaffleStore>,
    payments: Arc<dyn PaymentStore>,
    pool: Arc<dyn TicketPool>,
    allocator: Allocator,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
    rules: PurchaseRules,
}

impl PurchaseService {
    /// Wire a purchase service from its collaborators.
    #[must_use]
    pub fn new(
        raffles: Arc<dyn RaffleStore>,
        payments: Arc<dyn PaymentStore>,
        pool: Arc<dyn TicketPool>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
        rules: PurchaseRules,
    ) -> Self {
        let allocator = Allocator::new(pool.clone(), rules.clone());
        Self {
            raffles,
            payments,
            pool,
            allocator,
            gateway,
            clock,
            rules,
        }
    }

    /// Execute one purchase attempt.
    ///
    /// On success the returned payment is Pending; the buyer completes the
    /// PIX payment at `payment.pay_url` and the reconciliation handler
    /// settles the outcome later.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] when the raffle does not exist.
    /// - [`CoreError::RaffleClosed`] when `now` is past the raffle's end.
    /// - [`CoreError::InvalidQuantity`] / [`CoreError::InsufficientInventory`]
    ///   per the allocator contract.
    /// - [`CoreError::Upstream`] when the gateway call fails - the
    ///   reservation is released first.
    /// - [`CoreError::Storage`] when persisting the payment fails - the
    ///   reservation is released first.
    pub async fn purchase(
        &self,
        raffle_id: RaffleId,
        user_id: UserId,
        payer_email: &str,
        quantity: u32,
    ) -> Result<PurchaseReceipt> {
        let raffle = self
            .raffles
            .get(raffle_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Raffle", raffle_id))?;

        let now = self.clock.now();
        if !raffle.is_open(now) {
            return Err(CoreError::RaffleClosed(raffle_id));
        }

        let reserved_until = now + self.rules.hold_window;
        let numbers = self
            .allocator
            .allocate(raffle_id, quantity, reserved_until)
            .await?;

        let amount = raffle
            .ticket_price
            .checked_multiply(quantity)
            .ok_or_else(|| CoreError::Validation("purchase amount overflows".to_string()))?;

        let charge_request = NewCharge {
            amount,
            description: raffle.description.clone(),
            payer_email: payer_email.to_string(),
            expires_at: reserved_until,
            idempotency_key: format!("purchase-{}", Uuid::new_v4()),
        };

        let charge = match self.gateway.create_charge(&charge_request).await {
            Ok(charge) => charge,
            Err(gateway_err) => {
                self.compensate(raffle_id, &numbers).await;
                return Err(CoreError::Upstream(gateway_err.to_string()));
            }
        };

        let payment = Payment {
            id: PaymentId::new(),
            transaction_id: charge.id,
            user_id,
            raffle_id,
            amount,
            payer_email: payer_email.to_string(),
            status: PaymentStatus::Pending,
            ticket_numbers: numbers.clone(),
            pay_url: charge.pay_url,
            created_at: now,
        };

        if let Err(persist_err) = self.payments.insert(&payment).await {
            self.compensate(raffle_id, &numbers).await;
            return Err(persist_err);
        }

        tracing::info!(
            raffle_id = %raffle_id,
            payment_id = %payment.id,
            transaction_id = %payment.transaction_id,
            quantity,
            amount = %amount,
            reserved_until = %reserved_until,
            "purchase pending payment"
        );

        Ok(PurchaseReceipt { payment, numbers })
    }

    /// Release a reservation after a downstream failure.
    ///
    /// The release failure (if any) is logged loudly but never replaces the
    /// original error the caller is about to surface.
    async fn compensate(&self, raffle_id: RaffleId, numbers: &[TicketNumber]) {
        if let Err(release_err) = self.pool.release(raffle_id, numbers).await {
            tracing::error!(
                raffle_id = %raffle_id,
                numbers = ?numbers,
                error = %release_err,
                "failed to release reservation during compensation; slots will be \
                 reclaimed by the hold sweeper"
            );
        } else {
            tracing::warn!(
                raffle_id = %raffle_id,
                count = numbers.len(),
                "reservation released after failed purchase attempt"
            );
        }
    }
}
