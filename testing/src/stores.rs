//! In-memory storage doubles.
//!
//! One mutex guards all tables, so every trait call is atomic the way a
//! storage transaction is: concurrent reservers contend on the lock and the
//! loser observes the winner's writes, exactly like the conditional-update
//! semantics of the PostgreSQL implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rifa_core::error::{CoreError, Result};
use rifa_core::notify::{BlobStore, Notification, Notifier};
use rifa_core::pool::TicketPool;
use rifa_core::store::{
    PaymentStore, RaffleStore, Reconciled, ReconciliationStore, TicketStore,
};
use rifa_core::types::{
    Payment, PaymentStatus, Raffle, RaffleId, SlotStatus, Ticket, TicketId, TicketNumber,
    TicketSlot, UserId,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone, Debug)]
struct Slot {
    status: SlotStatus,
    reserved_until: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Tables {
    raffles: Vec<Raffle>,
    slots: BTreeMap<(RaffleId, TicketNumber), Slot>,
    tickets: Vec<Ticket>,
    payments: Vec<Payment>,
    fail_next_payment_insert: bool,
}

/// In-memory implementation of the whole storage surface.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `PaymentStore::insert` fail, to exercise the purchase
    /// compensation path.
    pub fn fail_next_payment_insert(&self) {
        if let Ok(mut tables) = self.tables.lock() {
            tables.fail_next_payment_insert = true;
        }
    }

    /// Snapshot of a raffle's slots, for invariant assertions.
    #[must_use]
    pub fn slots(&self, raffle_id: RaffleId) -> Vec<TicketSlot> {
        self.tables
            .lock()
            .map(|tables| {
                tables
                    .slots
                    .iter()
                    .filter(|((rid, _), _)| *rid == raffle_id)
                    .map(|((rid, number), slot)| TicketSlot {
                        raffle_id: *rid,
                        number: *number,
                        status: slot.status,
                        reserved_until: slot.reserved_until,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Count a raffle's slots per status: `(free, reserved, sold)`.
    #[must_use]
    pub fn slot_counts(&self, raffle_id: RaffleId) -> (u32, u32, u32) {
        let mut counts = (0, 0, 0);
        for slot in self.slots(raffle_id) {
            match slot.status {
                SlotStatus::Free => counts.0 += 1,
                SlotStatus::Reserved => counts.1 += 1,
                SlotStatus::Sold => counts.2 += 1,
            }
        }
        counts
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| CoreError::Storage("in-memory store poisoned".to_string()))
    }
}

impl Tables {
    fn payment_by_transaction(&mut self, transaction_id: &str) -> Option<&mut Payment> {
        self.payments
            .iter_mut()
            .find(|p| p.transaction_id == transaction_id)
    }

    /// Commit Reserved numbers to Sold and mint tickets. Caller has already
    /// validated the payment transition; slot validation happens here and
    /// nothing is written unless every number is Reserved.
    fn commit_slots(
        &mut self,
        raffle_id: RaffleId,
        numbers: &[TicketNumber],
        owner: UserId,
    ) -> Result<Vec<Ticket>> {
        for number in numbers {
            match self.slots.get(&(raffle_id, *number)) {
                Some(slot) if slot.status == SlotStatus::Reserved => {}
                Some(slot) => {
                    return Err(CoreError::InvariantViolation(format!(
                        "commit requested for slot {number} in state {}",
                        slot.status
                    )));
                }
                None => {
                    return Err(CoreError::InvariantViolation(format!(
                        "commit requested for unknown slot {number}"
                    )));
                }
            }
        }

        let issued_at = Utc::now();
        let mut minted = Vec::with_capacity(numbers.len());
        for number in numbers {
            if let Some(slot) = self.slots.get_mut(&(raffle_id, *number)) {
                slot.status = SlotStatus::Sold;
                slot.reserved_until = None;
            }
            let ticket = Ticket {
                id: TicketId::new(),
                raffle_id,
                owner,
                number: *number,
                issued_at,
            };
            self.tickets.push(ticket.clone());
            minted.push(ticket);
        }
        Ok(minted)
    }

    /// Release Reserved numbers back to Free; Sold slots are never touched.
    fn release_slots(&mut self, raffle_id: RaffleId, numbers: &[TicketNumber]) {
        for number in numbers {
            if let Some(slot) = self.slots.get_mut(&(raffle_id, *number)) {
                if slot.status == SlotStatus::Reserved {
                    slot.status = SlotStatus::Free;
                    slot.reserved_until = None;
                }
            }
        }
    }
}

#[async_trait]
impl TicketPool for InMemoryStore {
    async fn seed(&self, raffle_id: RaffleId, quantity: u32) -> Result<()> {
        let mut tables = self.lock()?;
        for number in 1..=quantity {
            tables.slots.insert(
                (raffle_id, TicketNumber::new(number)),
                Slot {
                    status: SlotStatus::Free,
                    reserved_until: None,
                },
            );
        }
        Ok(())
    }

    async fn count_free(&self, raffle_id: RaffleId) -> Result<u32> {
        let numbers = self.free_numbers(raffle_id).await?;
        Ok(u32::try_from(numbers.len()).unwrap_or(u32::MAX))
    }

    async fn free_numbers(&self, raffle_id: RaffleId) -> Result<Vec<TicketNumber>> {
        let tables = self.lock()?;
        Ok(tables
            .slots
            .iter()
            .filter(|((rid, _), slot)| *rid == raffle_id && slot.status == SlotStatus::Free)
            .map(|((_, number), _)| *number)
            .collect())
    }

    async fn reserve(
        &self,
        raffle_id: RaffleId,
        numbers: &[TicketNumber],
        reserved_until: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.lock()?;

        for number in numbers {
            match tables.slots.get(&(raffle_id, *number)) {
                Some(slot) if slot.status == SlotStatus::Free => {}
                Some(slot) => {
                    return Err(CoreError::Conflict(format!(
                        "number {number} is {}",
                        slot.status
                    )));
                }
                None => {
                    return Err(CoreError::Conflict(format!("number {number} does not exist")));
                }
            }
        }

        for number in numbers {
            if let Some(slot) = tables.slots.get_mut(&(raffle_id, *number)) {
                slot.status = SlotStatus::Reserved;
                slot.reserved_until = Some(reserved_until);
            }
        }
        Ok(())
    }

    async fn release(&self, raffle_id: RaffleId, numbers: &[TicketNumber]) -> Result<()> {
        let mut tables = self.lock()?;
        tables.release_slots(raffle_id, numbers);
        Ok(())
    }

    async fn commit(
        &self,
        raffle_id: RaffleId,
        numbers: &[TicketNumber],
        owner: UserId,
    ) -> Result<Vec<Ticket>> {
        let mut tables = self.lock()?;
        tables.commit_slots(raffle_id, numbers, owner)
    }

    async fn release_expired(&self, now: DateTime<Utc>, limit: u32) -> Result<u32> {
        let mut tables = self.lock()?;
        let mut released = 0;
        for slot in tables.slots.values_mut() {
            if released >= limit {
                break;
            }
            if slot.status == SlotStatus::Reserved
                && slot.reserved_until.is_some_and(|until| until < now)
            {
                slot.status = SlotStatus::Free;
                slot.reserved_until = None;
                released += 1;
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl RaffleStore for InMemoryStore {
    async fn insert(&self, raffle: &Raffle) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.raffles.iter().any(|r| r.id == raffle.id) {
            return Err(CoreError::Conflict(format!(
                "raffle {} already exists",
                raffle.id
            )));
        }
        tables.raffles.push(raffle.clone());
        Ok(())
    }

    async fn get(&self, raffle_id: RaffleId) -> Result<Option<Raffle>> {
        let tables = self.lock()?;
        Ok(tables.raffles.iter().find(|r| r.id == raffle_id).cloned())
    }

    async fn list(&self) -> Result<Vec<Raffle>> {
        let tables = self.lock()?;
        let mut raffles = tables.raffles.clone();
        raffles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(raffles)
    }

    async fn set_winner_if_unset(&self, raffle_id: RaffleId, ticket_id: TicketId) -> Result<bool> {
        let mut tables = self.lock()?;
        let Some(raffle) = tables.raffles.iter_mut().find(|r| r.id == raffle_id) else {
            return Ok(false);
        };
        if raffle.winning_ticket.is_some() {
            return Ok(false);
        }
        raffle.winning_ticket = Some(ticket_id);
        Ok(true)
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn insert(&self, payment: &Payment) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.fail_next_payment_insert {
            tables.fail_next_payment_insert = false;
            return Err(CoreError::Storage("injected payment insert failure".to_string()));
        }
        if tables
            .payments
            .iter()
            .any(|p| p.transaction_id == payment.transaction_id)
        {
            return Err(CoreError::Conflict(format!(
                "transaction {} already recorded",
                payment.transaction_id
            )));
        }
        tables.payments.push(payment.clone());
        Ok(())
    }

    async fn by_transaction(&self, transaction_id: &str) -> Result<Option<Payment>> {
        let mut tables = self.lock()?;
        Ok(tables.payment_by_transaction(transaction_id).map(|p| p.clone()))
    }

    async fn for_user(&self, user: UserId) -> Result<Vec<Payment>> {
        let tables = self.lock()?;
        let mut payments: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|p| p.user_id == user)
            .cloned()
            .collect();
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(payments)
    }

    async fn stale_pending(&self, cutoff: DateTime<Utc>, limit: u32) -> Result<Vec<Payment>> {
        let tables = self.lock()?;
        let mut stale: Vec<Payment> = tables
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Pending && p.created_at < cutoff)
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        stale.truncate(limit as usize);
        Ok(stale)
    }
}

#[async_trait]
impl TicketStore for InMemoryStore {
    async fn for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Ticket>> {
        let tables = self.lock()?;
        Ok(tables
            .tickets
            .iter()
            .filter(|t| t.raffle_id == raffle_id)
            .cloned()
            .collect())
    }

    async fn for_user(&self, user: UserId) -> Result<Vec<Ticket>> {
        let tables = self.lock()?;
        let mut tickets: Vec<Ticket> = tables
            .tickets
            .iter()
            .filter(|t| t.owner == user)
            .cloned()
            .collect();
        tickets.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        Ok(tickets)
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryStore {
    async fn approve(&self, transaction_id: &str) -> Result<Reconciled> {
        let mut tables = self.lock()?;

        let Some(payment) = tables.payment_by_transaction(transaction_id) else {
            return Err(CoreError::not_found("Payment", transaction_id));
        };
        if payment.status.is_terminal() {
            return Ok(Reconciled::AlreadyTerminal(payment.status));
        }

        let raffle_id = payment.raffle_id;
        let owner = payment.user_id;
        let numbers = payment.ticket_numbers.clone();

        // Slot validation before any write, so a failed commit leaves the
        // payment Pending (the whole transition "rolls back").
        let tickets = tables.commit_slots(raffle_id, &numbers, owner)?;

        let updated = tables
            .payment_by_transaction(transaction_id)
            .map(|payment| {
                payment.status = PaymentStatus::Approved;
                payment.clone()
            })
            .ok_or_else(|| CoreError::not_found("Payment", transaction_id))?;

        Ok(Reconciled::Approved {
            payment: updated,
            tickets,
        })
    }

    async fn cancel(&self, transaction_id: &str) -> Result<Reconciled> {
        let mut tables = self.lock()?;

        let Some(payment) = tables.payment_by_transaction(transaction_id) else {
            return Err(CoreError::not_found("Payment", transaction_id));
        };
        if payment.status.is_terminal() {
            return Ok(Reconciled::AlreadyTerminal(payment.status));
        }

        let raffle_id = payment.raffle_id;
        let numbers = payment.ticket_numbers.clone();
        tables.release_slots(raffle_id, &numbers);

        let updated = tables
            .payment_by_transaction(transaction_id)
            .map(|payment| {
                payment.status = PaymentStatus::Cancelled;
                payment.clone()
            })
            .ok_or_else(|| CoreError::not_found("Payment", transaction_id))?;

        Ok(Reconciled::Cancelled { payment: updated })
    }
}

/// Notifier that records every notification instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingNotifier {
    /// Create a notifier with an empty outbox.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `notify` call fail.
    pub fn fail_all(&self) {
        if let Ok(mut fail) = self.fail.lock() {
            *fail = true;
        }
    }

    /// Everything notified so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        if self.fail.lock().map(|fail| *fail).unwrap_or(false) {
            return Err(CoreError::Upstream("notifier scripted to fail".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(notification.clone());
        }
        Ok(())
    }
}

/// Blob store that fabricates public URLs and records uploads.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    uploads: Arc<Mutex<Vec<(UserId, usize, String)>>>,
}

impl MemoryBlobStore {
    /// Create an empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(owner, byte length, content type)` of every upload so far.
    #[must_use]
    pub fn uploads(&self) -> Vec<(UserId, usize, String)> {
        self.uploads
            .lock()
            .map(|uploads| uploads.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, owner: UserId, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let url = format!("https://blobs.test/{owner}/{}", bytes.len());
        if let Ok(mut uploads) = self.uploads.lock() {
            uploads.push((owner, bytes.len(), content_type.to_string()));
        }
        Ok(url)
    }
}
