//! Reconciliation handler tests.
//!
//! Covers the approval and rejection paths (Scenarios C and D), idempotent
//! replay of duplicate notifications, the pending/unknown-status no-ops,
//! and the unknown-transaction error.
//!
//! Run with: `cargo test --test reconcile_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use chrono::Duration;
use rifa_core::clock::Clock;
use rifa_core::error::CoreError;
use rifa_core::gateway::ChargeStatus;
use rifa_core::notify::Notification;
use rifa_core::pool::TicketPool;
use rifa_core::store::{RaffleStore, Reconciled, TicketStore};
use rifa_core::types::{Money, PaymentStatus, Raffle, RaffleId, UserId};
use rifa_core::{PurchaseReceipt, PurchaseRules, PurchaseService, ReconciliationService};
use rifa_testing::{FixedClock, InMemoryStore, MockGateway, RecordingNotifier};
use std::sync::Arc;

struct Harness {
    store: InMemoryStore,
    gateway: MockGateway,
    clock: FixedClock,
    notifier: RecordingNotifier,
    purchase: PurchaseService,
    reconcile: ReconciliationService,
}

impl Harness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        let gateway = MockGateway::new();
        let clock = FixedClock::from_system_now();
        let notifier = RecordingNotifier::new();

        let purchase = PurchaseService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(gateway.clone()),
            Arc::new(clock.clone()),
            PurchaseRules::default(),
        );
        let reconcile = ReconciliationService::new(
            Arc::new(gateway.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifier.clone()),
        );

        Self {
            store,
            gateway,
            clock,
            notifier,
            purchase,
            reconcile,
        }
    }

    async fn seeded_raffle(&self, numbers: u32) -> Raffle {
        let now = self.clock.now();
        let raffle = Raffle {
            id: RaffleId::new(),
            name: "Weekend raffle".to_string(),
            description: "A weekend raffle".to_string(),
            ticket_price: Money::from_cents(500),
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::days(7),
            quantity_numbers: numbers,
            image_url: None,
            organizer: UserId::new(),
            winning_ticket: None,
            created_at: now,
        };
        RaffleStore::insert(&self.store, &raffle)
            .await
            .expect("insert raffle");
        self.store.seed(raffle.id, numbers).await.expect("seed slots");
        raffle
    }

    async fn pending_purchase(&self, raffle: &Raffle, buyer: UserId) -> PurchaseReceipt {
        self.purchase
            .purchase(raffle.id, buyer, "buyer@example.com", 5)
            .await
            .expect("purchase succeeds")
    }
}

/// Scenario C: an approval notification converts the payment's 5 Reserved
/// numbers to Sold and mints 5 tickets owned by the payer.
#[tokio::test]
async fn approval_commits_tickets() {
    let h = Harness::new();
    let raffle = h.seeded_raffle(10).await;
    let buyer = UserId::new();
    let receipt = h.pending_purchase(&raffle, buyer).await;
    let txn = receipt.payment.transaction_id.clone();

    h.gateway.set_status(&txn, ChargeStatus::Approved);
    let outcome = h.reconcile.on_status_update(&txn).await.expect("reconcile");

    let Reconciled::Approved { payment, tickets } = outcome else {
        panic!("expected approval outcome");
    };
    assert_eq!(payment.status, PaymentStatus::Approved);
    assert_eq!(tickets.len(), 5);
    for ticket in &tickets {
        assert_eq!(ticket.owner, buyer);
        assert!(receipt.numbers.contains(&ticket.number));
    }

    let (free, reserved, sold) = h.store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (5, 0, 5));
    assert_eq!(h.store.for_raffle(raffle.id).await.expect("tickets").len(), 5);
}

/// Scenario D: a rejection notification releases the Reserved numbers and
/// mints no tickets.
#[tokio::test]
async fn rejection_releases_reservation() {
    let h = Harness::new();
    let raffle = h.seeded_raffle(10).await;
    let receipt = h.pending_purchase(&raffle, UserId::new()).await;
    let txn = receipt.payment.transaction_id.clone();

    h.gateway.set_status(&txn, ChargeStatus::Rejected);
    let outcome = h.reconcile.on_status_update(&txn).await.expect("reconcile");

    let Reconciled::Cancelled { payment } = outcome else {
        panic!("expected cancellation outcome");
    };
    assert_eq!(payment.status, PaymentStatus::Cancelled);

    let (free, reserved, sold) = h.store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (10, 0, 0));
    assert!(h.store.for_raffle(raffle.id).await.expect("tickets").is_empty());
}

#[tokio::test]
async fn every_failure_status_cancels() {
    for status in [
        ChargeStatus::Cancelled,
        ChargeStatus::Refunded,
        ChargeStatus::ChargedBack,
    ] {
        let h = Harness::new();
        let raffle = h.seeded_raffle(10).await;
        let receipt = h.pending_purchase(&raffle, UserId::new()).await;
        let txn = receipt.payment.transaction_id.clone();

        h.gateway.set_status(&txn, status);
        let outcome = h.reconcile.on_status_update(&txn).await.expect("reconcile");
        assert!(
            matches!(outcome, Reconciled::Cancelled { .. }),
            "{status} must cancel the payment"
        );
    }
}

/// Idempotency: replaying the same approval produces exactly one set of
/// tickets and one Approved payment.
#[tokio::test]
async fn duplicate_approval_is_a_no_op() {
    let h = Harness::new();
    let raffle = h.seeded_raffle(10).await;
    let receipt = h.pending_purchase(&raffle, UserId::new()).await;
    let txn = receipt.payment.transaction_id.clone();

    h.gateway.set_status(&txn, ChargeStatus::Approved);
    h.reconcile.on_status_update(&txn).await.expect("first delivery");
    let replay = h.reconcile.on_status_update(&txn).await.expect("second delivery");

    assert_eq!(replay, Reconciled::AlreadyTerminal(PaymentStatus::Approved));
    assert_eq!(h.store.for_raffle(raffle.id).await.expect("tickets").len(), 5);
    let (_, _, sold) = h.store.slot_counts(raffle.id);
    assert_eq!(sold, 5, "tickets must not be double-committed");
}

#[tokio::test]
async fn cancellation_after_approval_is_ignored() {
    let h = Harness::new();
    let raffle = h.seeded_raffle(10).await;
    let receipt = h.pending_purchase(&raffle, UserId::new()).await;
    let txn = receipt.payment.transaction_id.clone();

    h.gateway.set_status(&txn, ChargeStatus::Approved);
    h.reconcile.on_status_update(&txn).await.expect("approval");

    // A late charge-back notification must not release sold numbers.
    h.gateway.set_status(&txn, ChargeStatus::ChargedBack);
    let outcome = h.reconcile.on_status_update(&txn).await.expect("late charge-back");
    assert_eq!(outcome, Reconciled::AlreadyTerminal(PaymentStatus::Approved));

    let (free, reserved, sold) = h.store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (5, 0, 5));
}

#[tokio::test]
async fn pending_status_changes_nothing() {
    let h = Harness::new();
    let raffle = h.seeded_raffle(10).await;
    let receipt = h.pending_purchase(&raffle, UserId::new()).await;
    let txn = receipt.payment.transaction_id.clone();

    // Gateway still reports pending (the status it was created with).
    let outcome = h.reconcile.on_status_update(&txn).await.expect("reconcile");
    assert_eq!(outcome, Reconciled::Ignored);

    let (free, reserved, sold) = h.store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (5, 5, 0));
}

#[tokio::test]
async fn unknown_transaction_is_payment_not_found() {
    let h = Harness::new();
    h.gateway.set_status("charge-999", ChargeStatus::Approved);

    let err = h
        .reconcile
        .on_status_update("charge-999")
        .await
        .expect_err("no payment references this charge");
    assert!(matches!(err, CoreError::NotFound { resource: "Payment", .. }));
}

#[tokio::test]
async fn approval_sends_buyer_confirmation() {
    let h = Harness::new();
    let raffle = h.seeded_raffle(10).await;
    let receipt = h.pending_purchase(&raffle, UserId::new()).await;
    let txn = receipt.payment.transaction_id.clone();

    h.gateway.set_status(&txn, ChargeStatus::Approved);
    h.reconcile.on_status_update(&txn).await.expect("reconcile");

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    let Notification::PaymentApproved { to, raffle_name, numbers } = &sent[0];
    assert_eq!(to, "buyer@example.com");
    assert_eq!(raffle_name, &raffle.name);
    assert_eq!(numbers.len(), 5);
}

/// Notification failure is best-effort: the payment still settles.
#[tokio::test]
async fn notifier_failure_does_not_fail_reconciliation() {
    let h = Harness::new();
    let raffle = h.seeded_raffle(10).await;
    let receipt = h.pending_purchase(&raffle, UserId::new()).await;
    let txn = receipt.payment.transaction_id.clone();

    h.notifier.fail_all();
    h.gateway.set_status(&txn, ChargeStatus::Approved);
    let outcome = h.reconcile.on_status_update(&txn).await.expect("reconcile");

    assert!(matches!(outcome, Reconciled::Approved { .. }));
    let (_, _, sold) = h.store.slot_counts(raffle.id);
    assert_eq!(sold, 5);
}
