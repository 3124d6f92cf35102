//! Purchase orchestration tests.
//!
//! Covers the happy path, validation failures, concurrent contention over a
//! small pool, and the compensation contract (a failed purchase attempt must
//! never leave numbers stuck as Reserved).
//!
//! Run with: `cargo test --test purchase_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use chrono::Duration;
use rifa_core::clock::Clock;
use rifa_core::error::CoreError;
use rifa_core::pool::TicketPool;
use rifa_core::store::RaffleStore;
use rifa_core::types::{Money, PaymentStatus, Raffle, RaffleId, UserId};
use rifa_core::{PurchaseRules, PurchaseService};
use rifa_testing::{FixedClock, InMemoryStore, MockGateway};
use std::collections::HashSet;
use std::sync::Arc;

async fn seeded_raffle(store: &InMemoryStore, clock: &FixedClock, numbers: u32) -> Raffle {
    let now = clock.now();
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
    RaffleStore::insert(store, &raffle).await.expect("insert raffle");
    store.seed(raffle.id, numbers).await.expect("seed slots");
    raffle
}

fn service(store: &InMemoryStore, gateway: &MockGateway, clock: &FixedClock) -> PurchaseService {
    PurchaseService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(gateway.clone()),
        Arc::new(clock.clone()),
        PurchaseRules::default(),
    )
}

/// Scenario A: 10 free numbers, purchase of 5 succeeds with 5 distinct
/// in-range numbers and a Pending payment.
#[tokio::test]
async fn purchase_reserves_five_distinct_numbers() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 10).await;
    let buyer = UserId::new();

    let receipt = service(&store, &gateway, &clock)
        .purchase(raffle.id, buyer, "buyer@example.com", 5)
        .await
        .expect("purchase succeeds");

    assert_eq!(receipt.numbers.len(), 5);
    let distinct: HashSet<_> = receipt.numbers.iter().collect();
    assert_eq!(distinct.len(), 5, "numbers must be distinct");
    for number in &receipt.numbers {
        assert!((1..=10).contains(&number.value()));
    }

    assert_eq!(receipt.payment.status, PaymentStatus::Pending);
    assert_eq!(receipt.payment.amount, Money::from_cents(2500));
    assert_eq!(receipt.payment.ticket_numbers, receipt.numbers);
    assert!(receipt.payment.pay_url.starts_with("https://pay.test/"));

    let (free, reserved, sold) = store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (5, 5, 0));
}

/// Scenario B: two concurrent purchases of 10 over exactly 10 free numbers -
/// one wins, the other fails with insufficient inventory (or a conflict),
/// and no number is double-reserved.
#[tokio::test]
async fn concurrent_purchases_cannot_oversell() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 10).await;
    let svc = service(&store, &gateway, &clock);

    let (left, right) = tokio::join!(
        svc.purchase(raffle.id, UserId::new(), "left@example.com", 10),
        svc.purchase(raffle.id, UserId::new(), "right@example.com", 10),
    );

    let successes = [&left, &right].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one purchase may win");

    let loser = if left.is_err() { left } else { right };
    match loser.expect_err("one purchase must lose") {
        CoreError::InsufficientInventory { requested, .. } => assert_eq!(requested, 10),
        CoreError::Conflict(_) => {}
        other => panic!("unexpected loser error: {other}"),
    }

    let (free, reserved, sold) = store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (0, 10, 0));
}

#[tokio::test]
async fn rejects_quantity_outside_increments() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 20).await;

    let err = service(&store, &gateway, &clock)
        .purchase(raffle.id, UserId::new(), "buyer@example.com", 3)
        .await
        .expect_err("3 is not an allowed increment");

    match err {
        CoreError::InvalidQuantity { quantity, allowed } => {
            assert_eq!(quantity, 3);
            assert_eq!(allowed, vec![1, 5, 10, 20]);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Rejected before any mutation.
    let (free, reserved, sold) = store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (20, 0, 0));
    assert!(gateway.created_charges().is_empty());
}

#[tokio::test]
async fn rejects_purchase_after_raffle_end() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 10).await;

    clock.advance(Duration::days(8));

    let err = service(&store, &gateway, &clock)
        .purchase(raffle.id, UserId::new(), "late@example.com", 1)
        .await
        .expect_err("raffle has ended");
    assert!(matches!(err, CoreError::RaffleClosed(id) if id == raffle.id));
}

#[tokio::test]
async fn unknown_raffle_is_not_found() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();

    let err = service(&store, &gateway, &clock)
        .purchase(RaffleId::new(), UserId::new(), "buyer@example.com", 1)
        .await
        .expect_err("no such raffle");
    assert!(matches!(err, CoreError::NotFound { resource: "Raffle", .. }));
}

#[tokio::test]
async fn requesting_more_than_free_is_insufficient_inventory() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 5).await;

    let err = service(&store, &gateway, &clock)
        .purchase(raffle.id, UserId::new(), "buyer@example.com", 10)
        .await
        .expect_err("only 5 numbers exist");
    assert!(matches!(
        err,
        CoreError::InsufficientInventory {
            requested: 10,
            available: 5
        }
    ));
}

/// Compensation: a gateway failure after reservation releases every held
/// number before the error surfaces.
#[tokio::test]
async fn gateway_failure_releases_reservation() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 10).await;

    gateway.fail_next_create();

    let err = service(&store, &gateway, &clock)
        .purchase(raffle.id, UserId::new(), "buyer@example.com", 5)
        .await
        .expect_err("gateway is down");
    assert!(matches!(err, CoreError::Upstream(_)));
    assert!(err.is_retryable());

    let (free, reserved, sold) = store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (10, 0, 0), "no number may stay Reserved");
}

/// Compensation: a payment-persistence failure after the charge was created
/// also releases the reservation.
#[tokio::test]
async fn payment_persist_failure_releases_reservation() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 10).await;

    store.fail_next_payment_insert();

    let err = service(&store, &gateway, &clock)
        .purchase(raffle.id, UserId::new(), "buyer@example.com", 5)
        .await
        .expect_err("payment insert fails");
    assert!(matches!(err, CoreError::Storage(_)));

    let (free, reserved, sold) = store.slot_counts(raffle.id);
    assert_eq!((free, reserved, sold), (10, 0, 0));
    // The charge itself went out; reconciliation of its eventual webhook
    // will find no payment row and log PaymentNotFound.
    assert_eq!(gateway.created_charges().len(), 1);
}

/// Reservation conservation: free + reserved + sold stays constant across
/// a mix of successful and failed purchase attempts.
#[tokio::test]
async fn slot_conservation_across_attempts() {
    let store = InMemoryStore::new();
    let gateway = MockGateway::new();
    let clock = FixedClock::from_system_now();
    let raffle = seeded_raffle(&store, &clock, 20).await;
    let svc = service(&store, &gateway, &clock);

    svc.purchase(raffle.id, UserId::new(), "a@example.com", 5)
        .await
        .expect("first purchase");
    gateway.fail_next_create();
    let _ = svc
        .purchase(raffle.id, UserId::new(), "b@example.com", 10)
        .await
        .expect_err("second purchase fails at the gateway");
    svc.purchase(raffle.id, UserId::new(), "c@example.com", 10)
        .await
        .expect("third purchase");

    let (free, reserved, sold) = store.slot_counts(raffle.id);
    assert_eq!(free + reserved + sold, 20, "no slot created or lost");
    assert_eq!((free, reserved, sold), (5, 15, 0));
}
