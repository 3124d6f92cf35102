//! Winner selector tests (Scenario E).
//!
//! Run with: `cargo test --test winner_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use rifa_core::error::CoreError;
use rifa_core::pool::TicketPool;
use rifa_core::store::RaffleStore;
use rifa_core::types::{Money, Raffle, RaffleId, TicketNumber, UserId};
use rifa_core::WinnerSelector;
use rifa_testing::InMemoryStore;
use std::sync::Arc;

async fn seeded_raffle(store: &InMemoryStore, numbers: u32) -> Raffle {
    let now = Utc::now();
    let raffle = Raffle {
        id: RaffleId::new(),
        name: "Weekend raffle".to_string(),
        description: "A weekend raffle".to_string(),
        ticket_price: Money::from_cents(500),
        starts_at: now - Duration::days(7),
        ends_at: now - Duration::hours(1),
        quantity_numbers: numbers,
        image_url: None,
        organizer: UserId::new(),
        winning_ticket: None,
        created_at: now - Duration::days(7),
    };
    RaffleStore::insert(store, &raffle).await.expect("insert raffle");
    store.seed(raffle.id, numbers).await.expect("seed slots");
    raffle
}

async fn sell_numbers(store: &InMemoryStore, raffle: &Raffle, owner: UserId, numbers: &[u32]) {
    let numbers: Vec<TicketNumber> = numbers.iter().map(|n| TicketNumber::new(*n)).collect();
    store
        .reserve(raffle.id, &numbers, Utc::now() + Duration::minutes(30))
        .await
        .expect("reserve");
    store.commit(raffle.id, &numbers, owner).await.expect("commit");
}

fn selector(store: &InMemoryStore) -> WinnerSelector {
    WinnerSelector::new(Arc::new(store.clone()), Arc::new(store.clone()))
}

#[tokio::test]
async fn draws_one_of_the_sold_tickets() {
    let store = InMemoryStore::new();
    let raffle = seeded_raffle(&store, 10).await;
    let owner = UserId::new();
    sell_numbers(&store, &raffle, owner, &[2, 4, 6, 8]).await;

    let winner = selector(&store).draw(raffle.id).await.expect("draw succeeds");

    assert_eq!(winner.owner, owner);
    assert!([2, 4, 6, 8].contains(&winner.number.value()));

    let stored = RaffleStore::get(&store, raffle.id)
        .await
        .expect("get raffle")
        .expect("raffle exists");
    assert_eq!(stored.winning_ticket, Some(winner.id));
}

#[tokio::test]
async fn zero_sold_tickets_is_an_error() {
    let store = InMemoryStore::new();
    let raffle = seeded_raffle(&store, 10).await;

    let err = selector(&store)
        .draw(raffle.id)
        .await
        .expect_err("nothing sold yet");
    assert!(matches!(err, CoreError::NoTicketsSold(id) if id == raffle.id));
}

#[tokio::test]
async fn second_draw_is_rejected() {
    let store = InMemoryStore::new();
    let raffle = seeded_raffle(&store, 10).await;
    sell_numbers(&store, &raffle, UserId::new(), &[1, 3, 5]).await;

    let svc = selector(&store);
    let first = svc.draw(raffle.id).await.expect("first draw succeeds");
    let err = svc.draw(raffle.id).await.expect_err("re-draws are a hard error");

    assert!(matches!(err, CoreError::AlreadyDrawn(id) if id == raffle.id));

    // The recorded winner is untouched by the failed second draw.
    let stored = RaffleStore::get(&store, raffle.id)
        .await
        .expect("get raffle")
        .expect("raffle exists");
    assert_eq!(stored.winning_ticket, Some(first.id));
}

#[tokio::test]
async fn unknown_raffle_is_not_found() {
    let store = InMemoryStore::new();
    let err = selector(&store)
        .draw(RaffleId::new())
        .await
        .expect_err("no such raffle");
    assert!(matches!(err, CoreError::NotFound { resource: "Raffle", .. }));
}
