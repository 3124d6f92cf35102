//! Row-to-domain mapping helpers.

use rifa_core::error::{CoreError, Result};
use rifa_core::types::{
    Money, Payment, PaymentId, PaymentStatus, Raffle, RaffleId, Ticket, TicketId, TicketNumber,
    UserId,
};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

pub(crate) fn get_err(column: &str, err: &sqlx::Error) -> CoreError {
    CoreError::Storage(format!("failed to read column {column}: {err}"))
}

/// Convert ticket numbers to the `INTEGER[]` representation.
pub(crate) fn numbers_to_ints(numbers: &[TicketNumber]) -> Result<Vec<i32>> {
    numbers
        .iter()
        .map(|n| {
            i32::try_from(n.value())
                .map_err(|_| CoreError::Storage(format!("ticket number {n} out of range")))
        })
        .collect()
}

pub(crate) fn ints_to_numbers(ints: &[i32]) -> Result<Vec<TicketNumber>> {
    ints.iter()
        .map(|n| {
            u32::try_from(*n)
                .map(TicketNumber::new)
                .map_err(|_| CoreError::Storage(format!("stored ticket number {n} is negative")))
        })
        .collect()
}

pub(crate) fn cents_to_db(money: Money) -> Result<i64> {
    i64::try_from(money.cents())
        .map_err(|_| CoreError::Storage("amount exceeds storable range".to_string()))
}

pub(crate) fn cents_from_db(cents: i64) -> Result<Money> {
    u64::try_from(cents)
        .map(Money::from_cents)
        .map_err(|_| CoreError::Storage(format!("stored amount {cents} is negative")))
}

pub(crate) fn raffle_from_row(row: &PgRow) -> Result<Raffle> {
    let quantity: i32 = row
        .try_get("quantity_numbers")
        .map_err(|e| get_err("quantity_numbers", &e))?;
    Ok(Raffle {
        id: RaffleId::from_uuid(row.try_get("id").map_err(|e| get_err("id", &e))?),
        name: row.try_get("name").map_err(|e| get_err("name", &e))?,
        description: row
            .try_get("description")
            .map_err(|e| get_err("description", &e))?,
        ticket_price: cents_from_db(
            row.try_get("ticket_price_cents")
                .map_err(|e| get_err("ticket_price_cents", &e))?,
        )?,
        starts_at: row.try_get("starts_at").map_err(|e| get_err("starts_at", &e))?,
        ends_at: row.try_get("ends_at").map_err(|e| get_err("ends_at", &e))?,
        quantity_numbers: u32::try_from(quantity)
            .map_err(|_| CoreError::Storage(format!("stored quantity {quantity} is negative")))?,
        image_url: row.try_get("image_url").map_err(|e| get_err("image_url", &e))?,
        organizer: UserId::from_uuid(
            row.try_get("organizer").map_err(|e| get_err("organizer", &e))?,
        ),
        winning_ticket: row
            .try_get::<Option<Uuid>, _>("winning_ticket")
            .map_err(|e| get_err("winning_ticket", &e))?
            .map(TicketId::from_uuid),
        created_at: row
            .try_get("created_at")
            .map_err(|e| get_err("created_at", &e))?,
    })
}

pub(crate) fn payment_from_row(row: &PgRow) -> Result<Payment> {
    let status: String = row.try_get("status").map_err(|e| get_err("status", &e))?;
    let numbers: Vec<i32> = row
        .try_get("ticket_numbers")
        .map_err(|e| get_err("ticket_numbers", &e))?;
    Ok(Payment {
        id: PaymentId::from_uuid(row.try_get("id").map_err(|e| get_err("id", &e))?),
        transaction_id: row
            .try_get("transaction_id")
            .map_err(|e| get_err("transaction_id", &e))?,
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(|e| get_err("user_id", &e))?),
        raffle_id: RaffleId::from_uuid(
            row.try_get("raffle_id").map_err(|e| get_err("raffle_id", &e))?,
        ),
        amount: cents_from_db(
            row.try_get("amount_cents")
                .map_err(|e| get_err("amount_cents", &e))?,
        )?,
        payer_email: row
            .try_get("payer_email")
            .map_err(|e| get_err("payer_email", &e))?,
        status: PaymentStatus::parse(&status)
            .ok_or_else(|| CoreError::Storage(format!("unknown payment status {status}")))?,
        ticket_numbers: ints_to_numbers(&numbers)?,
        pay_url: row.try_get("pay_url").map_err(|e| get_err("pay_url", &e))?,
        created_at: row
            .try_get("created_at")
            .map_err(|e| get_err("created_at", &e))?,
    })
}

pub(crate) fn ticket_from_row(row: &PgRow) -> Result<Ticket> {
    let number: i32 = row
        .try_get("ticket_number")
        .map_err(|e| get_err("ticket_number", &e))?;
    Ok(Ticket {
        id: TicketId::from_uuid(row.try_get("id").map_err(|e| get_err("id", &e))?),
        raffle_id: RaffleId::from_uuid(
            row.try_get("raffle_id").map_err(|e| get_err("raffle_id", &e))?,
        ),
        owner: UserId::from_uuid(row.try_get("owner_id").map_err(|e| get_err("owner_id", &e))?),
        number: u32::try_from(number)
            .map(TicketNumber::new)
            .map_err(|_| CoreError::Storage(format!("stored ticket number {number} is negative")))?,
        issued_at: row.try_get("issued_at").map_err(|e| get_err("issued_at", &e))?,
    })
}
