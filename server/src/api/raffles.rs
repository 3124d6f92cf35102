//! Raffle management endpoints.
//!
//! - `POST /api/raffles` - create a raffle with an image (admin)
//! - `GET  /api/raffles` - list raffles (public)
//! - `GET  /api/raffles/:id` - raffle details with availability (public)
//! - `POST /api/raffles/:id/draw-winner` - draw and record the winner (admin)

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rifa_core::notify::BlobStore;
use rifa_core::pool::TicketPool;
use rifa_core::store::{RaffleStore, TicketStore};
use rifa_core::types::{Money, Raffle, RaffleId, Ticket};
use rifa_core::Clock;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Raffle representation returned by the API.
#[derive(Debug, Serialize)]
pub struct RaffleResponse {
    /// Raffle id
    pub id: Uuid,
    /// Raffle name
    pub name: String,
    /// Description
    pub description: String,
    /// Price of one ticket, in cents
    pub ticket_price_cents: u64,
    /// When sales open
    pub starts_at: DateTime<Utc>,
    /// When sales close
    pub ends_at: DateTime<Utc>,
    /// Size of the number range
    pub quantity_numbers: u32,
    /// Public image URL, if an image was uploaded
    pub image_url: Option<String>,
    /// Winning ticket id, once drawn
    pub winning_ticket: Option<Uuid>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl From<Raffle> for RaffleResponse {
    fn from(raffle: Raffle) -> Self {
        Self {
            id: *raffle.id.as_uuid(),
            name: raffle.name,
            description: raffle.description,
            ticket_price_cents: raffle.ticket_price.cents(),
            starts_at: raffle.starts_at,
            ends_at: raffle.ends_at,
            quantity_numbers: raffle.quantity_numbers,
            image_url: raffle.image_url,
            winning_ticket: raffle.winning_ticket.map(|t| *t.as_uuid()),
            created_at: raffle.created_at,
        }
    }
}

/// Raffle details plus current availability.
#[derive(Debug, Serialize)]
pub struct RaffleDetailResponse {
    /// The raffle
    #[serde(flatten)]
    pub raffle: RaffleResponse,
    /// Currently free numbers count
    pub numbers_available: u32,
}

/// Response after drawing a winner.
#[derive(Debug, Serialize)]
pub struct DrawWinnerResponse {
    /// The winning ticket
    pub winner_ticket: TicketResponse,
}

/// Committed-ticket representation returned by the API.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    /// Ticket id
    pub id: Uuid,
    /// Raffle the ticket belongs to
    pub raffle_id: Uuid,
    /// Owner user id
    pub owner: Uuid,
    /// The purchased number
    pub number: u32,
    /// When the ticket was minted
    pub issued_at: DateTime<Utc>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            id: *ticket.id.as_uuid(),
            raffle_id: *ticket.raffle_id.as_uuid(),
            owner: *ticket.owner.as_uuid(),
            number: ticket.number.value(),
            issued_at: ticket.issued_at,
        }
    }
}

/// Accumulates multipart fields for raffle creation.
#[derive(Default)]
struct CreateRaffleForm {
    name: Option<String>,
    description: Option<String>,
    ticket_price_cents: Option<u64>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    quantity_numbers: Option<u32>,
    image: Option<(Vec<u8>, String)>,
}

impl CreateRaffleForm {
    fn require<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
        value.ok_or_else(|| AppError::validation(format!("missing field {field}")))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<CreateRaffleForm, AppError> {
    let mut form = CreateRaffleForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match name.as_str() {
            "image" => {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::bad_request(format!("failed to read image: {e}")))?;
                form.image = Some((bytes.to_vec(), content_type));
            }
            other => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::bad_request(format!("failed to read field: {e}")))?;
                match other {
                    "name" => form.name = Some(text),
                    "description" => form.description = Some(text),
                    "ticket_price_cents" => {
                        form.ticket_price_cents = Some(text.parse().map_err(|_| {
                            AppError::validation("ticket_price_cents must be a whole number")
                        })?);
                    }
                    "starts_at" => {
                        form.starts_at = Some(parse_timestamp(&text, "starts_at")?);
                    }
                    "ends_at" => {
                        form.ends_at = Some(parse_timestamp(&text, "ends_at")?);
                    }
                    "quantity_numbers" => {
                        form.quantity_numbers = Some(text.parse().map_err(|_| {
                            AppError::validation("quantity_numbers must be a whole number")
                        })?);
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(form)
}

fn parse_timestamp(text: &str, field: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::validation(format!("{field} must be an RFC 3339 timestamp")))
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a raffle (admin only).
///
/// Multipart form: `name`, `description`, `ticket_price_cents`, `starts_at`,
/// `ends_at`, `quantity_numbers` and an optional `image` part. Seeds the
/// full ticket pool for the new raffle.
///
/// # Errors
///
/// Validation errors for missing/malformed fields; upstream errors when the
/// image upload fails.
pub async fn create_raffle(
    admin: AdminUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<RaffleResponse>), AppError> {
    let form = read_form(multipart).await?;

    let name = CreateRaffleForm::require(form.name, "name")?;
    let description = CreateRaffleForm::require(form.description, "description")?;
    let price_cents = CreateRaffleForm::require(form.ticket_price_cents, "ticket_price_cents")?;
    let starts_at = CreateRaffleForm::require(form.starts_at, "starts_at")?;
    let ends_at = CreateRaffleForm::require(form.ends_at, "ends_at")?;
    let quantity_numbers = CreateRaffleForm::require(form.quantity_numbers, "quantity_numbers")?;

    if name.trim().is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    if ends_at <= starts_at {
        return Err(AppError::validation("ends_at must be after starts_at"));
    }
    if quantity_numbers == 0 {
        return Err(AppError::validation("quantity_numbers must be at least 1"));
    }

    let image_url = match form.image {
        Some((bytes, content_type)) if !bytes.is_empty() => Some(
            state
                .blobs
                .upload(admin.0.user_id, bytes, &content_type)
                .await?,
        ),
        _ => None,
    };

    let raffle = Raffle {
        id: RaffleId::new(),
        name,
        description,
        ticket_price: Money::from_cents(price_cents),
        starts_at,
        ends_at,
        quantity_numbers,
        image_url,
        organizer: admin.0.user_id,
        winning_ticket: None,
        created_at: state.clock.now(),
    };

    state.raffles.insert(&raffle).await?;
    state.pool.seed(raffle.id, raffle.quantity_numbers).await?;

    tracing::info!(
        raffle_id = %raffle.id,
        organizer = %raffle.organizer,
        numbers = raffle.quantity_numbers,
        "raffle created"
    );

    Ok((StatusCode::CREATED, Json(raffle.into())))
}

/// List all raffles, newest first.
///
/// # Errors
///
/// Storage errors map to 500.
pub async fn list_raffles(
    State(state): State<AppState>,
) -> Result<Json<Vec<RaffleResponse>>, AppError> {
    let raffles = state.raffles.list().await?;
    Ok(Json(raffles.into_iter().map(RaffleResponse::from).collect()))
}

/// Raffle details with current availability.
///
/// # Errors
///
/// 404 when the raffle does not exist.
pub async fn get_raffle(
    Path(raffle_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<RaffleDetailResponse>, AppError> {
    let raffle_id = RaffleId::from_uuid(raffle_id);
    let raffle = state
        .raffles
        .get(raffle_id)
        .await?
        .ok_or_else(|| AppError::not_found("Raffle", raffle_id))?;
    let numbers_available = state.pool.count_free(raffle_id).await?;

    Ok(Json(RaffleDetailResponse {
        raffle: raffle.into(),
        numbers_available,
    }))
}

/// Draw the raffle winner (admin only).
///
/// # Errors
///
/// 404 for an unknown raffle, 422 when nothing was sold, 409 when a winner
/// was already drawn.
pub async fn draw_winner(
    _admin: AdminUser,
    Path(raffle_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<DrawWinnerResponse>, AppError> {
    let winner = state.winner.draw(RaffleId::from_uuid(raffle_id)).await?;
    Ok(Json(DrawWinnerResponse {
        winner_ticket: winner.into(),
    }))
}

/// The caller's committed tickets, newest first.
///
/// # Errors
///
/// Storage errors map to 500.
pub async fn my_tickets(
    user: crate::auth::CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<TicketResponse>>, AppError> {
    let tickets = state.tickets.for_user(user.user_id).await?;
    Ok(Json(tickets.into_iter().map(TicketResponse::from).collect()))
}
