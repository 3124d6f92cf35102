//! HTTP server for the Rifa raffle backend.
//!
//! Wires the domain core to the outside world: axum routes over
//! [`state::AppState`], bearer-token identity facts, the PIX webhook, blob
//! storage for raffle images, outbound e-mail, and the background
//! hold-sweep task. All collaborators are injected as trait objects, so the
//! HTTP tests run the full stack against the in-memory doubles from
//! `rifa-testing`.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod routes;
pub mod state;
pub mod storage;
pub mod sweep;

pub use auth::{AdminUser, CurrentUser, TokenVerifier};
pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;
