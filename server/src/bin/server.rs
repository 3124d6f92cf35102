//! Rifa raffle backend server.
//!
//! Boots the full stack: PostgreSQL storage with migrations, the PIX
//! gateway client, outbound mail, blob storage, the HTTP API and the
//! background hold sweeper.
//!
//! # Usage
//!
//! ```bash
//! # Start PostgreSQL, then:
//! cargo run --bin server
//! ```

use rifa_core::notify::Notifier;
use rifa_core::{
    HoldSweeper, PurchaseService, ReconciliationService, SystemClock, WinnerSelector,
};
use rifa_gateway::PixClient;
use rifa_postgres::PgStore;
use rifa_server::mailer::{ConsoleMailer, SmtpMailer};
use rifa_server::storage::HttpBlobStore;
use rifa_server::sweep::spawn_hold_sweeper;
use rifa_server::{build_router, AppState, Config, TokenVerifier};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rifa_server=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        database = %config.database.url,
        gateway = %config.gateway.base_url,
        hold_minutes = config.purchase.hold_minutes,
        "configuration loaded"
    );

    // Storage
    let store = PgStore::connect(
        &config.database.url,
        config.database.max_connections,
        Duration::from_secs(config.database.acquire_timeout),
    )
    .await?;
    store.migrate().await?;
    tracing::info!("database ready");

    // External collaborators, constructed once at process start and injected
    // everywhere (no module-level provider singletons).
    let gateway = Arc::new(PixClient::new(
        config.gateway.base_url.clone(),
        config.gateway.access_token.clone(),
        config.gateway.notification_url.clone(),
    ));
    let notifier: Arc<dyn Notifier> = if config.mail.mode == "smtp" {
        Arc::new(SmtpMailer::new(
            &config.mail.smtp_host,
            config.mail.smtp_username.clone(),
            config.mail.smtp_password.clone(),
            config.mail.from_email.clone(),
        )?)
    } else {
        Arc::new(ConsoleMailer::new())
    };
    let blobs = Arc::new(HttpBlobStore::new(
        config.storage.base_url.clone(),
        config.storage.bucket.clone(),
        config.storage.service_key.clone(),
    ));

    let clock = Arc::new(SystemClock);
    let rules = config.purchase_rules();

    // Core services
    let purchase = Arc::new(PurchaseService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        gateway.clone(),
        clock.clone(),
        rules.clone(),
    ));
    let reconcile = Arc::new(ReconciliationService::new(
        gateway.clone(),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        notifier,
    ));
    let winner = Arc::new(WinnerSelector::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    ));
    let sweeper = Arc::new(HoldSweeper::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        clock.clone(),
        rules,
    ));

    let state = AppState {
        purchase,
        reconcile,
        winner,
        raffles: Arc::new(store.clone()),
        payments: Arc::new(store.clone()),
        tickets: Arc::new(store.clone()),
        pool: Arc::new(store.clone()),
        blobs,
        verifier: TokenVerifier::new(config.auth.token_secret.clone()),
        clock,
    };

    // Background reclaim of expired holds
    let sweep_handle = spawn_hold_sweeper(
        sweeper,
        Duration::from_secs(config.purchase.sweep_interval_secs),
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "rifa server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down gracefully");
        })
        .await?;

    sweep_handle.abort();
    Ok(())
}
