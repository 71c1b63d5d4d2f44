//! support-cloud: helpdesk backend
//!
//! Long-running service that:
//! - Turns inbound email (Resend webhook) into tickets and replies
//! - Accepts tickets from the public website form
//! - Serves the staff console API (JWT authenticated): tickets, replies,
//!   attachments, analytics, company reports, SLA settings
//!
//! `support-cloud hash-password <password>` prints an argon2 hash for
//! seeding `staff_profiles`.

mod api;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod inbound;
mod services;
mod state;
mod storage;
mod store;
mod util;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;

use config::Config;
use state::AppState;
use store::BoxError;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let mut args = std::env::args().skip(1);
    if args.next().as_deref() == Some("hash-password") {
        let password = args.next().ok_or("usage: support-cloud hash-password <password>")?;
        let hash = util::hash_password(&password).map_err(|e| format!("hash failed: {e}"))?;
        println!("{hash}");
        return Ok(());
    }

    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "support_cloud=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting support-cloud (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("support-cloud HTTP listening on {http_addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
