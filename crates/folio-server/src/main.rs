//! # folio-server
//!
//! HTTP API for a personal portfolio site.
//!
//! This binary provides:
//! - **Accounts**: registration, login and bearer-token verification, with
//!   per-IP sliding-window rate limiting on the credential routes
//! - **Blogs**: paginated listing with full-text search and tag filters,
//!   view counting, Markdown rendering and cover image uploads
//! - **Projects**: ordered listing, featured selection and thumbnails
//! - **Profile**: the owner's public profile and avatar
//! - **Static uploads** served from the upload directory

mod api;
mod auth;
mod blogs;
mod config;
mod error;
mod profile;
mod projects;
mod rate_limit;
mod response;
mod upload_store;

use tracing::info;
use tracing_subscriber::EnvFilter;

use folio_shared::constants::APP_NAME;
use folio_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,folio_server=debug")),
        )
        .init();

    info!("Starting {} server v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");
    info!(
        registration_open = config.registration_open,
        frontend = %config.frontend_url,
        "Instance settings"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let database = Database::open_at(&config.database_path)?;
    let http_addr = config.http_addr;
    let app_state = AppState::new(config, database).await?;

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes)
    let rl = app_state.auth_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
