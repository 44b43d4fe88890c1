use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use folio_shared::markdown::{CommonMarkRenderer, MarkdownRenderer};
use folio_store::Database;

use crate::auth::{self, AuthService};
use crate::blogs::{self, BlogService};
use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::profile::{self, ProfileService};
use crate::projects::{self, ProjectService};
use crate::rate_limit::RateLimiter;
use crate::response::ApiResponse;
use crate::upload_store::UploadStore;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub type SharedDatabase = Arc<Mutex<Database>>;

/// Lock the database for one synchronous unit of work. Never hold the guard
/// across an `.await`.
pub fn lock_db(db: &SharedDatabase) -> Result<MutexGuard<'_, Database>, ApiError> {
    db.lock()
        .map_err(|_| ApiError::Internal("database lock poisoned".into()))
}

/// Path ids that are not UUIDs cannot name a record.
pub fn parse_id(raw: &str, missing: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(missing.to_string()))
}

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub blogs: BlogService,
    pub projects: ProjectService,
    pub profile: ProfileService,
    pub uploads: Arc<UploadStore>,
    pub auth_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub async fn new(config: ServerConfig, database: Database) -> anyhow::Result<Self> {
        let renderer: Arc<dyn MarkdownRenderer> = Arc::new(CommonMarkRenderer);
        Self::with_renderer(config, database, renderer).await
    }

    pub async fn with_renderer(
        config: ServerConfig,
        database: Database,
        renderer: Arc<dyn MarkdownRenderer>,
    ) -> anyhow::Result<Self> {
        let db: SharedDatabase = Arc::new(Mutex::new(database));
        let uploads =
            Arc::new(UploadStore::new(config.upload_dir.clone(), config.max_upload_size).await?);
        let auth_limiter = RateLimiter::new(
            config.auth_rate_limit_max,
            Duration::from_secs(config.auth_rate_limit_window_secs),
        );

        Ok(Self {
            auth: AuthService::new(db.clone(), config.token_signer(), config.registration_open),
            blogs: BlogService::new(db.clone(), renderer),
            projects: ProjectService::new(db.clone()),
            profile: ProfileService::new(db),
            uploads,
            auth_limiter,
            config: Arc::new(config),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let origin = match HeaderValue::from_str(&state.config.frontend_url) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(_) => {
            warn!(url = %state.config.frontend_url, "Invalid FRONTEND_URL, CORS disabled");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    let api = Router::new()
        .nest("/auth", auth::routes(state.auth_limiter.clone()))
        .nest("/blogs", blogs::routes())
        .nest("/projects", projects::routes())
        .nest("/profile", profile::routes())
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .nest_service("/uploads", ServeDir::new(state.uploads.base_path()))
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_size + MULTIPART_OVERHEAD,
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

async fn health_check() -> ApiResponse<HealthResponse> {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now(),
    })
    .with_message("Server is running")
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".into())
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
