/// Application name
pub const APP_NAME: &str = "Folio";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Page number used when the query omits or mangles `page`
pub const DEFAULT_PAGE: u32 = 1;

/// Page size used when the query omits or mangles `limit`
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on `limit` so a single request cannot dump the table
pub const MAX_PAGE_SIZE: u32 = 100;

/// Minimum accepted password length at registration
pub const MIN_PASSWORD_LEN: usize = 6;

/// Bearer token lifetime in seconds (7 days)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Auth attempts allowed per source address within one window
pub const AUTH_RATE_LIMIT_MAX: usize = 50;

/// Length of the auth rate-limit window in seconds (15 minutes)
pub const AUTH_RATE_LIMIT_WINDOW_SECS: u64 = 15 * 60;

/// Public URL prefix under which uploaded files are served
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// Maximum upload size in bytes (5 MiB)
pub const MAX_UPLOAD_SIZE: usize = 5 * 1024 * 1024;

/// File extensions accepted for image uploads
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Role stored on every registered user
pub const DEFAULT_ROLE: &str = "admin";
