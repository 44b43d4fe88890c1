//! Accounts and bearer-token authentication.
//!
//! [`AuthService`] owns registration, login and token verification.
//! [`Principal`] is the extractor protected handlers take; it runs before
//! the request body is read, so an anonymous write is refused before any
//! payload is parsed.

use std::sync::OnceLock;

use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware,
    routing::{get, post},
    Router,
};
use tracing::{info, warn};

use folio_shared::content::{normalize_email, Credentials, Registration};
use folio_shared::password::{hash_password, verify_password};
use folio_shared::token::TokenSigner;
use folio_shared::UserId;
use folio_store::{StoreError, User};

use crate::api::{lock_db, AppState, SharedDatabase};
use crate::error::ApiError;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::response::{ApiJson, ApiResponse};

/// The authenticated caller of a protected route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
}

#[derive(Clone)]
pub struct AuthService {
    db: SharedDatabase,
    signer: TokenSigner,
    registration_open: bool,
}

impl AuthService {
    pub fn new(db: SharedDatabase, signer: TokenSigner, registration_open: bool) -> Self {
        Self {
            db,
            signer,
            registration_open,
        }
    }

    /// Create an account. The caller logs in separately to get a token.
    pub async fn register(&self, registration: Registration) -> Result<User, ApiError> {
        if !self.registration_open {
            return Err(ApiError::Forbidden("Registration is closed".into()));
        }
        registration.validate()?;

        let email = normalize_email(&registration.email);
        let existing = lock_db(&self.db)?.find_user_by_email(&email)?;
        if existing.is_some() {
            return Err(ApiError::Conflict("User already exists".into()));
        }

        let password = registration.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;

        let user = User::new(&registration.name, &email, password_hash);
        // a concurrent registration can still win the race; the UNIQUE
        // index reports it as a conflict
        lock_db(&self.db)?.insert_user(&user)?;

        info!(user = %user.id.short(), "Registered user");
        Ok(user)
    }

    /// Check credentials and issue a bearer token.
    pub async fn login(&self, credentials: Credentials) -> Result<(String, User), ApiError> {
        credentials.validate()?;

        let email = normalize_email(&credentials.email);
        let found = lock_db(&self.db)?.find_user_by_email(&email)?;
        let Some(user) = found else {
            // unknown emails pay the same Argon2 cost as a wrong password
            let password = credentials.password;
            tokio::task::spawn_blocking(move || verify_password(&password, dummy_hash())).await?;
            warn!("Login for unknown email");
            return Err(invalid_credentials());
        };

        let password = credentials.password;
        let stored_hash = user.password_hash.clone();
        let valid =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash)).await?;
        if !valid {
            warn!(user = %user.id.short(), "Login with wrong password");
            return Err(invalid_credentials());
        }

        let token = self.signer.issue(user.id)?;
        info!(user = %user.id.short(), "User logged in");
        Ok((token, user))
    }

    /// Resolve a bearer token to the user it was issued for. The user must
    /// still exist.
    pub fn authenticate(&self, token: &str) -> Result<Principal, ApiError> {
        let claims = self.signer.verify(token)?;
        match lock_db(&self.db)?.get_user(claims.sub) {
            Ok(_) => Ok(Principal {
                user_id: claims.sub,
            }),
            Err(StoreError::NotFound) => Err(ApiError::Unauthorized("User not found".into())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn current_user(&self, principal: &Principal) -> Result<User, ApiError> {
        lock_db(&self.db)?
            .get_user(principal.user_id)
            .map_err(|e| ApiError::from_store(e, "User not found"))
    }
}

/// A PHC string with default Argon2 parameters that no login matches.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| hash_password("folio-dummy-password").unwrap_or_default())
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid credentials".into())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("No token provided".into()))?;
        state.auth.authenticate(token)
    }
}

// ─── Handlers ───

async fn register(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = state.auth.register(registration).await?;
    Ok(ApiResponse::created(user).with_message("User registered successfully"))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<ApiResponse<User>, ApiError> {
    let (token, user) = state.auth.login(credentials).await?;
    Ok(ApiResponse::ok(user)
        .with_token(token)
        .with_message("Login successful"))
}

async fn verify(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<User>, ApiError> {
    let user = state.auth.current_user(&principal)?;
    Ok(ApiResponse::ok(user))
}

/// `/api/auth` routes. Register and login share one rate-limit window.
pub fn routes(limiter: RateLimiter) -> Router<AppState> {
    let limited = Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));

    Router::new().route("/verify", get(verify)).merge(limited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use folio_store::Database;

    fn service(registration_open: bool) -> (AuthService, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("auth.db")).unwrap();
        let signer = TokenSigner::generate(chrono::Duration::hours(1));
        (
            AuthService::new(Arc::new(Mutex::new(db)), signer, registration_open),
            dir,
        )
    }

    fn registration(email: &str) -> Registration {
        Registration {
            name: "A".into(),
            email: email.into(),
            password: "secret1".into(),
            confirm_password: Some("secret1".into()),
        }
    }

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let (auth, _dir) = service(true);
        let user = auth.register(registration("a@x.com")).await.unwrap();
        assert_ne!(user.password_hash, "secret1");

        let (token, logged_in) = auth
            .login(credentials("  A@X.COM ", "secret1"))
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let principal = auth.authenticate(&token).unwrap();
        assert_eq!(principal.user_id, user.id);
        assert_eq!(auth.current_user(&principal).unwrap().email, "a@x.com");
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email() {
        let (auth, _dir) = service(true);
        auth.register(registration("a@x.com")).await.unwrap();

        for (email, password) in [("a@x.com", "wrong-pw"), ("b@x.com", "secret1")] {
            let err = auth.login(credentials(email, password)).await.unwrap_err();
            assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Invalid credentials"));
        }
    }

    #[test]
    fn test_unknown_email_checks_a_real_hash() {
        let hash = dummy_hash();
        assert!(hash.starts_with("$argon2id$"));
        assert!(std::ptr::eq(hash, dummy_hash()));
        assert!(!verify_password("secret1", hash));
        assert!(!verify_password("", hash));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (auth, _dir) = service(true);
        auth.register(registration("a@x.com")).await.unwrap();
        let err = auth.register(registration("A@x.com")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invalid_registration() {
        let (auth, _dir) = service(true);
        let mut short = registration("a@x.com");
        short.password = "123".into();
        short.confirm_password = None;
        assert!(matches!(
            auth.register(short).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_registration_closed() {
        let (auth, _dir) = service(false);
        assert!(matches!(
            auth.register(registration("a@x.com")).await,
            Err(ApiError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_token_for_missing_user_rejected() {
        let (auth, _dir) = service(true);
        let token = auth.signer.issue(UserId::new()).unwrap();
        assert!(matches!(
            auth.authenticate(&token),
            Err(ApiError::Unauthorized(_))
        ));
        assert!(auth.authenticate("garbage").is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, "Bearer abc.def".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }
}
