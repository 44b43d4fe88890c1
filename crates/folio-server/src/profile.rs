//! The public profile: the record of the first registered user.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::info;

use folio_shared::content::ProfilePatch;
use folio_store::{models::now, User};

use crate::api::{lock_db, AppState, SharedDatabase};
use crate::auth::Principal;
use crate::error::ApiError;
use crate::response::{ApiJson, ApiResponse};
use crate::upload_store::read_file_field;

#[derive(Clone)]
pub struct ProfileService {
    db: SharedDatabase,
}

impl ProfileService {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn get(&self) -> Result<User, ApiError> {
        lock_db(&self.db)?
            .first_user()
            .map_err(|e| ApiError::from_store(e, "Profile not found"))
    }

    /// Update the caller's own record.
    pub fn update(&self, principal: &Principal, patch: &ProfilePatch) -> Result<User, ApiError> {
        self.modify(principal, |user| user.apply(patch))
    }

    pub fn set_avatar(&self, principal: &Principal, avatar: String) -> Result<User, ApiError> {
        self.modify(principal, |user| {
            user.avatar = avatar;
            user.updated_at = now();
        })
    }

    fn modify(
        &self,
        principal: &Principal,
        change: impl FnOnce(&mut User),
    ) -> Result<User, ApiError> {
        let db = lock_db(&self.db)?;
        let mut user = db
            .get_user(principal.user_id)
            .map_err(|e| ApiError::from_store(e, "User not found"))?;
        change(&mut user);
        if !db.update_user_profile(&user)? {
            return Err(ApiError::NotFound("User not found".into()));
        }
        info!(user = %user.id.short(), "Updated profile");
        Ok(user)
    }
}

#[derive(Debug, Serialize)]
struct AvatarResponse {
    avatar: String,
}

async fn get_profile(State(state): State<AppState>) -> Result<ApiResponse<User>, ApiError> {
    Ok(ApiResponse::ok(state.profile.get()?))
}

async fn update_profile(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> Result<ApiResponse<User>, ApiError> {
    let user = state.profile.update(&principal, &patch)?;
    Ok(ApiResponse::ok(user).with_message("Profile updated successfully"))
}

async fn upload_avatar(
    State(state): State<AppState>,
    principal: Principal,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<AvatarResponse>, ApiError> {
    let mut multipart = multipart?;
    let file = read_file_field(&mut multipart, "avatar")
        .await?
        .ok_or_else(|| ApiError::Validation("No file uploaded".into()))?;
    let path = state.uploads.store_image("avatar", &file).await?;

    let user = state.profile.set_avatar(&principal, path)?;
    Ok(ApiResponse::ok(AvatarResponse {
        avatar: user.avatar,
    })
    .with_message("Avatar uploaded successfully"))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_profile).put(update_profile))
        .route("/avatar", post(upload_avatar))
}
