use std::time::Duration;

use axum::extract::{Extension, State};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::Profile;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::profiles::{lookup_profile, ProfileLookup};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TokenUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct Me {
    pub user: TokenUser,
    pub profile: Option<Profile>,
    pub is_admin: bool,
    /// The profile fetch did not finish in time; `profile` is null
    pub profile_timed_out: bool,
}

/// GET /api/auth/me - Current user and profile
///
/// The profile read is bounded by `auth.profile_timeout_ms` so a slow backend
/// degrades to a profile-less response instead of hanging the client.
pub async fn me(State(state): State<AppState>, Extension(auth_user): Extension<AuthUser>) -> ApiResult<Me> {
    let timeout = Duration::from_millis(state.config.auth.profile_timeout_ms);
    let (profile, profile_timed_out) = match lookup_profile(state.store.as_ref(), auth_user.user_id, timeout).await? {
        ProfileLookup::Found(profile) => (Some(profile), false),
        ProfileLookup::Missing => (None, false),
        ProfileLookup::TimedOut => (None, true),
    };

    let is_admin = profile.as_ref().map_or(false, |p| p.has_role(&state.config.auth.admin_role));

    Ok(ApiResponse::success(Me {
        user: TokenUser { id: auth_user.user_id, email: auth_user.email, role: auth_user.token_role },
        profile,
        is_admin,
        profile_timed_out,
    }))
}
