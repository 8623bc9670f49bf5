use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use super::auth::AuthUser;
use crate::error::ApiError;
use crate::services::profiles::{lookup_profile, ProfileLookup};
use crate::state::AppState;

/// Caller whose profile role was re-checked against the database
#[derive(Clone, Debug)]
pub struct AdminUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Requires `AuthUser` from `jwt_auth_middleware`; rejects callers whose
/// `profiles.role` is not the admin role.
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let timeout = Duration::from_millis(state.config.auth.profile_timeout_ms);
    let profile = match lookup_profile(state.store.as_ref(), auth_user.user_id, timeout).await? {
        ProfileLookup::Found(profile) => profile,
        ProfileLookup::Missing => {
            tracing::warn!("Admin check failed: no profile for user {}", auth_user.user_id);
            return Err(ApiError::forbidden("Admin access required"));
        }
        ProfileLookup::TimedOut => {
            return Err(ApiError::service_unavailable("Profile lookup timed out"));
        }
    };

    if !profile.has_role(&state.config.auth.admin_role) {
        tracing::warn!("Admin check failed: user {} has role '{}'", auth_user.user_id, profile.role);
        return Err(ApiError::forbidden("Admin access required"));
    }

    request.extensions_mut().insert(AdminUser { id: profile.id, email: profile.email });
    Ok(next.run(request).await)
}
