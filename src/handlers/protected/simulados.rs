use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::database::models::SimuladoAttempt;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::profiles::{lookup_profile, ProfileLookup};
use crate::services::simulados::{
    AnswerReceipt, AnswerRequest, AttemptView, SimuladoResult, SimuladoService, StartRequest,
};
use crate::state::AppState;

fn parse_body<T: DeserializeOwned>(body: Result<Json<Value>, JsonRejection>) -> Result<T, ApiError> {
    let value = match body {
        Ok(Json(value)) => value,
        Err(rejection) => return Err(ApiError::invalid_json(rejection.body_text())),
    };
    serde_json::from_value(value).map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

/// POST /api/simulados - Start a new attempt
pub async fn start(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AttemptView> {
    // An absent body means all defaults
    let request: StartRequest = match body {
        Err(JsonRejection::MissingJsonContentType(_)) => StartRequest::default(),
        other => parse_body(other)?,
    };
    let view = SimuladoService::new(state.store.as_ref()).start(auth_user.user_id, request).await?;
    Ok(ApiResponse::created(view))
}

/// GET /api/simulados - Caller's attempts, newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<SimuladoAttempt>> {
    let attempts = SimuladoService::new(state.store.as_ref()).list(auth_user.user_id).await?;
    Ok(ApiResponse::success(attempts))
}

/// GET /api/simulados/:id - Attempt with questions and answers
pub async fn show(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<AttemptView> {
    let timeout = Duration::from_millis(state.config.auth.profile_timeout_ms);
    let is_admin = match lookup_profile(state.store.as_ref(), auth_user.user_id, timeout).await? {
        ProfileLookup::Found(profile) => profile.has_role(&state.config.auth.admin_role),
        ProfileLookup::Missing | ProfileLookup::TimedOut => false,
    };

    let view = SimuladoService::new(state.store.as_ref()).get(auth_user.user_id, &id, is_admin).await?;
    Ok(ApiResponse::success(view))
}

/// POST /api/simulados/:id/answers - Record an answer
pub async fn answer(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<AnswerReceipt> {
    let request: AnswerRequest = parse_body(body)?;
    let receipt = SimuladoService::new(state.store.as_ref()).answer(auth_user.user_id, &id, request).await?;
    Ok(ApiResponse::success(receipt))
}

/// POST /api/simulados/:id/finish - Score the attempt
pub async fn finish(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<SimuladoResult> {
    let result = SimuladoService::new(state.store.as_ref()).finish(auth_user.user_id, &id).await?;
    Ok(ApiResponse::success(result))
}
