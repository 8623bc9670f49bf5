use std::collections::HashMap;

use axum::extract::{Path, Query, State};

use crate::database::models::Question;
use crate::middleware::{ApiResponse, ApiResult};
use crate::query::Page;
use crate::services::questions::{self, Facets, QuestionDetail};
use crate::state::AppState;

/// GET /api/public/questions - Browse questions without their answers
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Page<Question>> {
    let page = questions::browse(state.store.as_ref(), &params, &state.config.query).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/public/questions/facets - Filter values for the browser
pub async fn facets(State(state): State<AppState>) -> ApiResult<Facets> {
    Ok(ApiResponse::success(questions::facets(state.store.as_ref()).await?))
}

/// GET /api/public/questions/:id - Question with answer and metadata
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<QuestionDetail> {
    Ok(ApiResponse::success(questions::detail(state.store.as_ref(), &id).await?))
}
