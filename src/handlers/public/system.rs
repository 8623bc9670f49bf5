use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::state::AppState;

/// GET / - Service information
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Portal PND API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Question bank, simulated exams and admin dashboard backend",
            "endpoints": {
                "health": "/health (public)",
                "questions": "/api/public/questions[/:id|/facets] (public)",
                "auth": "/api/auth/me (authenticated)",
                "simulados": "/api/simulados[/:id[/answers|/finish]] (authenticated)",
                "admin": "/api/admin/database/*, /api/admin/upload (admin)",
            }
        }
    }))
}

/// GET /health - Backend connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": { "status": "degraded", "timestamp": now, "database_error": health_error_label(&e) }
                })),
            )
        }
    }
}

/// Client-safe description of a failed health probe; the details stay in the log
fn health_error_label(err: &DatabaseError) -> &'static str {
    match err {
        DatabaseError::ConfigMissing(_) | DatabaseError::InvalidDatabaseUrl => "not configured",
        DatabaseError::ConnectionError(_) => "unreachable",
        DatabaseError::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)) => "unreachable",
        _ => "query failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_errors_hide_backend_text() {
        let err = DatabaseError::ConnectionError("password authentication failed for user \"svc\"".to_string());
        assert_eq!(health_error_label(&err), "unreachable");
        let err = DatabaseError::QueryError("relation \"profiles\" does not exist".to_string());
        assert_eq!(health_error_label(&err), "query failed");
        assert_eq!(health_error_label(&DatabaseError::ConfigMissing("DATABASE_URL")), "not configured");
    }
}
