// handlers/mod.rs - three security tiers
//
// Public (no auth) → Protected (JWT auth) → Elevated (JWT auth + admin profile)
pub mod elevated; // /api/admin/*
pub mod protected; // /api/auth/*, /api/simulados/*
pub mod public; // /api/public/*, /, /health

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde_json::Value;

use crate::error::ApiError;
use crate::query::Row;

/// Unwrap a JSON body that must be an object, mapping extractor rejections
/// into the error envelope.
pub(crate) fn json_object(body: Result<Json<Value>, JsonRejection>) -> Result<Row, ApiError> {
    match body {
        Ok(Json(Value::Object(map))) => Ok(map),
        Ok(Json(_)) => Err(ApiError::invalid_json("Request body must be a JSON object")),
        Err(rejection) => Err(ApiError::invalid_json(rejection.body_text())),
    }
}
