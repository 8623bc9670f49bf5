pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod query;
pub mod services;
pub mod state;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::handlers::{elevated::admin, protected, public};
use crate::middleware::{jwt_auth_middleware, require_admin_middleware};

pub use crate::state::AppState;

/// Full HTTP router
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(public_routes())
        .merge(protected_routes(state.clone()))
        .merge(admin_routes(state.clone()))
        .layer(cors(&state.config.api))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(public::system::root))
        .route("/health", get(public::system::health))
        .route("/api/public/questions", get(public::questions::list))
        .route("/api/public/questions/facets", get(public::questions::facets))
        .route("/api/public/questions/:id", get(public::questions::show))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::simulados;

    Router::new()
        .route("/api/auth/me", get(protected::auth::me))
        .route("/api/simulados", get(simulados::list).post(simulados::start))
        .route("/api/simulados/:id", get(simulados::show))
        .route("/api/simulados/:id/answers", post(simulados::answer))
        .route("/api/simulados/:id/finish", post(simulados::finish))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn admin_routes(state: AppState) -> Router<AppState> {
    let upload_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/api/admin/database/tables", get(admin::database::tables))
        .route("/api/admin/database/stats", get(admin::database::stats))
        .route(
            "/api/admin/database/data/:table",
            get(admin::data::list).post(admin::data::create).patch(admin::data::patch_cell),
        )
        .route(
            "/api/admin/database/data/:table/:id",
            get(admin::data::show).put(admin::data::update).delete(admin::data::delete),
        )
        .route(
            "/api/admin/upload",
            post(admin::upload::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Layers run bottom-up: token first, then the admin profile check
        .route_layer(from_fn_with_state(state.clone(), require_admin_middleware))
        .route_layer(from_fn_with_state(state, jwt_auth_middleware))
}

fn cors(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config.cors_origins.iter().filter_map(|o| o.parse().ok()).collect();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}
