// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here runs behind `jwt_auth_middleware` and receives `AuthUser`.
pub mod auth;
pub mod simulados;
