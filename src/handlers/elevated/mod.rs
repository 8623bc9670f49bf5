// handlers/elevated/mod.rs - Elevated handlers (admin profile required)
//
// Routes run behind `jwt_auth_middleware` then `require_admin_middleware`, and
// receive `AdminUser`. Data access uses the service-role store.
pub mod admin;
