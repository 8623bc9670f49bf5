// handlers/public/mod.rs - Public handlers (no authentication required)
pub mod questions;
pub mod system;
