pub mod audit;
pub mod profiles;
pub mod questions;
pub mod simulados;
