//! HTTP routes.

pub mod health;
pub mod rpc;

pub use health::{HealthResponse, health_routes};
pub use rpc::{ListFunctionsResponse, call_handler, list_functions_handler};
