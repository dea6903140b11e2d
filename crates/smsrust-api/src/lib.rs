//! SmsRust API - REST control surface
//!
//! Campaign lifecycle endpoints, the campaign stats endpoint, the inbound
//! gateway delivery webhook and health checks.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
