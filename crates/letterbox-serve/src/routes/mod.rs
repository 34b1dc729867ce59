//! API route definitions.
//!
//! - `POST /webhooks/email` - inbound email delivery (relay webhook)
//! - `OPTIONS /webhooks/email` - CORS preflight, always 200
//! - `GET /health` - health check
//!
//! The webhook route accepts every method and dispatches inside the
//! handler so that unsupported methods get the documented 405 JSON body
//! instead of an empty framework response.

mod health;
mod ingest;

use axum::routing::{any, get};
use axum::Router;

use crate::state::AppState;

/// Build the complete API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/webhooks/email", any(ingest::handle))
        .with_state(state)
}
