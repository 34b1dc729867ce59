//! Letterbox Serve - webhook endpoint for inbound newsletter ingestion.
//!
//! This crate exposes the HTTP surface over the `letterbox` pipeline: a
//! single webhook route the mail relay delivers to, plus a health check.
//! Request authentication is the pipeline's HMAC signature verification,
//! not a bearer token; the relay retries on any non-2xx response, which is
//! why classified skips are acknowledged with 200.
//!
//! # Architecture
//!
//! - **AppState**: Shared application state (pipeline with its store)
//! - **Routes**: Webhook handler and health check
//! - **ApiError**: Pipeline error to HTTP response mapping

mod error;
mod routes;
mod state;

pub use self::error::ApiError;
pub use self::routes::router;
pub use self::state::{AppState, Config};
