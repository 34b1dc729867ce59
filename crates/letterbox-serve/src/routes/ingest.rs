//! The inbound-email webhook handler.

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde_json::json;

use letterbox::{IngestResult, RawRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Entry point for every method on the webhook route.
///
/// The relay retries deliveries on non-2xx responses, so classified skips
/// are acknowledged with 200 and only genuine failures surface as errors.
pub async fn handle(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match method {
        Method::POST => ingest(state, headers, body).await,
        // CORS headers come from the middleware layer.
        Method::OPTIONS => StatusCode::OK.into_response(),
        _ => (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({ "error": "Method not allowed" })),
        )
            .into_response(),
    }
}

async fn ingest(state: AppState, headers: HeaderMap, body: Bytes) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let request = RawRequest { content_type, body };

    match state.pipeline.ingest(request).await {
        Ok(IngestResult::Created(stored)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "data": stored })),
        )
            .into_response(),

        Ok(IngestResult::Skipped { reason, message }) => {
            let mut data = json!({ "skipped": true, "reason": reason.as_str() });
            if let Some(ref m) = message {
                data["message"] = json!(m);
            }
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "skipped": true,
                    "skipReason": reason.as_str(),
                    "data": data,
                })),
            )
                .into_response()
        }

        Err(err) => ApiError::from(err).into_response(),
    }
}
