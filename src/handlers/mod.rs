//! HTTP surface: chat streaming endpoint, health check, optional bearer auth

pub mod chat;

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{SecondsFormat, Utc};
use chrono_tz::Tz;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::TravelAssistantError;
use crate::service::ChatService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ChatService>,
    pub default_timezone: Tz,
    /// False when no LLM API key is configured; chat requests then fail with 500
    pub llm_configured: bool,
}

/// Full application router: routes, CORS, and bearer auth when a token is set
pub fn router(state: AppState, bearer_token: Option<String>) -> Router {
    let mut router = Router::new()
        .route("/api/chat", post(chat::chat))
        .with_state(state);

    if let Some(expected) = bearer_token.filter(|t| !t.is_empty()) {
        router = router.layer(middleware::from_fn_with_state(
            Arc::new(expected),
            require_bearer,
        ));
    }

    router
        .route("/health", get(|| async { "ok" }))
        .layer(CorsLayer::permissive())
}

async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let headers: &HeaderMap = req.headers();
    let header_ok = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", expected.as_str()));

    // Clients that cannot set headers (EventSource) may pass access_token or token
    let query_ok = Query::<HashMap<String, String>>::try_from_uri(req.uri())
        .map(|Query(params)| {
            ["access_token", "token"]
                .iter()
                .any(|k| params.get(*k).is_some_and(|v| v == expected.as_str()))
        })
        .unwrap_or(false);

    if !header_ok && !query_ok {
        tracing::warn!(path = %req.uri().path(), "Rejected unauthorized request");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}

/// JSON error body returned before the event stream starts
pub struct ApiError(pub TravelAssistantError);

impl From<TravelAssistantError> for ApiError {
    fn from(e: TravelAssistantError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            TravelAssistantError::Timeout(_) => (
                StatusCode::REQUEST_TIMEOUT,
                "Connection timeout - Please check your network connection or proxy settings"
                    .to_string(),
            ),
            TravelAssistantError::Network(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Network error - Unable to connect to AI service".to_string(),
            ),
            TravelAssistantError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        tracing::error!(status = status.as_u16(), "Chat API error: {}", self.0);
        let body = json!({
            "error": message,
            "type": self.0.kind(),
            "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        (
            status,
            [(header::CACHE_CONTROL, "no-cache")],
            Json(body),
        )
            .into_response()
    }
}
