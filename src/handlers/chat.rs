use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use chrono_tz::Tz;
use serde::Deserialize;
use tokio_stream::StreamExt;

use super::{ApiError, AppState};
use crate::conversation::{UiMessage, apply_edit, to_model_messages};
use crate::error::TravelAssistantError;
use crate::tools::ToolContext;

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub messages: Vec<UiMessage>,
    /// IANA zone from the browser, e.g. "Asia/Shanghai"
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub edit: Option<EditRequest>,
}

fn request_timezone(requested: Option<&str>, fallback: Tz) -> Tz {
    match requested.map(str::trim).filter(|z| !z.is_empty()) {
        Some(name) => name.parse().unwrap_or_else(|_| {
            tracing::warn!(timezone = name, "Unknown client timezone, using default");
            fallback
        }),
        None => fallback,
    }
}

/// `POST /api/chat`: JSON error before the stream starts, SSE events after
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            return ApiError(TravelAssistantError::Validation(rejection.body_text())).into_response();
        }
    };

    if !state.llm_configured {
        return ApiError(TravelAssistantError::Config(
            "GOOGLE_GENERATIVE_AI_API_KEY is not configured".to_string(),
        ))
        .into_response();
    }

    let timezone = request_timezone(body.timezone.as_deref(), state.default_timezone);
    let messages = match body.edit {
        Some(edit) => match apply_edit(body.messages, edit.index, &edit.text) {
            Ok(messages) => messages,
            Err(e) => return ApiError(e).into_response(),
        },
        None => body.messages,
    };
    tracing::info!(
        messages = messages.len(),
        timezone = %timezone.name(),
        "Chat request"
    );

    let history = to_model_messages(&messages);
    match state
        .service
        .clone()
        .stream(history, ToolContext::new(timezone))
        .await
    {
        Ok(events) => {
            let stream = events.map(|event| Event::default().json_data(event));
            Sse::new(stream)
                .keep_alive(KeepAlive::default())
                .into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}
