//! Chat endpoint: runs the loop for a session and streams its events as
//! newline-delimited JSON.

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use plancanvas_agent::{EVENT_CHANNEL_CAPACITY, LoopEvent, NDJSON_CONTENT_TYPE, PlanExecuteAgent};
use plancanvas_core::canvas::{CanvasRepository, CanvasState};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::SharedState;

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Session id; requests sharing it share a canvas.
    #[serde(default = "default_session_id")]
    pub id: String,
}

fn default_session_id() -> String {
    "default".into()
}

impl ChatRequest {
    /// The most recent non-blank user message.
    pub fn goal(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.role == "user")
            .map(|m| m.content.trim())
            .find(|c| !c.is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// `POST /api/chat`
///
/// The loop runs on its own task while holding the session's run lock; the
/// response body drains its events at the client's pace.
pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let Some(goal) = payload.goal().map(str::to_string) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "request must contain a non-empty user message",
        ));
    };

    let session = state.sessions.get_or_create(&payload.id).await;
    let agent = PlanExecuteAgent::from_config(
        &state.config,
        state.provider.clone(),
        session.canvas.clone(),
    );

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let session_id = payload.id;
    tokio::spawn(async move {
        let _running = session.run_lock.clone().lock_owned().await;
        info!(session = %session_id, goal_len = goal.len(), "chat run starting");
        let _ = agent.forward(&goal, &tx).await;
        state.sessions.touch(&session_id).await;
    });

    let lines = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(encode_line(&event)));
    Ok((
        [(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)],
        Body::from_stream(lines),
    )
        .into_response())
}

fn encode_line(event: &LoopEvent) -> String {
    event.to_ndjson().unwrap_or_else(|e| {
        error!(error = %e, event = event.event_type(), "failed to encode event");
        let mut line = serde_json::json!({"type": "error", "message": e.to_string()}).to_string();
        line.push('\n');
        line
    })
}

/// `GET /api/sessions/{id}/canvas`
pub async fn session_canvas_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<CanvasState>, ApiError> {
    let canvas = state
        .sessions
        .canvas(&id)
        .await
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("unknown session '{id}'")))?;
    let snapshot = canvas
        .get_state()
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(snapshot))
}

/// `DELETE /api/sessions/{id}`
pub async fn delete_session_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.sessions.remove(&id).await {
        info!(session = %id, "session deleted");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
