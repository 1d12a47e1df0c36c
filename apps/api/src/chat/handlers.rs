//! Axum route handler for follow-up questions.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::advisor::send_follow_up;
use crate::errors::AppError;
use crate::models::chat::ChatMessage;
use crate::pipeline::handlers::find_session;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: Option<ChatMessage>,
    pub messages: Vec<ChatMessage>,
}

/// POST /api/v1/sessions/:id/chat
///
/// A failed or timed-out model call still returns 200: the transcript gets the apology.
/// `reply` is `None` only when the estimate was reset while the call was in flight.
pub async fn handle_chat(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let shared = find_session(&state, id).await?;
    let ticket = shared.lock().await.begin_chat(&request.message)?;

    // Detached so a dropped connection cannot leave the exchange pending.
    let model = state.model.clone();
    let deadline = state.config.chat_timeout();
    let exchange = tokio::spawn(async move {
        let call = send_follow_up(
            model.as_ref(),
            &ticket.history,
            &ticket.question,
            &ticket.context,
        );
        let outcome = match tokio::time::timeout(deadline, call).await {
            Ok(answer) => answer.map_err(|e| e.to_string()),
            Err(_) => Err(format!("Chat timed out after {}s", deadline.as_secs())),
        };

        let mut session = shared.lock().await;
        let reply = session.finish_chat(&ticket, outcome);
        ChatResponse {
            reply,
            messages: session.messages().to_vec(),
        }
    });

    let response = exchange
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Chat task failed: {e}")))?;
    Ok(Json(response))
}
