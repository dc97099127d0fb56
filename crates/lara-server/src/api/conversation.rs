use crate::api::{ApiResponse, error::ApiError, state::AppState};
use crate::auth::AuthUser;
use axum::{Json, extract::State};
use lara_ai::AiError;
use lara_core::models::{Conversation, Turn};
use lara_core::session::SubmitRejected;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: String,
}

// GET /api/conversation
pub async fn get_conversation(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Conversation>>, ApiError> {
    let session = state.core.sessions.get_or_open(&user.user_id).await?;
    Ok(Json(ApiResponse::ok(session.snapshot())))
}

// POST /api/conversation/messages
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<ApiResponse<Turn>>, ApiError> {
    let session = state.core.sessions.get_or_open(&user.user_id).await?;

    let response = match session.submit(&request.text).await {
        Ok(reply) => ApiResponse::ok(reply),
        Err(SubmitRejected::Empty) => {
            ApiResponse::error(AiError::Validation("empty message".to_string()).diagnostic())
        }
        Err(rejected @ SubmitRejected::Busy) => ApiResponse::error(rejected.to_string()),
    };
    Ok(Json(response))
}

// DELETE /api/conversation/session
pub async fn close_session(
    State(state): State<AppState>,
    user: AuthUser,
) -> Json<ApiResponse<()>> {
    if state.core.sessions.close(&user.user_id).await {
        Json(ApiResponse::message("Session closed"))
    } else {
        Json(ApiResponse::message("No active session"))
    }
}
