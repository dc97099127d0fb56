//! Stateless relay: forwards a client-held conversation upstream.
//!
//! Always answers `200 {reply}`. Upstream and configuration failures are
//! rendered as reply text so the client can show them in the thread.

use axum::{Json, body::Bytes, extract::State};
use lara_ai::{Message, Role};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::api::state::AppState;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RelayReply {
    pub reply: String,
}

/// Validated relay payload.
#[derive(Debug, Default, PartialEq)]
pub struct RelayInput {
    /// Ordered history without system messages.
    pub messages: Vec<Message>,
    pub summary: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum PayloadError {
    #[error("Request body is not valid JSON: {0}")]
    NotJson(String),
    #[error("Request body must be a JSON object")]
    NotObject,
}

#[derive(Debug, Deserialize)]
struct RelayMessage {
    role: Role,
    #[serde(deserialize_with = "null_as_empty")]
    content: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Validate a relay body.
///
/// Accepts `{messages: [...]}` or `{message: "..."}`, each with an optional
/// `summary`. A `messages` array with any malformed element is discarded
/// whole; the single `message` form is used only when no history survives.
pub fn parse_relay_body(body: &[u8]) -> Result<RelayInput, PayloadError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|error| PayloadError::NotJson(error.to_string()))?;
    let Value::Object(object) = value else {
        return Err(PayloadError::NotObject);
    };

    let mut messages = match object.get("messages") {
        Some(Value::Array(items)) => parse_history(items),
        _ => Vec::new(),
    };

    if messages.is_empty()
        && let Some(text) = object.get("message").and_then(Value::as_str)
        && !text.trim().is_empty()
    {
        messages.push(Message::user(text.trim()));
    }

    let summary = object
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(RelayInput { messages, summary })
}

fn parse_history(items: &[Value]) -> Vec<Message> {
    let parsed: Result<Vec<RelayMessage>, _> = items
        .iter()
        .map(|item| RelayMessage::deserialize(item))
        .collect();

    match parsed {
        Ok(history) => history
            .into_iter()
            .filter(|message| message.role != Role::System)
            .map(|message| Message {
                role: message.role,
                content: message.content,
            })
            .collect(),
        Err(error) => {
            tracing::debug!(error = %error, "Discarding malformed message history");
            Vec::new()
        }
    }
}

// POST /api/lara
pub async fn relay(State(state): State<AppState>, body: Bytes) -> Json<RelayReply> {
    let input = parse_relay_body(&body).unwrap_or_else(|error| {
        tracing::debug!(error = %error, "Invalid relay body, sending greeting");
        RelayInput::default()
    });

    let messages = state
        .core
        .policy
        .build_messages(&input.summary, input.messages);

    let reply = match state.core.llm.generate(messages).await {
        Ok(reply) => reply,
        Err(error) => {
            tracing::warn!(
                error_class = %error.class(),
                error = %error,
                "Relay completion failed"
            );
            error.diagnostic()
        }
    };

    Json(RelayReply { reply })
}
