//! Inbound messaging-platform webhook.
//!
//! The platform is configured to send updates here with a shared secret in
//! the `X-Telegram-Bot-Api-Secret-Token` header. Delivery back to the chat
//! happens in-band: the reply body carries the `sendMessage` call.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics::counter;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::metrics::WEBHOOK_UPDATES;
use crate::server::AppState;

const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

const WELCOME: &str =
    "Welcome to the number registry bot. Send a command to query the inventory.";

/// An inbound update. Only the message envelope is read; everything else the
/// platform sends is ignored.
#[derive(Debug, Deserialize)]
pub struct Update {
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

/// In-band reply: the platform executes this as a bot API call.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(Deserialize))]
pub struct Reply {
    method: &'static str,
    chat_id: i64,
    text: String,
}

/// Receive one update.
///
/// POST /webhook
pub(crate) async fn receive_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> ApiResult<Response> {
    let expected = state
        .config
        .webhook_secret
        .as_ref()
        .ok_or_else(|| ApiError::not_found("webhook not configured"))?;
    let supplied = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if supplied != expected.expose().as_str() {
        counter!(WEBHOOK_UPDATES, "outcome" => "rejected").increment(1);
        return Err(ApiError::forbidden("webhook secret mismatch"));
    }

    counter!(WEBHOOK_UPDATES, "outcome" => "accepted").increment(1);

    let Some(message) = update.message else {
        return Ok(StatusCode::OK.into_response());
    };
    let text = message.text.unwrap_or_default();
    let reply_text = command_reply(&text);
    tracing::info!(chat_id = message.chat.id, command = %text, "webhook update");

    Ok(Json(Reply {
        method: "sendMessage",
        chat_id: message.chat.id,
        text: reply_text,
    })
    .into_response())
}

fn command_reply(text: &str) -> String {
    let command = text.split_whitespace().next().unwrap_or_default();
    match command {
        "/start" => WELCOME.to_string(),
        "" => "Send /start to begin.".to_string(),
        other => format!("Command '{other}' is not yet implemented."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_gets_welcome() {
        assert_eq!(command_reply("/start"), WELCOME);
    }

    #[test]
    fn unknown_commands_are_acknowledged() {
        assert_eq!(
            command_reply("/inventory 98"),
            "Command '/inventory' is not yet implemented."
        );
    }
}
