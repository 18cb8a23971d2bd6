//! Transport for the remote-debugging protocol.
//!
//! - target list: `GET <endpoint>/json`
//! - commands: one short-lived WebSocket per command; send
//!   `{id, method, params}`, skip events until the message carrying the same
//!   `id` arrives, then close.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tungstenite::protocol::Message;

use super::DevToolsError;
use super::target::DevToolsTarget;

#[derive(Debug, Serialize)]
struct Command<'a> {
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ReplyError>,
}

#[derive(Debug, Deserialize)]
struct ReplyError {
    #[serde(default)]
    message: String,
}

/// Fetch the current target list.
pub async fn fetch_targets(
    http: &reqwest::Client,
    endpoint: &str,
) -> Result<Vec<DevToolsTarget>, DevToolsError> {
    let url = format!("{endpoint}/json");
    let fetch = |source| DevToolsError::Fetch {
        url: url.clone(),
        source,
    };

    http.get(&url)
        .send()
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(fetch)?
        .json()
        .await
        .map_err(fetch)
}

/// Send one command and wait for its reply, all within `timeout`.
pub async fn send_command(
    debugger_url: &str,
    id: u64,
    method: &str,
    params: Value,
    timeout: Duration,
) -> Result<Value, DevToolsError> {
    tokio::time::timeout(timeout, exchange(debugger_url, id, method, &params))
        .await
        .map_err(|_| DevToolsError::Timeout {
            method: method.to_string(),
            ms: timeout.as_millis() as u64,
        })?
}

async fn exchange(
    debugger_url: &str,
    id: u64,
    method: &str,
    params: &Value,
) -> Result<Value, DevToolsError> {
    let socket = |source| DevToolsError::Socket {
        url: debugger_url.to_string(),
        source,
    };

    let (mut ws, _) = tokio_tungstenite::connect_async(debugger_url)
        .await
        .map_err(socket)?;

    let command = serde_json::to_string(&Command { id, method, params })?;
    crate::debug!("devtools"; "-> {}", command);
    ws.send(Message::text(command)).await.map_err(socket)?;

    while let Some(msg) = ws.next().await {
        let text = match msg.map_err(socket)? {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        // Events have no id; replies to other commands have a different one
        let reply: Reply = serde_json::from_str(text.as_str())?;
        if reply.id != Some(id) {
            continue;
        }

        let _ = ws.close(None).await;
        return match reply.error {
            Some(error) => Err(DevToolsError::Command {
                method: method.to_string(),
                message: error.message,
            }),
            None => Ok(reply.result.unwrap_or(Value::Null)),
        };
    }

    Err(DevToolsError::Closed(method.to_string()))
}
