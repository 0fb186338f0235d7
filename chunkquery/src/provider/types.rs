//! Shared provider types and response classification.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Address of the game server API when none is configured.
pub const DEFAULT_API_SERVER: &str = "127.0.0.1:8090";

/// Failure of a single request to the game server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure: connect, timeout, or reading the body.
    #[error("could not connect to server: {0}")]
    Connection(String),

    /// The body is not JSON, or not the expected payload.
    #[error("could not parse response: {0}")]
    Parse(String),

    /// The server answered with an `error` object.
    #[error("server error: {0}")]
    Server(String),
}

impl FetchError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Connection(_))
    }
}

/// Position of a player as reported by the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerLocation {
    pub name: String,
    pub cx: i32,
    pub cz: i32,
    pub world: String,
}

/// Prefixes `http://` unless the server address already carries a scheme.
pub fn base_url(api_server: &str) -> String {
    let trimmed = api_server.trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Decodes a response body into `T`.
///
/// Non-JSON bodies are `Parse` errors, objects with an `error` field are
/// `Server` errors, and anything that does not deserialize into `T` is a
/// `Parse` error.
pub(crate) fn classify_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, FetchError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| FetchError::Parse(format!("response is not JSON: {}", e)))?;

    if let Some(error) = value.get("error") {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(FetchError::Server(message));
    }

    serde_json::from_value(value)
        .map_err(|e| FetchError::Parse(format!("unexpected payload: {}", e)))
}
