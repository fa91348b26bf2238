//! Interpretation of business-call replies.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SessionError;
use crate::http::Reply;

/// Body of a successful API call.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    /// Raw text for bodies that are empty or not JSON.
    Text(String),
}

impl ApiBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Deserialize the body; an empty body decodes as JSON `null`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, SessionError> {
        let value = match self {
            Self::Json(value) => value,
            Self::Text(text) if text.trim().is_empty() => Value::Null,
            Self::Text(text) => {
                return Err(SessionError::InvalidResponse(format!(
                    "expected JSON body, got `{}`",
                    truncate(&text, 80)
                )))
            }
        };
        serde_json::from_value(value).map_err(|err| SessionError::InvalidResponse(err.to_string()))
    }
}

/// Map a reply to the call's outcome. 401 handling happens before this.
pub(super) fn interpret(reply: Reply) -> Result<ApiBody, SessionError> {
    if !reply.is_success() {
        let message = reply
            .message(&["message", "error"])
            .unwrap_or_else(|| format!("Request failed ({})", reply.status));
        return Err(SessionError::Api {
            status: reply.status,
            message,
        });
    }
    Ok(match reply.json {
        Some(value) => ApiBody::Json(value),
        None => ApiBody::Text(reply.text),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
