//! Shared HTTP plumbing for the auth endpoints and the request gateway.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Build an HTTP client with timeout applied.
pub(crate) fn build_http_client(timeout: Duration) -> reqwest::Client {
    // Fall back to reqwest defaults if builder creation fails for any reason.
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("kwsession/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// A fully read response: status, raw text and the JSON body when it parsed.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub(crate) status: u16,
    pub(crate) text: String,
    pub(crate) json: Option<Value>,
}

impl Reply {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(Self::from_parts(status, text))
    }

    pub(crate) fn from_parts(status: u16, text: String) -> Self {
        let json = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str(&text).ok()
        };
        Self { status, text, json }
    }

    pub(crate) fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First non-empty string among `fields` in a JSON object body.
    pub(crate) fn message(&self, fields: &[&str]) -> Option<String> {
        let object = self.json.as_ref()?.as_object()?;
        fields.iter().find_map(|field| {
            object
                .get(*field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string)
        })
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self) -> Result<T, String> {
        match &self.json {
            Some(value) => serde_json::from_value(value.clone()).map_err(|err| err.to_string()),
            None => Err("response body is not JSON".to_string()),
        }
    }
}
