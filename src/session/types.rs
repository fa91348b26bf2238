//! Wire types for the authentication endpoints.

use serde::{Deserialize, Serialize};

/// Body sent to the login endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LoginRequest<'a> {
    pub(crate) username_or_email: &'a str,
    pub(crate) password: &'a str,
}

/// Body sent to the refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RefreshRequest<'a> {
    pub(crate) refresh_token: &'a str,
}

/// Successful login response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(deserialize_with = "deserialize_seconds")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
}

/// Successful refresh response. The refresh token is normally not reissued.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
    pub id_token: String,
    #[serde(deserialize_with = "deserialize_seconds")]
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Deserialize a lifetime encoded as a number or numeric string.
fn deserialize_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(num) => num
            .as_i64()
            .or_else(|| num.as_f64().map(|secs| secs as i64))
            .ok_or_else(|| serde::de::Error::custom("expiresIn must be an integer")),
        serde_json::Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|err| serde::de::Error::custom(format!("invalid expiresIn: {err}"))),
        _ => Err(serde::de::Error::custom("expiresIn must be string or number")),
    }
}
