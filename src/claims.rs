//! Best-effort claim extraction from identity tokens.
//!
//! The signature is NOT verified. Claims decoded here only drive client-side
//! display and view gating; the API re-authorizes every protected call, so
//! nothing in this module may be treated as a security boundary.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

const GROUPS_CLAIM: &str = "cognito:groups";
const USERNAME_CLAIM: &str = "cognito:username";
const FALLBACK_USERNAME_CLAIM: &str = "username";
const SUBJECT_CLAIM: &str = "sub";

/// Identity and role claims carried by an identity token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Claims {
    pub username: Option<String>,
    pub subject: Option<String>,
    pub roles: BTreeSet<String>,
}

impl Claims {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Decode the payload segment of `header.payload.signature`.
///
/// Returns `None` for any structural problem instead of failing.
pub fn decode_claims(token: &str) -> Option<Claims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return None;
    };

    let bytes = decode_segment(payload)?;
    let text = String::from_utf8(bytes).ok()?;
    let Value::Object(object) = serde_json::from_str::<Value>(&text).ok()? else {
        return None;
    };

    Some(Claims {
        username: string_claim(&object, USERNAME_CLAIM)
            .or_else(|| string_claim(&object, FALLBACK_USERNAME_CLAIM)),
        subject: string_claim(&object, SUBJECT_CLAIM),
        roles: role_claims(&object),
    })
}

/// Base64url decode tolerating optional `=` padding.
fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).ok()
}

fn string_claim(object: &Map<String, Value>, name: &str) -> Option<String> {
    object
        .get(name)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn role_claims(object: &Map<String, Value>) -> BTreeSet<String> {
    match object.get(GROUPS_CLAIM) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}
