//! Credential persistence.
//!
//! The store is the only place that knows the persisted key names. It holds
//! at most one [`TokenSet`] and replaces or clears it as a unit.

mod backend;
mod crypto;

pub use backend::{BatchEntry, FileBackend, KeyValueBackend, MemoryBackend};

use std::sync::Arc;

use crate::error::StoreError;

const ACCESS_TOKEN_KEY: &str = "kw_accessToken";
const ID_TOKEN_KEY: &str = "kw_idToken";
const REFRESH_TOKEN_KEY: &str = "kw_refreshToken";
const EXPIRES_AT_KEY: &str = "kw_expiresAt";

/// Subtracted from the server-reported lifetime so in-flight requests do not
/// race a boundary expiry.
pub const EXPIRY_SAFETY_MARGIN_MS: i64 = 30_000;

/// A complete credential bundle.
///
/// The expiry watermark is always derived in [`TokenSet::issue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSet {
    access_token: String,
    identity_token: String,
    refresh_token: Option<String>,
    expires_at_epoch_ms: i64,
}

impl TokenSet {
    /// Build a token set from a server grant with `ttl_secs` lifetime, as
    /// seen at `now_ms`.
    pub fn issue(
        access_token: impl Into<String>,
        identity_token: impl Into<String>,
        refresh_token: Option<String>,
        ttl_secs: i64,
        now_ms: i64,
    ) -> Self {
        let expires_at_epoch_ms = now_ms
            .saturating_add(ttl_secs.saturating_mul(1000))
            .saturating_sub(EXPIRY_SAFETY_MARGIN_MS);
        Self {
            access_token: access_token.into(),
            identity_token: identity_token.into(),
            refresh_token: refresh_token.filter(|token| !token.is_empty()),
            expires_at_epoch_ms,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn identity_token(&self) -> &str {
        &self.identity_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at_epoch_ms(&self) -> i64 {
        self.expires_at_epoch_ms
    }
}

/// Field-by-field view of whatever is currently stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub identity_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at_epoch_ms: Option<i64>,
}

impl StoredCredentials {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.identity_token.is_none()
            && self.refresh_token.is_none()
            && self.expires_at_epoch_ms.is_none()
    }
}

/// Handle to the persisted session namespace.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueBackend>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Replace the stored token set.
    ///
    /// A set without a refresh token removes any previously stored one.
    pub fn save(&self, tokens: &TokenSet) -> Result<(), StoreError> {
        let expires_at = tokens.expires_at_epoch_ms.to_string();
        self.backend.write_batch(&[
            (ACCESS_TOKEN_KEY, Some(tokens.access_token.as_str())),
            (ID_TOKEN_KEY, Some(tokens.identity_token.as_str())),
            (REFRESH_TOKEN_KEY, tokens.refresh_token.as_deref()),
            (EXPIRES_AT_KEY, Some(expires_at.as_str())),
        ])
    }

    /// Read the stored fields. Empty or unparsable values read as absent.
    pub fn read(&self) -> StoredCredentials {
        let mut entries = self.backend.load();
        let mut take = |key: &str| entries.remove(key).filter(|value| !value.is_empty());
        StoredCredentials {
            access_token: take(ACCESS_TOKEN_KEY),
            identity_token: take(ID_TOKEN_KEY),
            refresh_token: take(REFRESH_TOKEN_KEY),
            expires_at_epoch_ms: take(EXPIRES_AT_KEY)
                .and_then(|raw| raw.trim().parse::<i64>().ok()),
        }
    }

    /// Remove every session field in one batch.
    ///
    /// Failures are logged; callers treat the session as gone either way.
    pub fn clear(&self) {
        let result = self.backend.write_batch(&[
            (ACCESS_TOKEN_KEY, None),
            (ID_TOKEN_KEY, None),
            (REFRESH_TOKEN_KEY, None),
            (EXPIRES_AT_KEY, None),
        ]);
        match result {
            Ok(()) => tracing::debug!("credential store cleared"),
            Err(err) => tracing::warn!(error = %err, "failed to clear credential store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn issue_subtracts_safety_margin() {
        let tokens = TokenSet::issue("a", "i", None, 3600, NOW);
        assert_eq!(tokens.expires_at_epoch_ms(), NOW + 3_600_000 - 30_000);
    }

    #[test]
    fn issue_treats_empty_refresh_token_as_absent() {
        let tokens = TokenSet::issue("a", "i", Some(String::new()), 60, NOW);
        assert_eq!(tokens.refresh_token(), None);
    }

    #[test]
    fn save_then_read_round_trips_every_field() {
        let store = CredentialStore::in_memory();
        let tokens = TokenSet::issue("access", "id.token.sig", Some("refresh".into()), 600, NOW);
        store.save(&tokens).expect("save");

        let stored = store.read();
        assert_eq!(stored.access_token.as_deref(), Some("access"));
        assert_eq!(stored.identity_token.as_deref(), Some("id.token.sig"));
        assert_eq!(stored.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(stored.expires_at_epoch_ms, Some(tokens.expires_at_epoch_ms()));
    }

    #[test]
    fn save_without_refresh_token_drops_stale_one() {
        let store = CredentialStore::in_memory();
        store
            .save(&TokenSet::issue("a1", "i1", Some("r1".into()), 600, NOW))
            .expect("save");
        store
            .save(&TokenSet::issue("a2", "i2", None, 600, NOW))
            .expect("save");

        let stored = store.read();
        assert_eq!(stored.access_token.as_deref(), Some("a2"));
        assert_eq!(stored.refresh_token, None);
    }

    #[test]
    fn clear_then_read_is_all_absent() {
        let store = CredentialStore::in_memory();
        store
            .save(&TokenSet::issue("a", "i", Some("r".into()), 600, NOW))
            .expect("save");
        store.clear();
        assert!(store.read().is_empty());
    }

    #[test]
    fn unparsable_watermark_reads_as_absent() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .write_batch(&[(ACCESS_TOKEN_KEY, Some("a")), (EXPIRES_AT_KEY, Some("soon"))])
            .expect("seed");
        let store = CredentialStore::new(backend);
        let stored = store.read();
        assert_eq!(stored.access_token.as_deref(), Some("a"));
        assert_eq!(stored.expires_at_epoch_ms, None);
    }
}
