//! Session lifecycle: login, expiry tracking, refresh and role checks.
//!
//! [`SessionManager`] is the single source of truth for "is there a usable
//! session right now". It keeps no token copies of its own; every question
//! is answered by re-reading the [`CredentialStore`].

mod types;

pub use types::{RefreshedTokens, TokenGrant};

use std::sync::Arc;
use std::time::Duration;

use crate::claims::{decode_claims, Claims};
use crate::clock::{Clock, SystemClock};
use crate::config::ApiConfig;
use crate::error::SessionError;
use crate::http::{build_http_client, Reply};
use crate::store::{CredentialStore, TokenSet};
use types::{LoginRequest, RefreshRequest};

const LOGIN_FAILED_FALLBACK: &str = "Login failed.";
const REFRESH_FAILED_FALLBACK: &str = "Refresh failed";

/// Shared handle passed explicitly to the gateway, guards and timers.
pub type SessionContext = Arc<SessionManager>;

/// Owns the login/refresh protocols and the notion of an active session.
pub struct SessionManager {
    http: reqwest::Client,
    api: ApiConfig,
    store: CredentialStore,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.api.base_url)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Build a manager using the system clock.
    pub fn new(api: &ApiConfig, store: CredentialStore) -> Self {
        Self::with_clock(api, store, Arc::new(SystemClock))
    }

    pub fn with_clock(api: &ApiConfig, store: CredentialStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            http: build_http_client(Duration::from_secs(api.timeout_secs.max(1))),
            api: api.clone(),
            store,
            clock,
        }
    }

    /// Wrap in the shared context handle.
    pub fn into_context(self) -> SessionContext {
        Arc::new(self)
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Exchange an identifier and secret for a token grant.
    ///
    /// The grant is not persisted; call [`SessionManager::establish`].
    pub async fn login(&self, identifier: &str, secret: &str) -> Result<TokenGrant, SessionError> {
        let response = self
            .http
            .post(self.api.url(&self.api.login_path))
            .json(&LoginRequest {
                username_or_email: identifier,
                password: secret,
            })
            .send()
            .await?;
        let reply = Reply::read(response).await?;

        if !reply.is_success() {
            tracing::info!(status = reply.status, "login rejected");
            let message = reply
                .message(&["message", "error"])
                .unwrap_or_else(|| LOGIN_FAILED_FALLBACK.to_string());
            return Err(SessionError::AuthenticationFailed(message));
        }

        let grant: TokenGrant = reply
            .decode()
            .map_err(|err| SessionError::InvalidResponse(format!("login response: {err}")))?;
        tracing::info!(expires_in = grant.expires_in, "login succeeded");
        Ok(grant)
    }

    /// Persist a login grant as the current session.
    pub fn establish(&self, grant: &TokenGrant) -> Result<TokenSet, SessionError> {
        let tokens = TokenSet::issue(
            grant.access_token.as_str(),
            grant.id_token.as_str(),
            grant.refresh_token.clone(),
            grant.expires_in,
            self.clock.now_epoch_ms(),
        );
        self.store.save(&tokens)?;
        Ok(tokens)
    }

    /// True iff an access token is stored and its watermark has not passed.
    ///
    /// An expired session is cleared before returning `false`.
    pub fn is_session_active(&self) -> bool {
        self.access_token().is_some()
    }

    /// The stored access token when the session is active.
    pub fn access_token(&self) -> Option<String> {
        let stored = self.store.read();
        let token = stored.access_token?;
        match stored.expires_at_epoch_ms {
            Some(watermark) if self.clock.now_epoch_ms() >= watermark => {
                tracing::info!("session passed its expiry watermark; clearing");
                self.store.clear();
                None
            }
            _ => Some(token),
        }
    }

    /// Milliseconds until the watermark, floored at zero.
    pub fn ms_until_expiry(&self) -> Option<i64> {
        let watermark = self.store.read().expires_at_epoch_ms?;
        Some(watermark.saturating_sub(self.clock.now_epoch_ms()).max(0))
    }

    /// Mint new short-lived credentials from the stored refresh token.
    ///
    /// Nothing is persisted; see [`SessionManager::persist_refreshed`].
    pub async fn refresh(&self) -> Result<RefreshedTokens, SessionError> {
        let Some(refresh_token) = self.store.read().refresh_token else {
            return Err(SessionError::NoRefreshToken);
        };
        self.refresh_with(&refresh_token).await
    }

    /// Refresh using an explicit refresh token.
    pub(crate) async fn refresh_with(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshedTokens, SessionError> {
        let response = self
            .http
            .post(self.api.url(&self.api.refresh_path))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        let reply = Reply::read(response).await?;

        if !reply.is_success() {
            tracing::info!(status = reply.status, "refresh rejected");
            let message = reply
                .message(&["message"])
                .unwrap_or_else(|| REFRESH_FAILED_FALLBACK.to_string());
            return Err(SessionError::RefreshFailed(message));
        }

        let refreshed: RefreshedTokens = reply
            .decode()
            .map_err(|err| SessionError::RefreshFailed(format!("invalid refresh response: {err}")))?;
        tracing::debug!(expires_in = refreshed.expires_in, "refresh succeeded");
        Ok(refreshed)
    }

    /// Persist refreshed credentials, keeping the stored refresh token unless
    /// the server issued a new one.
    pub fn persist_refreshed(&self, refreshed: &RefreshedTokens) -> Result<TokenSet, SessionError> {
        let current = self.store.read().refresh_token;
        self.persist_refreshed_with(refreshed, current)
    }

    /// Persist refreshed credentials with `used_refresh_token` as the
    /// fallback when the response does not reissue one.
    pub(crate) fn persist_refreshed_with(
        &self,
        refreshed: &RefreshedTokens,
        used_refresh_token: Option<String>,
    ) -> Result<TokenSet, SessionError> {
        let refresh_token = refreshed
            .refresh_token
            .clone()
            .filter(|token| !token.is_empty())
            .or(used_refresh_token);
        let tokens = TokenSet::issue(
            refreshed.access_token.as_str(),
            refreshed.id_token.as_str(),
            refresh_token,
            refreshed.expires_in,
            self.clock.now_epoch_ms(),
        );
        self.store.save(&tokens)?;
        Ok(tokens)
    }

    /// Claims of the stored identity token, if it decodes.
    pub fn claims(&self) -> Option<Claims> {
        decode_claims(&self.store.read().identity_token?)
    }

    /// Client-side role check; a UX gate, not an authorization decision.
    pub fn has_role(&self, role: &str) -> bool {
        self.claims().is_some_and(|claims| claims.has_role(role))
    }

    /// Drop the session.
    pub fn logout(&self) {
        tracing::info!("logging out");
        self.store.clear();
    }
}
