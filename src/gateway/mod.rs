//! Authenticated request gateway.
//!
//! Every business call goes through [`Gateway`], which attaches the current
//! bearer token and recovers from an authorization failure with exactly one
//! refresh per call:
//! - `transport`: request dispatch.
//! - `body`: reply interpretation and error messages.

mod body;
mod transport;

pub use body::ApiBody;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::error::SessionError;
use crate::http::Reply;
use crate::session::SessionContext;

/// Dispatches API calls on behalf of the current session.
#[derive(Debug)]
pub struct Gateway {
    session: SessionContext,
    /// At most one refresh in flight; concurrent 401s wait for its outcome.
    refresh_gate: Mutex<()>,
}

impl Gateway {
    pub fn new(session: SessionContext) -> Self {
        Self {
            session,
            refresh_gate: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub async fn get(&self, path: &str) -> Result<ApiBody, SessionError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiBody, SessionError> {
        let body = encode_body(body)?;
        self.request(Method::POST, path, body.as_ref()).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiBody, SessionError> {
        let body = encode_body(body)?;
        self.request(Method::PUT, path, body.as_ref()).await
    }

    pub async fn delete(&self, path: &str) -> Result<ApiBody, SessionError> {
        self.request(Method::DELETE, path, None).await
    }

    /// `GET` and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SessionError> {
        self.get(path).await?.decode()
    }

    /// `POST` and deserialize the JSON body.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, SessionError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(path, Some(body)).await?.decode()
    }

    /// Issue one call, refreshing at most once.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<ApiBody, SessionError> {
        let url = self.session.api().url(path);

        // Capture the refresh token before the expiry check can clear it.
        let refresh_hint = self.session.store().read().refresh_token;
        let mut token = self.session.access_token();
        let mut refreshed = false;

        if token.is_none() && refresh_hint.is_some() {
            tracing::debug!(path, "access token expired; refreshing before dispatch");
            token = Some(self.refresh_once(None, refresh_hint.clone()).await?);
            refreshed = true;
        }

        let mut reply = self.dispatch(&url, &method, body, token.as_deref()).await?;

        if reply.status == 401 && !refreshed {
            tracing::debug!(path, "unauthorized; refreshing once and retrying");
            let renewed = self.refresh_once(token.as_deref(), refresh_hint).await?;
            reply = self.dispatch(&url, &method, body, Some(&renewed)).await?;
        }

        body::interpret(reply)
    }

    async fn dispatch(
        &self,
        url: &str,
        method: &Method,
        body: Option<&Value>,
        bearer: Option<&str>,
    ) -> Result<Reply, SessionError> {
        Ok(transport::dispatch(self.session.http(), url, method, body, bearer).await?)
    }

    /// Obtain a fresh access token, or end the session.
    ///
    /// `rejected` is the token the server just refused. When the stored token
    /// already differs, another call refreshed while this one waited and the
    /// stored token is reused.
    async fn refresh_once(
        &self,
        rejected: Option<&str>,
        refresh_hint: Option<String>,
    ) -> Result<String, SessionError> {
        let _gate = self.refresh_gate.lock().await;

        // Read before the expiry check below, which clears the whole store.
        let refresh_token = self.session.store().read().refresh_token.or(refresh_hint);
        if let Some(current) = self.session.access_token() {
            if rejected != Some(current.as_str()) {
                tracing::debug!("reusing token refreshed by a concurrent call");
                return Ok(current);
            }
        }

        let outcome = match refresh_token.as_deref() {
            Some(refresh_token) => self.session.refresh_with(refresh_token).await,
            None => Err(SessionError::NoRefreshToken),
        };

        match outcome {
            Ok(refreshed) => {
                let tokens = self
                    .session
                    .persist_refreshed_with(&refreshed, refresh_token)?;
                Ok(tokens.access_token().to_string())
            }
            Err(err) => {
                tracing::warn!(error = %err, "session refresh failed; signing out");
                self.session.store().clear();
                Err(SessionError::SessionExpired)
            }
        }
    }
}

fn encode_body<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<Value>, SessionError> {
    body.map(serde_json::to_value)
        .transpose()
        .map_err(|err| SessionError::InvalidRequest(err.to_string()))
}
