//! Unified error types for the session core.

use std::fmt;

/// User-facing message for a session that could not be revived.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Errors raised while persisting credentials.
///
/// Reads never fail; only writes surface these.
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Invalid(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io: {err}"),
            Self::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

/// Errors surfaced by login, refresh and authenticated API calls.
#[derive(Debug)]
pub enum SessionError {
    /// The login endpoint rejected the credentials.
    AuthenticationFailed(String),
    /// A refresh was attempted with no refresh token on file.
    NoRefreshToken,
    /// The refresh endpoint rejected the refresh token.
    RefreshFailed(String),
    /// A 401 could not be recovered by refreshing; the store was cleared.
    SessionExpired,
    /// Any other non-2xx business response.
    Api { status: u16, message: String },
    /// Network / reqwest-level error.
    Http(reqwest::Error),
    /// A request body could not be serialized.
    InvalidRequest(String),
    /// A success response whose body could not be decoded.
    InvalidResponse(String),
    /// Persisting credentials failed.
    Store(StoreError),
}

impl SessionError {
    /// HTTP status carried by this error, when it came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// True when the failure invalidates the current session and the user
    /// must sign in again.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            Self::NoRefreshToken | Self::RefreshFailed(_) | Self::SessionExpired
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthenticationFailed(msg) => write!(f, "{msg}"),
            Self::NoRefreshToken => write!(f, "No refresh token"),
            Self::RefreshFailed(msg) => write!(f, "{msg}"),
            Self::SessionExpired => write!(f, "{SESSION_EXPIRED_MESSAGE}"),
            Self::Api { message, .. } => write!(f, "{message}"),
            Self::Http(err) => write!(f, "http: {err}"),
            Self::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
            Self::InvalidResponse(msg) => write!(f, "invalid response: {msg}"),
            Self::Store(err) => write!(f, "credential store: {err}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<reqwest::Error> for SessionError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}
