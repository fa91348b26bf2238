//! Default configuration constants.

/// Local development API address used when nothing else is configured.
pub(super) const DEFAULT_API_BASE_URL: &str = "http://localhost:6001";
/// Default timeout for API requests.
pub(super) const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
/// Login endpoint path relative to the base URL.
pub(super) const DEFAULT_LOGIN_PATH: &str = "/api/Auth/login";
/// Refresh endpoint path relative to the base URL.
pub(super) const DEFAULT_REFRESH_PATH: &str = "/api/Auth/refresh";
/// Directory under the config root holding config and credentials.
pub(super) const APP_DIR_NAME: &str = "kwsession";
/// Config file name, looked up locally then under the config root.
pub(super) const CONFIG_FILE_NAME: &str = "kwsession.toml";
/// Credential file name under the config root.
pub(super) const STORE_FILE_NAME: &str = "session.json";
