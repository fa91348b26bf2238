//! Configuration loading from TOML files and environment variables.
//!
//! Config is loaded in this order of precedence (highest wins):
//! 1. Environment variables (`KW_API_BASE_URL`, `KW_API_TIMEOUT_SECS`,
//!    `KW_STORE_PATH`), with `VITE_API_BASE_URL` accepted as an alias.
//! 2. TOML file specified via `--config`
//! 3. `./kwsession.toml` in the current directory
//! 4. `$XDG_CONFIG_HOME/kwsession/kwsession.toml` (or `~/.config/...`)
//! 5. Built-in defaults
//!
//! The base URL is resolved once at startup and never re-read.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

mod defaults;
mod env;
mod types;

use defaults::{APP_DIR_NAME, CONFIG_FILE_NAME, STORE_FILE_NAME};
use env::apply_runtime_env_overrides;
pub use types::{ApiConfig, Config, StoreBackendKind, StoreConfig};

/// Where the active configuration text came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Local,
    Global(PathBuf),
    BuiltInDefaults,
}

/// Load configuration from disk and environment.
///
/// `path_override` is an explicit config file path (from `--config`).
pub fn load_config(path_override: Option<&str>) -> Result<Config, ConfigError> {
    Ok(load_config_from_sources(
        path_override,
        |path| std::fs::read_to_string(path),
        |name| std::env::var(name).ok(),
        config_root_dir,
    )?
    .0)
}

fn load_config_from_sources<FRead, FEnv, FRoot>(
    path_override: Option<&str>,
    read_file: FRead,
    env_lookup: FEnv,
    config_root: FRoot,
) -> Result<(Config, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FEnv: Fn(&str) -> Option<String>,
    FRoot: Fn() -> Option<PathBuf>,
{
    let (text, source) = read_config_text_with_sources(path_override, &read_file, &config_root)?;
    let mut config: Config = toml::from_str(&text)?;
    apply_runtime_env_overrides(&mut config, &env_lookup)?;
    validate(&config)?;
    tracing::debug!(?source, base_url = %config.api.base_url, "configuration loaded");
    Ok((config, source))
}

fn read_config_text_with_sources<FRead, FRoot>(
    path_override: Option<&str>,
    read_file: &FRead,
    config_root: &FRoot,
) -> Result<(String, ConfigSource), ConfigError>
where
    FRead: Fn(&Path) -> Result<String, std::io::Error>,
    FRoot: Fn() -> Option<PathBuf>,
{
    if let Some(p) = path_override {
        let path = PathBuf::from(p);
        let text = read_file(&path)?;
        return Ok((text, ConfigSource::Explicit(path)));
    }

    if let Ok(text) = read_file(Path::new(CONFIG_FILE_NAME)) {
        return Ok((text, ConfigSource::Local));
    }
    if let Some(dir) = config_root() {
        let global = dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME);
        if let Ok(text) = read_file(&global) {
            return Ok((text, ConfigSource::Global(global)));
        }
    }

    Ok((String::new(), ConfigSource::BuiltInDefaults))
}

/// Apply a `--base-url` flag on top of a loaded config and re-validate.
pub fn override_base_url(config: &mut Config, base_url: &str) -> Result<(), ConfigError> {
    config.api.base_url = base_url.trim().to_string();
    validate(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let base = config.api.base_url.trim();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(ConfigError::Invalid(format!(
            "api.base_url `{base}` must start with http:// or https://"
        )));
    }
    if config.api.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "api.timeout_secs must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the platform config root (`$XDG_CONFIG_HOME` or `~/.config`).
pub fn config_root_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("XDG_CONFIG_HOME") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::home_dir()
        .map(|home| home.join(".config"))
        .or_else(dirs::config_dir)
}

/// Credential file path: explicit `store.path`, else under the config root.
pub fn resolve_store_path(config: &StoreConfig) -> Option<PathBuf> {
    if let Some(path) = &config.path {
        return Some(path.clone());
    }
    config_root_dir().map(|dir| dir.join(APP_DIR_NAME).join(STORE_FILE_NAME))
}
