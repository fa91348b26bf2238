//! Environment overrides.
//!
//! Canonical `KW_*` variables take precedence. `VITE_API_BASE_URL` is accepted
//! as an alias so the dashboard's existing `.env` files keep working.

use crate::error::ConfigError;

use super::Config;

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(url) = env_with_legacy(env_lookup, "KW_API_BASE_URL", "VITE_API_BASE_URL") {
        config.api.base_url = url;
    }
    if let Some(timeout) = non_empty(env_lookup, "KW_API_TIMEOUT_SECS") {
        // Clamp to at least 1 second to avoid "no-timeout" accidental behavior.
        let parsed = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "invalid KW_API_TIMEOUT_SECS value `{timeout}`: expected positive integer seconds"
            ))
        })?;
        config.api.timeout_secs = parsed.max(1);
    }
    if let Some(path) = non_empty(env_lookup, "KW_STORE_PATH") {
        config.store.path = Some(path.into());
    }
    Ok(())
}

/// Resolve a value from canonical env var or, if absent, its legacy alias.
pub(super) fn env_with_legacy<FEnv>(
    env_lookup: &FEnv,
    canonical: &str,
    legacy: &str,
) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    non_empty(env_lookup, canonical).or_else(|| non_empty(env_lookup, legacy))
}

fn non_empty<FEnv>(env_lookup: &FEnv, name: &str) -> Option<String>
where
    FEnv: Fn(&str) -> Option<String>,
{
    env_lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
