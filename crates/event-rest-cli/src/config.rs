//! Configuration file resolution.

use std::path::PathBuf;

/// Environment variable consulted when no `--config` flag is given.
pub const CONFIG_ENV: &str = "EVENT_REST_CONFIG";
/// File looked up in the working directory as a last resort.
pub const DEFAULT_CONFIG_FILE: &str = "event-rest.json";

/// Resolve the filter configuration path: flag, then env var, then cwd.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    PathBuf::from(DEFAULT_CONFIG_FILE)
}
