//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use foldbatch::Settings;

const SETTINGS_ENV: &str = "FOLDBATCH_CONFIG";
const OUTPUT_DIR_ENV: &str = "FOLDBATCH_OUTPUT_DIR";
const PROFILE_DIR_ENV: &str = "FOLDBATCH_PROFILE_DIR";
const LOCAL_SETTINGS: &str = "foldbatch.json";

/// Resolve the settings file, if any: explicit path, then
/// `FOLDBATCH_CONFIG`, then `./foldbatch.json`.
pub fn resolve_settings_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(SETTINGS_ENV) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let local = PathBuf::from(LOCAL_SETTINGS);
    local.exists().then_some(local)
}

/// Load settings from the resolved file, or defaults when there is none.
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match resolve_settings_path(explicit) {
        Some(path) => {
            let settings = Settings::load(&path)
                .with_context(|| format!("invalid settings file {}", path.display()))?;
            tracing::info!("Settings: {}", path.display());
            Ok(settings)
        }
        None => Ok(Settings::default()),
    }
}

/// Resolve the download directory: explicit path, then
/// `FOLDBATCH_OUTPUT_DIR`, then `./downloads`.
pub fn resolve_output_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    match std::env::var(OUTPUT_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from("downloads"),
    }
}

/// Resolve the browser profile directory that keeps the signed-in session
/// between runs.
pub fn resolve_profile_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(dir) = std::env::var(PROFILE_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    resolve_default_profile_dir()
}

fn resolve_default_profile_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("foldbatch")
        .join("profile")
}
