// src/config/file.rs
use std::fs;
use std::path::{Path, PathBuf};

use super::{Config, ConfigForm};
use crate::error::ConfigError;

pub const ENV_CONFIG_PATH: &str = "FLIGHT_ALERT_CONFIG";
pub const DEFAULT_TOML_PATH: &str = "config/flight_alert.toml";
pub const DEFAULT_JSON_PATH: &str = "config/flight_alert.json";

/// Load and validate a config file. Supports TOML or JSON formats.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    read_form(path)?.validate()
}

/// Read a config file without validating it.
pub fn read_form(path: &Path) -> Result<ConfigForm, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_form(&content, ext.as_str()).map_err(|reason| ConfigError::Parse {
        path: path.display().to_string(),
        reason,
    })
}

/// Locate a config file:
/// 1) `explicit` (e.g. `--config`)
/// 2) $FLIGHT_ALERT_CONFIG
/// 3) config/flight_alert.toml
/// 4) config/flight_alert.json
///
/// `Ok(None)` when nothing is configured and no default file exists.
pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(p) = explicit {
        return Ok(Some(p.to_path_buf()));
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(ConfigError::Read {
            path: pb.display().to_string(),
            reason: format!("{ENV_CONFIG_PATH} points to a non-existent path"),
        });
    }
    for p in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
    }
    Ok(None)
}

/// Where an edited form is saved: the file [`locate`] finds, else the default TOML path.
pub fn save_target(explicit: Option<&Path>) -> PathBuf {
    match locate(explicit) {
        Ok(Some(p)) => p,
        Ok(None) => PathBuf::from(DEFAULT_TOML_PATH),
        Err(e) => {
            tracing::warn!(error = %e, "config path unusable, saving to {DEFAULT_TOML_PATH}");
            PathBuf::from(DEFAULT_TOML_PATH)
        }
    }
}

/// Write a form so the next [`load_from`] on `path` sees it.
/// `.json` paths get JSON; everything else gets TOML.
pub fn save_form(path: &Path, form: &ConfigForm) -> Result<(), ConfigError> {
    let write_err = |reason: String| ConfigError::Write {
        path: path.display().to_string(),
        reason,
    };
    let is_json = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let body = if is_json {
        serde_json::to_string_pretty(form).map_err(|e| write_err(e.to_string()))?
    } else {
        toml::to_string_pretty(form).map_err(|e| write_err(e.to_string()))?
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| write_err(e.to_string()))?;
    }
    fs::write(path, body).map_err(|e| write_err(e.to_string()))
}

fn parse_form(s: &str, hint_ext: &str) -> Result<ConfigForm, String> {
    // Try TOML first if hinted or the content doesn't look like a JSON object.
    let try_toml = hint_ext == "toml" || !s.trim_start().starts_with('{');
    let mut errors = Vec::new();
    if try_toml {
        match toml::from_str::<ConfigForm>(s) {
            Ok(v) => return Ok(v),
            Err(e) => errors.push(format!("toml: {e}")),
        }
    }
    match serde_json::from_str::<ConfigForm>(s) {
        Ok(v) => return Ok(v),
        Err(e) => errors.push(format!("json: {e}")),
    }
    if !try_toml {
        match toml::from_str::<ConfigForm>(s) {
            Ok(v) => return Ok(v),
            Err(e) => errors.push(format!("toml: {e}")),
        }
    }
    Err(errors.join("; "))
}
