// src/config/env.rs
//! Environment-driven configuration (the scheduled single-shot setup).
//!
//! Only `DATE_TO_GO` is required; everything else has a default.

use super::{Config, ConfigForm, DateList, FieldValue, DEFAULT_HISTORY_FILE};
use crate::error::ConfigError;

pub const ENV_DATES: &str = "DATE_TO_GO";

const DEFAULTS: &[(&str, &str)] = &[
    ("PLACE_FROM", "SHA"),
    ("PLACE_TO", "JIQ"),
    ("FLIGHT_WAY", "OneWay"),
    ("PRICE_STEP", "50"),
    ("SLEEP_TIME", "600"),
    ("SMTP_SERVER", "smtp.qq.com"),
    ("SMTP_PORT", "465"),
    ("HISTORY_FILE", DEFAULT_HISTORY_FILE),
];

fn default_for(key: &str) -> Option<String> {
    DEFAULTS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.to_string())
}

/// Build a form from any key lookup. Missing keys fall back to `DEFAULTS`.
pub fn form_from_lookup<F>(lookup: F) -> ConfigForm
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).or_else(|| default_for(key));
    ConfigForm {
        dates: lookup(ENV_DATES).map(DateList::Csv),
        origin: get("PLACE_FROM"),
        destination: get("PLACE_TO"),
        flight_way: get("FLIGHT_WAY"),
        poll_interval_secs: get("SLEEP_TIME").map(FieldValue::Text),
        threshold: get("PRICE_STEP").map(FieldValue::Text),
        email_sender: lookup("EMAIL_SENDER"),
        email_password: lookup("EMAIL_PASSWORD"),
        email_receiver: lookup("EMAIL_RECEIVER"),
        smtp_server: get("SMTP_SERVER"),
        smtp_port: get("SMTP_PORT").map(FieldValue::Text),
        pushplus_token: lookup("PUSHPLUS_TOKEN"),
        history_file: get("HISTORY_FILE"),
    }
}

pub fn load_from_env() -> Result<Config, ConfigError> {
    let form = form_from_lookup(|k| std::env::var(k).ok());
    if form.dates.is_none() {
        return Err(ConfigError::Missing(ENV_DATES));
    }
    form.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_fill_everything_but_dates() {
        let vars: HashMap<&str, &str> = [("DATE_TO_GO", "20250101,20250102")].into();
        let cfg = form_from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .validate()
            .unwrap();
        assert_eq!(cfg.route.origin, "SHA");
        assert_eq!(cfg.route.destination, "JIQ");
        assert_eq!(cfg.threshold, 50);
        assert_eq!(cfg.poll_interval_secs, 600);
        assert!(cfg.notify.email.is_none());
    }

    #[test]
    fn bad_step_is_a_config_error() {
        let vars: HashMap<&str, &str> = [("DATE_TO_GO", "20250101"), ("PRICE_STEP", "-5")].into();
        let err = form_from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotPositive { field: "threshold", .. }));
    }
}
