// tests/config_load.rs
//
// Config files on disk, lookup order, and the environment-only setup.

use std::{env, fs};

use flight_price_alert::config::{env as env_config, file, FlightWay, DEFAULT_SMTP_PORT};
use flight_price_alert::error::ConfigError;

const ENV_KEYS: &[&str] = &[
    "DATE_TO_GO",
    "PLACE_FROM",
    "PLACE_TO",
    "FLIGHT_WAY",
    "PRICE_STEP",
    "SLEEP_TIME",
    "EMAIL_SENDER",
    "EMAIL_PASSWORD",
    "EMAIL_RECEIVER",
    "SMTP_SERVER",
    "SMTP_PORT",
    "PUSHPLUS_TOKEN",
    "HISTORY_FILE",
    file::ENV_CONFIG_PATH,
];

fn clear_env() {
    for k in ENV_KEYS {
        env::remove_var(k);
    }
}

#[test]
fn toml_file_with_email_and_pushplus() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("flight_alert.toml");
    fs::write(
        &p,
        r#"
dates = ["20250101", "20250102"]
origin = "sha"
destination = "ctu"
flight_way = "round-trip"
poll_interval_secs = 300
threshold = 80
email_sender = "me@example.com"
email_password = "secret"
email_receiver = "you@example.com"
smtp_server = "smtp.example.com"
smtp_port = 587
pushplus_token = "tok"
history_file = "state/history.json"
"#,
    )
    .unwrap();

    let cfg = file::load_from(&p).unwrap();
    assert_eq!(cfg.route.origin, "SHA");
    assert_eq!(cfg.route.destination, "CTU");
    assert_eq!(cfg.route.flight_way, FlightWay::RoundTrip);
    assert_eq!(cfg.threshold, 80);
    assert_eq!(cfg.poll_interval_secs, 300);
    let email = cfg.notify.email.as_ref().expect("email enabled");
    assert_eq!(email.port, 587);
    assert!(cfg.notify.pushplus.is_some());
    assert!(cfg.history_path.ends_with("state/history.json"));

    // Secrets never leave through serialization.
    let shown = serde_json::to_string(&cfg).unwrap();
    assert!(!shown.contains("secret"));
    assert!(!shown.contains("\"tok\""));
}

#[test]
fn json_file_defaults_smtp_port() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("flight_alert.json");
    fs::write(
        &p,
        r#"{
            "dateToGo": "20250101",
            "placeFrom": "SHA",
            "placeTo": "JIQ",
            "flightWay": "OneWay",
            "sleepTime": "600",
            "priceStep": "50",
            "email_sender": "me@example.com",
            "email_password": "pw",
            "email_receiver": "you@example.com",
            "smtp_server": "smtp.qq.com"
        }"#,
    )
    .unwrap();

    let cfg = file::load_from(&p).unwrap();
    assert_eq!(cfg.notify.email.unwrap().port, DEFAULT_SMTP_PORT);
    assert_eq!(cfg.history_path.to_str(), Some("price_history.json"));
}

#[test]
fn invalid_values_surface_as_config_errors() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bad.toml");
    fs::write(
        &p,
        r#"
dates = ["20250230"]
origin = "SHA"
destination = "JIQ"
flight_way = "OneWay"
poll_interval_secs = 600
threshold = 50
"#,
    )
    .unwrap();
    assert_eq!(
        file::load_from(&p).unwrap_err(),
        ConfigError::InvalidDate("20250230".into())
    );

    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        file::load_from(&missing).unwrap_err(),
        ConfigError::Read { .. }
    ));

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ nope").unwrap();
    assert!(matches!(
        file::load_from(&garbage).unwrap_err(),
        ConfigError::Parse { .. }
    ));
}

#[serial_test::serial]
#[test]
fn locate_prefers_explicit_then_env_then_defaults() {
    clear_env();
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    // Nothing anywhere.
    assert_eq!(file::locate(None).unwrap(), None);

    // Default JSON, then default TOML wins over it.
    fs::create_dir_all("config").unwrap();
    fs::write(file::DEFAULT_JSON_PATH, "{}").unwrap();
    assert_eq!(
        file::locate(None).unwrap().unwrap().to_str(),
        Some(file::DEFAULT_JSON_PATH)
    );
    fs::write(file::DEFAULT_TOML_PATH, "").unwrap();
    assert_eq!(
        file::locate(None).unwrap().unwrap().to_str(),
        Some(file::DEFAULT_TOML_PATH)
    );

    // Env var beats defaults; a dangling one is an error.
    let custom = tmp.path().join("custom.toml");
    fs::write(&custom, "").unwrap();
    env::set_var(file::ENV_CONFIG_PATH, &custom);
    assert_eq!(file::locate(None).unwrap(), Some(custom.clone()));
    env::set_var(file::ENV_CONFIG_PATH, tmp.path().join("gone.toml"));
    assert!(matches!(file::locate(None), Err(ConfigError::Read { .. })));

    // Explicit path beats everything, even the dangling env var.
    let explicit = tmp.path().join("explicit.json");
    assert_eq!(file::locate(Some(explicit.as_path())).unwrap(), Some(explicit.clone()));

    env::remove_var(file::ENV_CONFIG_PATH);
    env::set_current_dir(old).unwrap();
}

#[serial_test::serial]
#[test]
fn environment_only_setup() {
    clear_env();

    assert_eq!(
        env_config::load_from_env().unwrap_err(),
        ConfigError::Missing("DATE_TO_GO")
    );

    env::set_var("DATE_TO_GO", "20250101, 20250102");
    env::set_var("PLACE_TO", "ctu");
    env::set_var("PRICE_STEP", "25");
    env::set_var("PUSHPLUS_TOKEN", "tok");
    let cfg = env_config::load_from_env().unwrap();
    assert_eq!(cfg.dates.len(), 2);
    assert_eq!(cfg.route.origin, "SHA");
    assert_eq!(cfg.route.destination, "CTU");
    assert_eq!(cfg.threshold, 25);
    assert!(cfg.notify.email.is_none());
    assert!(cfg.notify.pushplus.is_some());

    env::set_var("DATE_TO_GO", "2025-01-01");
    assert!(matches!(
        env_config::load_from_env().unwrap_err(),
        ConfigError::DateFormat(_)
    ));

    clear_env();
}
