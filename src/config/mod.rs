// src/config/mod.rs
//! Configuration record and the single validation path every surface uses.
//!
//! Files, environment variables and the HTTP form all produce a [`ConfigForm`]
//! (every field optional, values as typed by a user) and go through
//! [`ConfigForm::validate`] to get a [`Config`].

pub mod env;
pub mod file;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::tracker::MonitoredDate;

pub const DEFAULT_HISTORY_FILE: &str = "price_history.json";
pub const DEFAULT_SMTP_PORT: u16 = 465;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightWay {
    OneWay,
    RoundTrip,
}

impl FlightWay {
    /// Accepts `OneWay`, `oneway`, `one-way`, `round_trip`, ...
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let norm: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match norm.as_str() {
            "oneway" => Ok(FlightWay::OneWay),
            "roundtrip" => Ok(FlightWay::RoundTrip),
            _ => Err(ConfigError::FlightWay(raw.to_string())),
        }
    }

    /// Spelling the provider expects in `flightWay`.
    pub fn provider_param(self) -> &'static str {
        match self {
            FlightWay::OneWay => "Oneway",
            FlightWay::RoundTrip => "Roundtrip",
        }
    }
}

impl fmt::Display for FlightWay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlightWay::OneWay => "OneWay",
            FlightWay::RoundTrip => "RoundTrip",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    pub origin: String,
    pub destination: String,
    pub flight_way: FlightWay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmtpSettings {
    pub sender: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub receiver: String,
    pub server: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPlusSettings {
    #[serde(skip_serializing)]
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NotifySettings {
    pub email: Option<SmtpSettings>,
    pub pushplus: Option<PushPlusSettings>,
}

/// Validated, immutable configuration for one monitoring session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub route: Route,
    pub dates: Vec<MonitoredDate>,
    /// Minimum absolute price delta (currency units) that triggers an alert.
    pub threshold: u32,
    pub poll_interval_secs: u64,
    pub notify: NotifySettings,
    pub history_path: PathBuf,
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn form(&self) -> ConfigForm {
        let email = self.notify.email.as_ref();
        ConfigForm {
            dates: Some(DateList::List(
                self.dates.iter().map(|d| d.as_str().to_string()).collect(),
            )),
            origin: Some(self.route.origin.clone()),
            destination: Some(self.route.destination.clone()),
            flight_way: Some(self.route.flight_way.to_string()),
            poll_interval_secs: Some(FieldValue::Int(self.poll_interval_secs as i64)),
            threshold: Some(FieldValue::Int(i64::from(self.threshold))),
            email_sender: email.map(|e| e.sender.clone()),
            email_password: email.map(|e| e.password.clone()),
            email_receiver: email.map(|e| e.receiver.clone()),
            smtp_server: email.map(|e| e.server.clone()),
            smtp_port: email.map(|e| FieldValue::Int(i64::from(e.port))),
            pushplus_token: self.notify.pushplus.as_ref().map(|p| p.token.clone()),
            history_file: Some(self.history_path.display().to_string()),
        }
    }
}

/// Dates either as a list or as one comma separated string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateList {
    List(Vec<String>),
    Csv(String),
}

impl DateList {
    fn items(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            DateList::List(v) => v.iter().map(String::as_str).collect(),
            DateList::Csv(s) => s.split(',').collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A numeric field that may arrive as a number or as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl FieldValue {
    fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse().ok(),
        }
    }

    fn raw(&self) -> String {
        match self {
            FieldValue::Int(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

/// Unvalidated configuration as typed into a file, the environment or a form.
///
/// Legacy camelCase keys (`dateToGo`, `placeFrom`, `priceStep`, ...) are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigForm {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "dateToGo", alias = "date_to_go")]
    pub dates: Option<DateList>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "placeFrom", alias = "place_from")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "placeTo", alias = "place_to")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "flightWay")]
    pub flight_way: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "sleepTime", alias = "sleep_time")]
    pub poll_interval_secs: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "priceStep", alias = "price_step")]
    pub threshold: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_sender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_receiver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<FieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushplus_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_file: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<String> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn positive(field: &'static str, v: &Option<FieldValue>) -> Result<u64, ConfigError> {
    let v = v.as_ref().ok_or(ConfigError::Missing(field))?;
    match v.as_i64() {
        Some(n) if n > 0 => Ok(n as u64),
        _ => Err(ConfigError::NotPositive {
            field,
            value: v.raw(),
        }),
    }
}

impl ConfigForm {
    pub fn validate(&self) -> Result<Config, ConfigError> {
        let raw_dates = self
            .dates
            .as_ref()
            .ok_or(ConfigError::Missing("dates"))?
            .items();
        if raw_dates.is_empty() {
            return Err(ConfigError::NoDates);
        }
        let dates = raw_dates
            .iter()
            .map(|d| MonitoredDate::parse(d))
            .collect::<Result<Vec<_>, _>>()?;

        let origin = airport("origin", &self.origin)?;
        let destination = airport("destination", &self.destination)?;
        let flight_way = FlightWay::parse(
            self.flight_way
                .as_deref()
                .ok_or(ConfigError::Missing("flight_way"))?,
        )?;

        let poll_interval_secs = positive("poll_interval_secs", &self.poll_interval_secs)?;
        let threshold = positive("threshold", &self.threshold)?;
        let threshold = u32::try_from(threshold).map_err(|_| ConfigError::NotPositive {
            field: "threshold",
            value: threshold.to_string(),
        })?;

        let notify = NotifySettings {
            email: self.email_settings()?,
            pushplus: non_empty(&self.pushplus_token).map(|token| PushPlusSettings { token }),
        };

        let history_path = non_empty(&self.history_file)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE));

        Ok(Config {
            route: Route {
                origin,
                destination,
                flight_way,
            },
            dates,
            threshold,
            poll_interval_secs,
            notify,
            history_path,
        })
    }

    /// Email is enabled when sender, password and receiver are all present.
    /// A partial set disables email with a warning instead of failing.
    fn email_settings(&self) -> Result<Option<SmtpSettings>, ConfigError> {
        let sender = non_empty(&self.email_sender);
        let password = non_empty(&self.email_password);
        let receiver = non_empty(&self.email_receiver);

        let (sender, password, receiver) = match (sender, password, receiver) {
            (Some(s), Some(p), Some(r)) => (s, p, r),
            (None, None, None) => return Ok(None),
            _ => {
                tracing::warn!("email settings incomplete, email notifications disabled");
                return Ok(None);
            }
        };

        let server = non_empty(&self.smtp_server).ok_or(ConfigError::Missing("smtp_server"))?;
        let port = match &self.smtp_port {
            None => DEFAULT_SMTP_PORT,
            Some(v) => v
                .as_i64()
                .and_then(|n| u16::try_from(n).ok())
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::SmtpPort(v.raw()))?,
        };

        Ok(Some(SmtpSettings {
            sender,
            password,
            receiver,
            server,
            port,
        }))
    }
}

fn airport(field: &'static str, v: &Option<String>) -> Result<String, ConfigError> {
    non_empty(v)
        .map(|s| s.to_ascii_uppercase())
        .ok_or(ConfigError::EmptyAirport(field))
}
