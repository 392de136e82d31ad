// src/error.rs
//! Typed error taxonomy. Configuration errors are fatal at startup; fetch
//! errors only abort the current cycle.

use thiserror::Error;

use crate::tracker::ItineraryKind;

/// A missing or invalid configuration field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    Missing(&'static str),

    #[error("at least one date must be monitored")]
    NoDates,

    #[error("malformed date {0:?}, expected 8 digits (YYYYMMDD)")]
    DateFormat(String),

    #[error("not a calendar date: {0}")]
    InvalidDate(String),

    #[error("{field} must be a positive integer, got {value:?}")]
    NotPositive { field: &'static str, value: String },

    #[error("airport code for {0} must not be empty")]
    EmptyAirport(&'static str),

    #[error("unknown flight way {0:?}, expected OneWay or RoundTrip")]
    FlightWay(String),

    #[error("invalid SMTP port {0:?}")]
    SmtpPort(String),

    #[error("cannot read config file {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("cannot parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("cannot write config file {path}: {reason}")]
    Write { path: String, reason: String },
}

/// Failure of a single provider query.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{kind} request failed: {source}")]
    Transport {
        kind: ItineraryKind,
        #[source]
        source: reqwest::Error,
    },

    #[error("{kind} response is not valid JSON: {source}")]
    Decode {
        kind: ItineraryKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider reported an error for {kind}: {message}")]
    Provider { kind: ItineraryKind, message: String },
}

impl FetchError {
    pub fn kind(&self) -> ItineraryKind {
        match self {
            FetchError::Transport { kind, .. }
            | FetchError::Decode { kind, .. }
            | FetchError::Provider { kind, .. } => *kind,
        }
    }
}
