// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod airports;
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod notify;
pub mod service;
pub mod source;
pub mod store;
pub mod tracker;

// ---- Re-exports for stable public API ----
pub use crate::config::{Config, ConfigForm};
pub use crate::error::{ConfigError, FetchError};
pub use crate::monitor::{CycleOutcome, Monitor, RunMode, StatusEvent};
pub use crate::notify::{Notifier, NotifierMux};
pub use crate::tracker::{decide, Action, Baseline, BaselineTracker, Decision, ItineraryKind, MonitoredDate};
