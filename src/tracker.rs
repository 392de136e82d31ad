// src/tracker.rs
//! # Baseline Tracker
//! Pure, testable logic that maps `(baseline, observation, threshold)` → `Decision`.
//! No I/O. The monitoring loop owns a [`BaselineTracker`] and feeds it one
//! observation per monitored date and itinerary kind each cycle.
//!
//! Policy: the first quote for a date/kind is always recorded and announced;
//! afterwards the baseline only moves when the quote differs from it by at
//! least the threshold (inclusive). Direct and connecting baselines never
//! influence each other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConfigError;

/// Direct (no connections) vs. connecting (one or more stops).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItineraryKind {
    Direct,
    Connecting,
}

impl ItineraryKind {
    /// Evaluation order within a date.
    pub const ALL: [ItineraryKind; 2] = [ItineraryKind::Direct, ItineraryKind::Connecting];

    pub fn as_str(self) -> &'static str {
        match self {
            ItineraryKind::Direct => "direct",
            ItineraryKind::Connecting => "connecting",
        }
    }
}

impl fmt::Display for ItineraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `YYYYMMDD` calendar date.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonitoredDate(String);

impl MonitoredDate {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let s = raw.trim();
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::DateFormat(s.to_string()));
        }
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map_err(|_| ConfigError::InvalidDate(s.to_string()))?;
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `20250101` → `2025-01-01`.
    pub fn pretty(&self) -> String {
        format!("{}-{}-{}", &self.0[..4], &self.0[4..6], &self.0[6..])
    }
}

impl fmt::Display for MonitoredDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MonitoredDate {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MonitoredDate> for String {
    fn from(d: MonitoredDate) -> Self {
        d.0
    }
}

/// What the tracker did with an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    None,
    RecordFirst,
    RecordChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub new_baseline: u32,
    pub message: Option<String>,
}

impl Decision {
    fn keep(baseline: u32) -> Self {
        Self {
            action: Action::None,
            new_baseline: baseline,
            message: None,
        }
    }

    pub fn notifies(&self) -> bool {
        self.action != Action::None
    }
}

/// Decide what to do with one observation for `(date, kind)`.
///
/// A quote of 0 is treated like a missing quote: 0 is the "never recorded"
/// sentinel and the provider never legitimately returns it.
pub fn decide(
    date: &MonitoredDate,
    kind: ItineraryKind,
    current: u32,
    observed: Option<u32>,
    threshold: u32,
) -> Decision {
    let price = match observed {
        Some(p) if p > 0 => p,
        _ => return Decision::keep(current),
    };

    if current == 0 {
        return Decision {
            action: Action::RecordFirst,
            new_baseline: price,
            message: Some(format!(
                "First price recorded: {} {} ¥{}",
                date.pretty(),
                kind,
                price
            )),
        };
    }

    let delta = i64::from(price) - i64::from(current);
    if delta.unsigned_abs() < u64::from(threshold) {
        return Decision::keep(current);
    }

    let direction = if delta > 0 { "increase" } else { "decrease" };
    Decision {
        action: Action::RecordChange,
        new_baseline: price,
        message: Some(format!(
            "{} {} price {} ¥{} (¥{} → ¥{})",
            date.pretty(),
            kind,
            direction,
            delta.unsigned_abs(),
            current,
            price
        )),
    }
}

/// Last-notified price per kind, keyed by `YYYYMMDD`. 0 / missing = never recorded.
///
/// Also reads the older `target_prices` / `no_target_prices` layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    #[serde(default, alias = "target_prices")]
    pub direct: BTreeMap<String, u32>,
    #[serde(default, alias = "no_target_prices")]
    pub connecting: BTreeMap<String, u32>,
}

impl Baseline {
    fn side(&self, kind: ItineraryKind) -> &BTreeMap<String, u32> {
        match kind {
            ItineraryKind::Direct => &self.direct,
            ItineraryKind::Connecting => &self.connecting,
        }
    }

    fn side_mut(&mut self, kind: ItineraryKind) -> &mut BTreeMap<String, u32> {
        match kind {
            ItineraryKind::Direct => &mut self.direct,
            ItineraryKind::Connecting => &mut self.connecting,
        }
    }

    pub fn get(&self, date: &MonitoredDate, kind: ItineraryKind) -> u32 {
        self.side(kind).get(date.as_str()).copied().unwrap_or(0)
    }

    pub fn set(&mut self, date: &MonitoredDate, kind: ItineraryKind, price: u32) {
        self.side_mut(kind).insert(date.as_str().to_string(), price);
    }

    /// Restrict to `dates`: unmonitored entries are dropped, new dates start at 0.
    pub fn for_dates(mut self, dates: &[MonitoredDate]) -> Self {
        for kind in ItineraryKind::ALL {
            let side = self.side_mut(kind);
            side.retain(|d, _| dates.iter().any(|m| m.as_str() == d));
            for d in dates {
                side.entry(d.as_str().to_string()).or_insert(0);
            }
        }
        self
    }
}

/// Owns the baseline for one monitoring session and applies decisions to it.
#[derive(Debug, Clone)]
pub struct BaselineTracker {
    baseline: Baseline,
    threshold: u32,
}

impl BaselineTracker {
    pub fn new(baseline: Baseline, threshold: u32) -> Self {
        Self {
            baseline,
            threshold,
        }
    }

    /// Decide for one `(date, kind)` and apply the new baseline.
    pub fn observe(
        &mut self,
        date: &MonitoredDate,
        kind: ItineraryKind,
        observed: Option<u32>,
    ) -> Decision {
        let current = self.baseline.get(date, kind);
        let d = decide(date, kind, current, observed, self.threshold);
        if d.notifies() {
            self.baseline.set(date, kind, d.new_baseline);
        }
        d
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
