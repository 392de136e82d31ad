// src/monitor.rs
//! # Monitoring Loop
//! `Idle → Fetching → Evaluating → Notifying → Sleeping → Fetching …`, with
//! `Stopped` reachable from anywhere on cancellation.
//!
//! One cycle runs to completion before the next starts. The loop owns the
//! [`BaselineTracker`]; observers only see [`StatusEvent`]s.

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use crate::airports;
use crate::config::Config;
use crate::notify::NotifierMux;
use crate::source::{fetch_all, Observations, PriceSource};
use crate::store::BaselineStore;
use crate::tracker::{Action, BaselineTracker, ItineraryKind};

/// Wait after a failed or empty fetch, instead of the poll interval.
pub const RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Fetching,
    Evaluating,
    Notifying,
    Sleeping,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One cycle, no sleep.
    Once,
    UntilCancelled,
}

/// Current quotes and baselines for one monitored date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRow {
    pub date: String,
    pub direct: Option<u32>,
    pub connecting: Option<u32>,
    pub direct_baseline: u32,
    pub connecting_baseline: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    Phase { phase: Phase },
    Log { line: String },
    Countdown { remaining_secs: u64 },
    Prices { at: DateTime<Utc>, rows: Vec<PriceRow> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    FetchFailed(String),
    /// Provider answered but had no prices for either kind.
    NoData,
    Evaluated {
        messages: Vec<String>,
        /// `None` when there was nothing to send.
        delivered: Option<bool>,
    },
}

impl CycleOutcome {
    pub fn next_delay(&self, poll_interval: Duration) -> Duration {
        match self {
            CycleOutcome::Evaluated { .. } => poll_interval,
            CycleOutcome::FetchFailed(_) | CycleOutcome::NoData => RETRY_DELAY,
        }
    }
}

pub struct Monitor {
    config: Config,
    source: Arc<dyn PriceSource>,
    notifier: NotifierMux,
    store: Arc<dyn BaselineStore>,
    tracker: BaselineTracker,
    events: Option<broadcast::Sender<StatusEvent>>,
    phase: Phase,
}

impl Monitor {
    /// Loads the persisted baseline, keeping only the configured dates.
    pub async fn new(
        config: Config,
        source: Arc<dyn PriceSource>,
        notifier: NotifierMux,
        store: Arc<dyn BaselineStore>,
    ) -> Self {
        let baseline = store.load().await.for_dates(&config.dates);
        let tracker = BaselineTracker::new(baseline, config.threshold);
        Self {
            config,
            source,
            notifier,
            store,
            tracker,
            events: None,
            phase: Phase::Idle,
        }
    }

    pub fn with_events(mut self, tx: broadcast::Sender<StatusEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn tracker(&self) -> &BaselineTracker {
        &self.tracker
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn emit(&self, ev: StatusEvent) {
        if let Some(tx) = &self.events {
            // No subscribers is fine.
            let _ = tx.send(ev);
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        tracing::debug!(?phase, "phase");
        self.emit(StatusEvent::Phase { phase });
    }

    fn log_line(&self, line: String) {
        tracing::info!("{line}");
        self.emit(StatusEvent::Log { line });
    }

    fn announce(&self) {
        let r = &self.config.route;
        self.log_line(format!(
            "Monitoring route: {} → {} ({})",
            airports::label(&r.origin),
            airports::label(&r.destination),
            r.flight_way
        ));
        let dates: Vec<&str> = self.config.dates.iter().map(|d| d.as_str()).collect();
        self.log_line(format!(
            "Monitored dates: {} (threshold ¥{}, every {}s)",
            dates.join(", "),
            self.config.threshold,
            self.config.poll_interval_secs
        ));
    }

    /// Fetch → evaluate → persist → notify. Never fails; problems are logged
    /// and reflected in the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        crate::metrics::describe();
        counter!("flight_cycles_total").increment(1);

        self.set_phase(Phase::Fetching);
        let obs = match fetch_all(self.source.as_ref(), &self.config.route).await {
            Ok(o) => o,
            Err(e) => {
                counter!("flight_fetch_errors_total").increment(1);
                tracing::warn!(
                    source = self.source.name(),
                    kind = %e.kind(),
                    error = %e,
                    "price fetch failed"
                );
                self.log_line(format!(
                    "Fetch failed ({e}), retrying in {}s",
                    RETRY_DELAY.as_secs()
                ));
                return CycleOutcome::FetchFailed(e.to_string());
            }
        };

        if obs.is_empty() {
            tracing::warn!(source = self.source.name(), "provider returned no prices");
            self.log_line(format!(
                "No prices returned (route or dates may be invalid), retrying in {}s",
                RETRY_DELAY.as_secs()
            ));
            return CycleOutcome::NoData;
        }

        self.set_phase(Phase::Evaluating);
        let (messages, rows) = self.evaluate(&obs);

        if let Err(e) = self.store.save(self.tracker.baseline()).await {
            tracing::warn!(operation = "save_baseline", error = %format!("{e:#}"), "baseline not persisted this cycle");
        }
        gauge!("flight_last_cycle_ts").set(Utc::now().timestamp() as f64);
        self.emit(StatusEvent::Prices {
            at: Utc::now(),
            rows,
        });

        if messages.is_empty() {
            self.log_line("No significant price change".to_string());
            return CycleOutcome::Evaluated {
                messages,
                delivered: None,
            };
        }

        self.set_phase(Phase::Notifying);
        let delivered = self.notifier.deliver(&messages.join("\n")).await;
        if !delivered {
            tracing::warn!(count = messages.len(), "alert not delivered");
        }
        CycleOutcome::Evaluated {
            messages,
            delivered: Some(delivered),
        }
    }

    /// Every date × {direct, connecting}, in configured order, direct first.
    fn evaluate(&mut self, obs: &Observations) -> (Vec<String>, Vec<PriceRow>) {
        let mut messages = Vec::new();
        let mut rows = Vec::with_capacity(self.config.dates.len());

        for date in &self.config.dates {
            let direct = obs.get(ItineraryKind::Direct, date);
            let connecting = obs.get(ItineraryKind::Connecting, date);
            if direct.is_none() && connecting.is_none() {
                tracing::warn!(date = %date, "no quote for date");
            }
            self.log_line(format!(
                "{} - direct: {}, connecting: {}",
                date.pretty(),
                show_price(direct),
                show_price(connecting)
            ));

            for kind in ItineraryKind::ALL {
                let decision = self.tracker.observe(date, kind, obs.get(kind, date));
                if let Some(msg) = decision.message {
                    let action = match decision.action {
                        Action::RecordFirst => "record_first",
                        Action::RecordChange => "record_change",
                        Action::None => "none",
                    };
                    tracing::info!(date = %date, %kind, action, baseline = decision.new_baseline, "{msg}");
                    counter!("flight_baseline_updates_total", "kind" => kind.as_str()).increment(1);
                    messages.push(msg);
                }
            }

            let b = self.tracker.baseline();
            rows.push(PriceRow {
                date: date.pretty(),
                direct,
                connecting,
                direct_baseline: b.get(date, ItineraryKind::Direct),
                connecting_baseline: b.get(date, ItineraryKind::Connecting),
            });
        }

        (messages, rows)
    }

    /// Run until `cancel` flips to `true` (or its sender is dropped).
    /// Returns the last cycle's outcome, if any cycle ran.
    pub async fn run(
        &mut self,
        mode: RunMode,
        mut cancel: watch::Receiver<bool>,
    ) -> Option<CycleOutcome> {
        self.announce();
        let mut last = None;

        loop {
            if *cancel.borrow() {
                break;
            }
            let outcome = self.run_cycle().await;
            if mode == RunMode::Once {
                last = Some(outcome);
                break;
            }

            let delay = outcome.next_delay(self.config.poll_interval());
            last = Some(outcome);
            self.set_phase(Phase::Sleeping);
            if !self.sleep(delay, &mut cancel).await {
                break;
            }
        }

        self.set_phase(Phase::Stopped);
        self.log_line("Monitoring stopped".to_string());
        last
    }

    /// Sleep in one-second steps. Returns `false` if cancelled.
    async fn sleep(&self, total: Duration, cancel: &mut watch::Receiver<bool>) -> bool {
        let mut remaining = total.as_secs().max(1);
        while remaining > 0 {
            if *cancel.borrow() {
                return false;
            }
            self.emit(StatusEvent::Countdown {
                remaining_secs: remaining,
            });
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(1)) => remaining -= 1,
                changed = cancel.changed() => {
                    if changed.is_err() {
                        return false;
                    }
                }
            }
        }
        !*cancel.borrow()
    }
}

fn show_price(p: Option<u32>) -> String {
    p.map(|v| format!("¥{v}")).unwrap_or_else(|| "none".to_string())
}
