// src/service.rs
//! Monitoring worker as an actor.
//!
//! The interactive surface holds a cloneable [`MonitorHandle`] and talks to the
//! worker only through commands (start / stop / configure / status) and the
//! status event stream. The running [`Monitor`] and its baseline live on their
//! own task; nothing outside it touches them.

use serde::Serialize;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::config::{file, Config, ConfigForm};
use crate::error::ConfigError;
use crate::monitor::{Monitor, Phase, PriceRow, RunMode, StatusEvent};
use crate::notify::NotifierMux;
use crate::source::{ctrip::CtripSource, PriceSource};
use crate::store::{BaselineStore, JsonFileStore};

const LOG_CAPACITY: usize = 200;
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("monitoring is running; stop it first")]
    AlreadyRunning,
    #[error("no configuration loaded")]
    NotConfigured,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot start monitor: {0}")]
    Wiring(String),
    #[error("monitor worker is gone")]
    Closed,
}

/// The collaborators one monitoring session needs.
pub struct MonitorParts {
    pub source: Arc<dyn PriceSource>,
    pub notifier: NotifierMux,
    pub store: Arc<dyn BaselineStore>,
}

impl MonitorParts {
    /// Ctrip source, configured notification channels, JSON history file.
    pub fn production(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            source: Arc::new(CtripSource::new()?),
            notifier: NotifierMux::from_settings(&cfg.notify),
            store: Arc::new(JsonFileStore::new(cfg.history_path.clone())),
        })
    }
}

pub type PartsFactory = Arc<dyn Fn(&Config) -> anyhow::Result<MonitorParts> + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub running: bool,
    pub stopping: bool,
    pub phase: Phase,
    pub countdown_secs: Option<u64>,
    pub config: Option<Config>,
    pub prices: Vec<PriceRow>,
    pub prices_at: Option<chrono::DateTime<chrono::Utc>>,
    pub log: Vec<String>,
}

enum Command {
    Start(oneshot::Sender<Result<(), ServiceError>>),
    Stop(oneshot::Sender<bool>),
    Configure(ConfigForm, oneshot::Sender<Result<Config, ServiceError>>),
    Status(oneshot::Sender<StatusSnapshot>),
    Finished,
}

#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<StatusEvent>,
}

impl MonitorHandle {
    /// Spawn the worker. It starts idle; call [`MonitorHandle::start`].
    ///
    /// Accepted forms are written to `config_file` when one is given.
    pub fn spawn(
        config: Option<Config>,
        factory: PartsFactory,
        config_file: Option<PathBuf>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(32);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let worker = Worker {
            config,
            config_file,
            factory,
            events: events.clone(),
            self_tx: tx.downgrade(),
            session: None,
            status: Status::default(),
        };
        tokio::spawn(worker.run(rx));
        Self { tx, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, ServiceError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ServiceError::Closed)?;
        rx.await.map_err(|_| ServiceError::Closed)
    }

    pub async fn start(&self) -> Result<(), ServiceError> {
        self.call(Command::Start).await?
    }

    /// Request a stop. Returns whether a session was running.
    pub async fn stop(&self) -> Result<bool, ServiceError> {
        self.call(Command::Stop).await
    }

    /// Replace the configuration. Rejected while a session is running.
    pub async fn configure(&self, form: ConfigForm) -> Result<Config, ServiceError> {
        self.call(|r| Command::Configure(form, r)).await?
    }

    pub async fn status(&self) -> Result<StatusSnapshot, ServiceError> {
        self.call(Command::Status).await
    }
}

struct Session {
    cancel: watch::Sender<bool>,
    stopping: bool,
}

#[derive(Default)]
struct Status {
    phase: Option<Phase>,
    countdown: Option<u64>,
    prices: Vec<PriceRow>,
    prices_at: Option<chrono::DateTime<chrono::Utc>>,
    log: VecDeque<String>,
}

impl Status {
    fn apply(&mut self, ev: StatusEvent) {
        match ev {
            StatusEvent::Phase { phase } => {
                self.phase = Some(phase);
                if phase != Phase::Sleeping {
                    self.countdown = None;
                }
            }
            StatusEvent::Countdown { remaining_secs } => self.countdown = Some(remaining_secs),
            StatusEvent::Log { line } => {
                if self.log.len() == LOG_CAPACITY {
                    self.log.pop_front();
                }
                self.log.push_back(line);
            }
            StatusEvent::Prices { at, rows } => {
                self.prices = rows;
                self.prices_at = Some(at);
            }
        }
    }
}

struct Worker {
    config: Option<Config>,
    config_file: Option<PathBuf>,
    factory: PartsFactory,
    events: broadcast::Sender<StatusEvent>,
    self_tx: mpsc::WeakSender<Command>,
    session: Option<Session>,
    status: Status,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut events_rx = self.events.subscribe();
        loop {
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
                ev = events_rx.recv() => match ev {
                    Ok(ev) => self.status.apply(ev),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(skipped = n, "status listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        if let Some(s) = self.session.take() {
            let _ = s.cancel.send(true);
        }
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Start(reply) => {
                let _ = reply.send(self.start());
            }
            Command::Stop(reply) => {
                let was_running = match &mut self.session {
                    Some(s) => {
                        s.stopping = true;
                        let _ = s.cancel.send(true);
                        true
                    }
                    None => false,
                };
                let _ = reply.send(was_running);
            }
            Command::Configure(form, reply) => {
                let res = if self.session.is_some() {
                    Err(ServiceError::AlreadyRunning)
                } else {
                    form.validate().map_err(ServiceError::from).inspect(|cfg| {
                        tracing::info!(origin = %cfg.route.origin, destination = %cfg.route.destination, "configuration updated");
                        self.config = Some(cfg.clone());
                        self.save_form(&form);
                    })
                };
                let _ = reply.send(res);
            }
            Command::Status(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Finished => {
                self.session = None;
                self.status.countdown = None;
            }
        }
    }

    fn start(&mut self) -> Result<(), ServiceError> {
        if self.session.is_some() {
            return Err(ServiceError::AlreadyRunning);
        }
        let config = self.config.clone().ok_or(ServiceError::NotConfigured)?;
        let parts = (self.factory)(&config).map_err(|e| ServiceError::Wiring(format!("{e:#}")))?;

        let (cancel, cancel_rx) = watch::channel(false);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let mut monitor = Monitor::new(config, parts.source, parts.notifier, parts.store)
                .await
                .with_events(events);
            monitor.run(RunMode::UntilCancelled, cancel_rx).await;
        });

        // Supervisor: report the end of the session, including panics.
        let done = self.self_tx.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "monitor task crashed");
                let _ = events.send(StatusEvent::Log {
                    line: format!("Monitor crashed: {e}"),
                });
                let _ = events.send(StatusEvent::Phase {
                    phase: Phase::Stopped,
                });
            }
            if let Some(done) = done.upgrade() {
                let _ = done.send(Command::Finished).await;
            }
        });

        self.session = Some(Session {
            cancel,
            stopping: false,
        });
        Ok(())
    }

    /// A failed write keeps the new configuration in memory.
    fn save_form(&self, form: &ConfigForm) {
        let Some(path) = &self.config_file else {
            return;
        };
        let line = match file::save_form(path, form) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "configuration saved");
                format!("Configuration saved to {}", path.display())
            }
            Err(e) => {
                tracing::warn!(operation = "save_config", error = %e, "configuration not saved");
                format!("Configuration not saved: {e}")
            }
        };
        let _ = self.events.send(StatusEvent::Log { line });
    }

    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            running: self.session.is_some(),
            stopping: self.session.as_ref().is_some_and(|s| s.stopping),
            phase: self.status.phase.unwrap_or(Phase::Idle),
            countdown_secs: self.status.countdown,
            config: self.config.clone(),
            prices: self.status.prices.clone(),
            prices_at: self.status.prices_at,
            log: self.status.log.iter().cloned().collect(),
        }
    }
}
