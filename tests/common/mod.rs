// tests/common/mod.rs
//
// Shared fakes: a scripted price source, a recording notifier and a config builder.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flight_price_alert::config::{Config, ConfigForm, DateList, FieldValue, Route};
use flight_price_alert::error::FetchError;
use flight_price_alert::notify::Notifier;
use flight_price_alert::source::{PriceMap, PriceSource};
use flight_price_alert::tracker::ItineraryKind;

/// One scripted answer for one query.
#[derive(Debug, Clone)]
pub enum Reply {
    Prices(Vec<(&'static str, u32)>),
    Fail(&'static str),
}

impl Reply {
    pub fn empty() -> Self {
        Reply::Prices(Vec::new())
    }
}

/// Answers queries from per-kind queues. An exhausted queue answers "no data".
#[derive(Default)]
pub struct ScriptedSource {
    direct: Mutex<VecDeque<Reply>>,
    connecting: Mutex<VecDeque<Reply>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_cycle(&self, direct: Reply, connecting: Reply) {
        self.direct.lock().unwrap().push_back(direct);
        self.connecting.lock().unwrap().push_back(connecting);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for ScriptedSource {
    async fn fetch(&self, _route: &Route, kind: ItineraryKind) -> Result<PriceMap, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let queue = match kind {
            ItineraryKind::Direct => &self.direct,
            ItineraryKind::Connecting => &self.connecting,
        };
        let reply = queue.lock().unwrap().pop_front().unwrap_or_else(Reply::empty);
        match reply {
            Reply::Prices(p) => Ok(p.into_iter().map(|(d, v)| (d.to_string(), v)).collect()),
            Reply::Fail(msg) => Err(FetchError::Provider {
                kind,
                message: msg.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Records every message; optionally refuses them all.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(message.to_string());
        if self.fail {
            anyhow::bail!("channel down");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn form(dates: &[&str], threshold: i64) -> ConfigForm {
    ConfigForm {
        dates: Some(DateList::List(dates.iter().map(|s| s.to_string()).collect())),
        origin: Some("SHA".into()),
        destination: Some("JIQ".into()),
        flight_way: Some("OneWay".into()),
        poll_interval_secs: Some(FieldValue::Int(600)),
        threshold: Some(FieldValue::Int(threshold)),
        history_file: Some("unused_history.json".into()),
        ..ConfigForm::default()
    }
}

pub fn config(dates: &[&str], threshold: i64) -> Config {
    form(dates, threshold).validate().expect("valid test config")
}
