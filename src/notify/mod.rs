// src/notify/mod.rs
pub mod email;
pub mod pushplus;

use anyhow::Result;
use async_trait::async_trait;
use metrics::counter;

use crate::config::NotifySettings;

pub const SUBJECT: &str = "Flight price alert";

/// One delivery channel. A single attempt per call; retrying is not its job.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans one message out to every configured channel.
#[derive(Default)]
pub struct NotifierMux {
    channels: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    /// Channels that fail to build are logged and left out.
    pub fn from_settings(settings: &NotifySettings) -> Self {
        let mut channels: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(smtp) = &settings.email {
            match email::EmailSender::new(smtp) {
                Ok(sender) => channels.push(Box::new(sender)),
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "email channel disabled"),
            }
        }
        if let Some(pp) = &settings.pushplus {
            channels.push(Box::new(pushplus::PushPlusNotifier::new(pp.token.clone())));
        }
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Best-effort delivery. Never fails; returns whether at least one channel
    /// accepted the message.
    pub async fn deliver(&self, message: &str) -> bool {
        if self.channels.is_empty() {
            tracing::info!("no notification channel configured, message only logged");
            counter!("flight_notifications_total", "outcome" => "skipped").increment(1);
            return false;
        }

        let mut delivered = false;
        for ch in &self.channels {
            match ch.send(message).await {
                Ok(()) => {
                    tracing::info!(channel = ch.name(), "notification sent");
                    delivered = true;
                }
                Err(e) => {
                    tracing::warn!(channel = ch.name(), error = %format!("{e:#}"), "notification failed");
                }
            }
        }
        let outcome = if delivered { "sent" } else { "failed" };
        counter!("flight_notifications_total", "outcome" => outcome).increment(1);
        delivered
    }
}
