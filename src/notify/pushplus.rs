use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Notifier, SUBJECT};

pub const PUSHPLUS_URL: &str = "https://www.pushplus.plus/send";

#[derive(Serialize)]
struct PushPlusPayload<'a> {
    token: &'a str,
    title: &'a str,
    content: &'a str,
    template: &'a str,
}

#[derive(Deserialize)]
struct PushPlusReply {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
}

pub struct PushPlusNotifier {
    token: String,
    url: String,
    client: Client,
    timeout: Duration,
}

impl PushPlusNotifier {
    pub fn new(token: String) -> Self {
        Self {
            token,
            url: PUSHPLUS_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Optional builder for tests/tools
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait::async_trait]
impl Notifier for PushPlusNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let payload = PushPlusPayload {
            token: &self.token,
            title: SUBJECT,
            content: message,
            template: "txt",
        };

        let reply: PushPlusReply = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .context("pushplus post")?
            .error_for_status()
            .context("pushplus non-2xx")?
            .json()
            .await
            .context("pushplus reply")?;

        if reply.code != 200 {
            return Err(anyhow!(
                "pushplus rejected message (code {}): {}",
                reply.code,
                reply.msg.unwrap_or_default()
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "pushplus"
    }
}
