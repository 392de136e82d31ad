use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use std::time::Duration;

use super::{Notifier, SUBJECT};
use crate::config::SmtpSettings;

/// Port that speaks TLS from the first byte; every other port upgrades via STARTTLS.
const IMPLICIT_TLS_PORT: u16 = 465;

pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    pub fn new(s: &SmtpSettings) -> Result<Self> {
        let creds = Credentials::new(s.sender.clone(), s.password.clone());
        let builder = if s.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&s.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&s.server)
        }
        .with_context(|| format!("invalid SMTP server {}", s.server))?;

        let mailer = builder
            .port(s.port)
            .credentials(creds)
            .timeout(Some(Duration::from_secs(15)))
            .build();

        let from = s
            .sender
            .parse()
            .with_context(|| format!("invalid sender address {}", s.sender))?;
        let to = s
            .receiver
            .parse()
            .with_context(|| format!("invalid receiver address {}", s.receiver))?;

        Ok(Self { mailer, from, to })
    }

    pub fn build_message(&self, body: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(SUBJECT)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .context("build email")
    }
}

#[async_trait]
impl Notifier for EmailSender {
    async fn send(&self, message: &str) -> Result<()> {
        let msg = self.build_message(message)?;
        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(port: u16) -> SmtpSettings {
        SmtpSettings {
            sender: "alerts@example.com".into(),
            password: "secret".into(),
            receiver: "me@example.com".into(),
            server: "smtp.example.com".into(),
            port,
        }
    }

    #[test]
    fn builds_for_both_tls_modes() {
        assert!(EmailSender::new(&settings(465)).is_ok());
        assert!(EmailSender::new(&settings(587)).is_ok());
    }

    #[test]
    fn rejects_bad_address() {
        let mut s = settings(465);
        s.receiver = "not an address".into();
        assert!(EmailSender::new(&s).is_err());
    }

    #[test]
    fn message_carries_subject_and_body() {
        let sender = EmailSender::new(&settings(465)).unwrap();
        let msg = sender.build_message("2025-01-01 direct price decrease ¥70").unwrap();
        let raw = String::from_utf8(msg.formatted()).unwrap();
        assert!(raw.contains("Subject: Flight price alert"));
        assert!(raw.contains("To: me@example.com"));
    }
}
