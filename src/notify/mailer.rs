use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use thiserror::Error;

use super::OutgoingEmail;
use crate::config::{MailConfig, MailTransport};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address `{0}`")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp transport failed: {0}")]
    Transport(String),
    #[error("mail transport misconfigured: {0}")]
    Config(String),
}

/// Sends one HTML email. Implementations must not log the body.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError>;
}

pub fn mailer_from_config(cfg: &MailConfig) -> Result<Arc<dyn Mailer>, MailError> {
    match cfg.transport {
        MailTransport::Log => Ok(Arc::new(LogMailer)),
        MailTransport::Smtp => Ok(Arc::new(SmtpMailer::from_config(cfg)?)),
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(cfg: &MailConfig) -> Result<Self, MailError> {
        let host = cfg
            .smtp_host
            .as_deref()
            .ok_or_else(|| MailError::Config("smtp_host is not set".to_string()))?;

        let builder = if cfg.smtp_secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|err| MailError::Config(err.to_string()))?;

        let mut builder = builder.port(cfg.smtp_port);
        if let (Some(user), Some(pass)) = (&cfg.smtp_user, &cfg.smtp_pass) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let from = cfg
            .from
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(cfg.from.clone()))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        let to_box = to
            .parse::<Mailbox>()
            .map_err(|_| MailError::Address(to.to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_box)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .map_err(|err| MailError::Build(err.to_string()))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|err| MailError::Transport(err.to_string()))
    }
}

/// Development transport: records that a mail would have gone out.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, to: &str, subject: &str, _html: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, "email suppressed by log transport");
        Ok(())
    }
}

/// Keeps every message in memory. Can be told to fail the next N sends.
#[derive(Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    failures_left: Arc<Mutex<u32>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(times: u32) -> Self {
        let mailer = Self::default();
        mailer.fail_next(times);
        mailer
    }

    pub fn fail_next(&self, times: u32) {
        if let Ok(mut left) = self.failures_left.lock() {
            *left = times;
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if let Ok(mut left) = self.failures_left.lock() {
            if *left > 0 {
                *left -= 1;
                return Err(MailError::Transport("recording mailer told to fail".to_string()));
            }
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(OutgoingEmail {
                to: to.to_string(),
                subject: subject.to_string(),
                html: html.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Mailer, RecordingMailer, SmtpMailer, mailer_from_config};
    use crate::config::{MailConfig, MailTransport};

    #[tokio::test]
    async fn recording_mailer_fails_then_records() {
        let mailer = RecordingMailer::failing(1);

        assert!(mailer.send_email("a@b.co", "hi", "<p>x</p>").await.is_err());
        assert!(mailer.send_email("a@b.co", "hi", "<p>x</p>").await.is_ok());
        assert_eq!(mailer.sent().len(), 1);
        assert_eq!(mailer.sent()[0].to, "a@b.co");
    }

    #[test]
    fn smtp_requires_host() {
        let cfg = MailConfig {
            transport: MailTransport::Smtp,
            ..MailConfig::default()
        };

        assert!(SmtpMailer::from_config(&cfg).is_err());
    }

    #[test]
    fn log_transport_is_the_default() {
        assert!(mailer_from_config(&MailConfig::default()).is_ok());
    }
}
