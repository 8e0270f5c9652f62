use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc::{self, error::TrySendError};

use super::{MailError, Mailer, OutgoingEmail};
use crate::config::MailConfig;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Wait before attempt `n + 1` is `backoff * n`.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(cfg: &MailConfig) -> Self {
        Self {
            max_attempts: cfg.max_attempts.max(1),
            backoff: Duration::from_millis(cfg.retry_backoff_ms),
        }
    }
}

/// Front door for outgoing email: direct delivery with retries, or a bounded
/// background queue for mail the caller does not wait on.
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    policy: RetryPolicy,
    tx: mpsc::Sender<OutgoingEmail>,
}

impl Notifier {
    /// Builds a notifier and spawns its queue worker on the current runtime.
    pub fn spawn(mailer: Arc<dyn Mailer>, policy: RetryPolicy, queue_size: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<OutgoingEmail>(queue_size.max(1));
        let worker_mailer = Arc::clone(&mailer);

        tokio::spawn(async move {
            while let Some(email) = rx.recv().await {
                if let Err(err) = send_with_retry(worker_mailer.as_ref(), policy, &email).await {
                    tracing::warn!(to = %email.to, subject = %email.subject, error = %err, "queued email dropped after retries");
                }
            }
            tracing::debug!("mail queue closed");
        });

        Self {
            mailer,
            policy,
            tx,
        }
    }

    pub async fn deliver(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        send_with_retry(self.mailer.as_ref(), self.policy, email).await
    }

    /// Never blocks the caller; a full or closed queue drops the message.
    pub fn enqueue(&self, email: OutgoingEmail) {
        match self.tx.try_send(email) {
            Ok(()) => {}
            Err(TrySendError::Full(email)) => {
                tracing::warn!(to = %email.to, "mail queue is full; email dropped");
            }
            Err(TrySendError::Closed(email)) => {
                tracing::warn!(to = %email.to, "mail queue closed; email dropped");
            }
        }
    }
}

async fn send_with_retry(
    mailer: &dyn Mailer,
    policy: RetryPolicy,
    email: &OutgoingEmail,
) -> Result<(), MailError> {
    let mut attempt = 1;
    loop {
        match mailer.send_email(&email.to, &email.subject, &email.html).await {
            Ok(()) => {
                tracing::info!(to = %email.to, subject = %email.subject, attempt, "email sent");
                return Ok(());
            }
            Err(err) if attempt < policy.max_attempts => {
                tracing::warn!(to = %email.to, attempt, error = %err, "email send failed; retrying");
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
