//! Outbound email
//!
//! Request handlers never talk to SMTP directly. They push an
//! [`OutgoingEmail`] onto an [`EmailQueue`] and return; a detached
//! [`EmailWorker`] task performs delivery and only logs failures.
//!
//! If `SMTP_HOST` is not set, [`EmailConfig::from_env`] returns `None` and the
//! worker drops every message with a warning.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Email delivery failures
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.)
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@localhost";

/// SMTP settings
#[derive(Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("from_address", &self.from_address)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &self.smtp_password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default             |
    /// |-----------------|----------|---------------------|
    /// | `SMTP_HOST`     | yes      |                     |
    /// | `SMTP_PORT`     | no       | `587`               |
    /// | `SMTP_FROM`     | no       | `noreply@localhost` |
    /// | `SMTP_USER`     | no       |                     |
    /// | `SMTP_PASSWORD` | no       |                     |
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let smtp_host = lookup("SMTP_HOST").filter(|h| !h.trim().is_empty())?;
        Some(Self {
            smtp_host,
            smtp_port: lookup("SMTP_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: lookup("SMTP_FROM").unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: lookup("SMTP_USER"),
            smtp_password: lookup("SMTP_PASSWORD"),
        })
    }
}

// ---------------------------------------------------------------------------
// Messages and queue
// ---------------------------------------------------------------------------

/// Plain-text message waiting for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sender half handed to request handlers
#[derive(Debug, Clone)]
pub struct EmailQueue {
    tx: mpsc::UnboundedSender<OutgoingEmail>,
}

impl EmailQueue {
    /// Create a queue and the receiver the worker consumes
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutgoingEmail>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue and return immediately
    ///
    /// Never fails the caller. A closed worker is only logged.
    pub fn enqueue(&self, email: OutgoingEmail) {
        let subject = email.subject.clone();
        if self.tx.send(email).is_err() {
            tracing::warn!(subject = %subject, "Email worker is not running; message dropped");
        }
    }
}

// ---------------------------------------------------------------------------
// SMTP delivery
// ---------------------------------------------------------------------------

/// lettre STARTTLS relay transport
pub struct SmtpMailer {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            config,
        })
    }

    pub async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport.send(message).await?;
        Ok(())
    }
}

/// Background delivery task
pub struct EmailWorker;

impl EmailWorker {
    /// Spawn a detached task draining `rx`
    ///
    /// The task ends when every [`EmailQueue`] clone has been dropped.
    pub fn spawn(
        config: Option<EmailConfig>,
        mut rx: mpsc::UnboundedReceiver<OutgoingEmail>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mailer = match config.map(SmtpMailer::new).transpose() {
                Ok(mailer) => mailer,
                Err(e) => {
                    tracing::error!(error = %e, "SMTP transport could not be created");
                    None
                }
            };

            while let Some(email) = rx.recv().await {
                let Some(mailer) = &mailer else {
                    tracing::warn!(
                        subject = %email.subject,
                        "Email delivery is not configured; message dropped"
                    );
                    continue;
                };

                match mailer.send(&email).await {
                    Ok(()) => tracing::info!(subject = %email.subject, "Email sent"),
                    Err(e) => tracing::error!(
                        error = %e,
                        subject = %email.subject,
                        "Email delivery failed"
                    ),
                }
            }

            tracing::debug!("Email worker stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutgoingEmail {
        OutgoingEmail {
            to: "alice@example.com".to_string(),
            subject: "Password Reset Request".to_string(),
            body: "link".to_string(),
        }
    }

    #[test]
    fn test_from_lookup_without_host() {
        assert!(EmailConfig::from_lookup(|_| None).is_none());
        assert!(EmailConfig::from_lookup(|k| (k == "SMTP_HOST").then(|| " ".to_string())).is_none());
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config =
            EmailConfig::from_lookup(|k| (k == "SMTP_HOST").then(|| "smtp.example.com".to_string()))
                .unwrap();
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.from_address, "noreply@localhost");
        assert!(config.smtp_user.is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        let config = EmailConfig {
            smtp_host: "h".into(),
            smtp_port: 25,
            from_address: "a@b.c".into(),
            smtp_user: Some("u".into()),
            smtp_password: Some("hunter2".into()),
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn test_enqueue_is_received() {
        let (queue, mut rx) = EmailQueue::channel();
        queue.enqueue(sample());
        assert_eq!(rx.recv().await, Some(sample()));
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_gone_does_not_panic() {
        let (queue, rx) = EmailQueue::channel();
        drop(rx);
        queue.enqueue(sample());
    }

    #[tokio::test]
    async fn test_unconfigured_worker_drains_and_stops() {
        let (queue, rx) = EmailQueue::channel();
        let handle = EmailWorker::spawn(None, rx);
        queue.enqueue(sample());
        drop(queue);
        tokio_test::assert_ok!(handle.await);
    }

    #[test]
    fn test_email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
