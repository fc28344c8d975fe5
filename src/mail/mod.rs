use std::sync::Arc;

mod smtp;

pub use smtp::SmtpMailer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()>;
}

pub type DynMailer = Arc<dyn Mailer>;

/// Writes messages to the log instead of delivering them.
pub struct LogMailer;

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> anyhow::Result<()> {
        tracing::info!(to = %message.to, subject = %message.subject, "email (not delivered)");
        Ok(())
    }
}

/// Sends `message` and logs, rather than returns, any failure.
pub async fn notify(mailer: &dyn Mailer, message: EmailMessage) {
    let to = message.to.clone();
    let subject = message.subject.clone();
    if let Err(err) = mailer.send(message).await {
        tracing::warn!(error = %err, %to, %subject, "email dispatch failed");
    }
}
