//! Email notification seam.
//!
//! The workflow engine only needs `send(to, subject, body)`. [`HttpNotifier`]
//! posts to a transactional-mail HTTP API; [`MemoryNotifier`] records sends
//! for test assertions, mirroring the memory sink on the event bus.

use async_trait::async_trait;
use miette::Diagnostic;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::MailerConfig;

/// Errors surfaced by a notification send.
#[derive(Debug, Error, Diagnostic)]
pub enum NotifierError {
    /// The mail API could not be reached.
    #[error("mailer transport failure: {message}")]
    #[diagnostic(code(ticketflow::notifier::transport))]
    Transport { message: String },

    /// The mail API rejected the message.
    #[error("mailer rejected message with status {status}: {body}")]
    #[diagnostic(code(ticketflow::notifier::rejected))]
    Rejected { status: u16, body: String },
}

impl NotifierError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Transport failures may succeed on retry; rejections will not.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, NotifierError::Transport { .. })
    }
}

impl From<reqwest::Error> for NotifierError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Delivery seam for assignment and welcome emails.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError>;
}

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Notifier backed by a transactional-mail HTTP API.
pub struct HttpNotifier {
    http_client: reqwest::Client,
    config: MailerConfig,
}

impl HttpNotifier {
    #[must_use]
    pub fn new(config: MailerConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        let request = MailRequest {
            from: &self.config.sender,
            to,
            subject,
            text: body,
        };

        let mut builder = self.http_client.post(&self.config.endpoint).json(&request);
        if let Some(token) = &self.config.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%to, %subject, "notification delivered");
        Ok(())
    }
}

/// A notification recorded by [`MemoryNotifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// In-memory notifier for tests and local runs.
#[derive(Clone, Default)]
pub struct MemoryNotifier {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything sent so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SentMail> {
        self.sent.lock().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        self.sent.lock().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
