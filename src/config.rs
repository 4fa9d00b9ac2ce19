//! Runtime configuration resolved from the environment.
//!
//! Everything has a workable local default; `.env` files are honored via
//! `dotenvy`. Builder-style `with_*` methods allow programmatic overrides,
//! which is what the test suite uses instead of mutating the process
//! environment.

use std::time::Duration;

use crate::workflow::step::RetryPolicy;

/// Classifier endpoint configuration.
///
/// The endpoint is expected to speak the OpenAI-compatible chat-completions
/// protocol; local model servers expose the same shape.
#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434/v1/chat/completions".to_string(),
            model: "qwen3:4b".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClassifierConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("TICKETFLOW_CLASSIFIER_URL").unwrap_or(defaults.endpoint),
            model: std::env::var("TICKETFLOW_CLASSIFIER_MODEL").unwrap_or(defaults.model),
            api_key: std::env::var("TICKETFLOW_CLASSIFIER_API_KEY").ok(),
            timeout: defaults.timeout,
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Transactional-mail API configuration.
#[derive(Clone, Debug)]
pub struct MailerConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub sender: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8025/api/send".to_string(),
            token: None,
            sender: "support@ticketflow.local".to_string(),
        }
    }
}

impl MailerConfig {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("TICKETFLOW_MAILER_URL").unwrap_or(defaults.endpoint),
            token: std::env::var("TICKETFLOW_MAILER_TOKEN").ok(),
            sender: std::env::var("TICKETFLOW_MAILER_FROM").unwrap_or(defaults.sender),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }
}

/// Top-level service configuration.
///
/// `retry` governs the per-step budget inside a workflow run; `redelivery`
/// governs how often the dispatcher re-delivers an event whose handler
/// failed retriably.
#[derive(Clone, Debug, Default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub mailer: MailerConfig,
    pub retry: RetryPolicy,
    pub redelivery: RetryPolicy,
}

impl Config {
    /// Resolve configuration from the process environment (and `.env`).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            classifier: ClassifierConfig::from_env(),
            mailer: MailerConfig::from_env(),
            retry: RetryPolicy::default(),
            redelivery: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_mailer(mut self, mailer: MailerConfig) -> Self {
        self.mailer = mailer;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_redelivery(mut self, redelivery: RetryPolicy) -> Self {
        self.redelivery = redelivery;
        self
    }
}
