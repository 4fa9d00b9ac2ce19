//! Step execution machinery: context, error taxonomy, and the retry loop.
//!
//! Every workflow is a strict sequence of named steps. A step is an async
//! operation that either succeeds, fails retriably (transient dependency
//! trouble), or fails fatally (the record is gone). [`run_step`] owns the
//! retry budget; components below it never retry on their own.
//!
//! # Error Handling
//!
//! Steps signal failure through [`StepError`]:
//! - [`StepError::NotFound`] is non-retriable and aborts the remainder of
//!   the run immediately.
//! - [`StepError::Dependency`] is retriable up to the configured budget;
//!   exhaustion abandons the run (except where a workflow explicitly
//!   degrades, as the classify step does).

use std::future::Future;
use std::time::Duration;

use miette::Diagnostic;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::classifier::ClassifierError;
use crate::event_bus::Event;
use crate::notifier::NotifierError;
use crate::store::StoreError;

/// Execution context threaded through one workflow run.
///
/// Carries the run identity and the observability-event sender so steps can
/// emit structured progress events without touching global state.
#[derive(Clone, Debug)]
pub struct StepContext {
    run_id: String,
    workflow: &'static str,
    event_sender: flume::Sender<Event>,
}

impl StepContext {
    pub fn new(
        run_id: impl Into<String>,
        workflow: &'static str,
        event_sender: flume::Sender<Event>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            workflow,
            event_sender,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn workflow(&self) -> &'static str {
        self.workflow
    }

    /// Emit a step-scoped event enriched with this run's metadata.
    pub fn emit(
        &self,
        step: &str,
        message: impl Into<String>,
    ) -> Result<(), StepContextError> {
        self.event_sender
            .send(Event::step_message_with_meta(
                self.run_id.clone(),
                step,
                self.workflow,
                message,
            ))
            .map_err(|_| StepContextError::EventBusUnavailable)
    }
}

/// Errors that can occur when using [`StepContext`] methods.
#[derive(Debug, Error, Diagnostic)]
pub enum StepContextError {
    /// Event could not be sent because the bus is gone.
    #[error("failed to emit event: event bus unavailable")]
    #[diagnostic(
        code(ticketflow::workflow::event_bus_unavailable),
        help("The event bus listener may have shut down already.")
    )]
    EventBusUnavailable,
}

/// Errors produced by workflow steps.
#[derive(Debug, Error, Diagnostic)]
pub enum StepError {
    /// The record this run operates on does not exist. Fatal to the run.
    #[error("{entity} not found: {id}")]
    #[diagnostic(
        code(ticketflow::workflow::not_found),
        help("The record may have been deleted after the event was published.")
    )]
    NotFound { entity: &'static str, id: String },

    /// A downstream dependency failed in a way that may heal on retry.
    #[error("dependency '{dependency}' failed: {source}")]
    #[diagnostic(code(ticketflow::workflow::dependency))]
    Dependency {
        dependency: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StepError {
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, StepError::Dependency { .. })
    }
}

impl From<StoreError> for StepError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TicketNotFound { id } => StepError::NotFound {
                entity: "ticket",
                id: id.to_string(),
            },
            StoreError::UserNotFound { id } => StepError::NotFound {
                entity: "user",
                id: id.to_string(),
            },
            other => StepError::Dependency {
                dependency: "store",
                source: Box::new(other),
            },
        }
    }
}

impl From<ClassifierError> for StepError {
    fn from(err: ClassifierError) -> Self {
        StepError::Dependency {
            dependency: "classifier",
            source: Box::new(err),
        }
    }
}

impl From<NotifierError> for StepError {
    fn from(err: NotifierError) -> Self {
        StepError::Dependency {
            dependency: "mailer",
            source: Box::new(err),
        }
    }
}

/// Retry budget and backoff shape for one step (or one event re-delivery).
///
/// `max_retries` counts attempts beyond the first; the default budget of 2
/// means a step runs at most three times.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries. Useful in tests.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before the given attempt (1-based), exponential with optional
    /// jitter, capped at `max_delay`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self
            .base_delay
            .mul_f64(self.backoff_multiplier.powi(exponent))
            .min(self.max_delay);
        if self.jitter {
            let jitter = rand::rng().random_range(0.0..0.1);
            delay.mul_f64(1.0 + jitter).min(self.max_delay)
        } else {
            delay
        }
    }
}

/// Execute one named step under the retry policy.
///
/// The operation closure is invoked fresh on every attempt, so effects must
/// be safe to re-apply (pure overwrites, never increments). Retriable
/// failures sleep through the backoff and try again until the budget runs
/// out; non-retriable failures return immediately.
pub async fn run_step<T, F, Fut>(
    ctx: &StepContext,
    policy: &RetryPolicy,
    name: &'static str,
    operation: F,
) -> Result<T, StepError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, StepError>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(step = name, attempt, "step recovered after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retriable() && attempt < policy.max_retries => {
                attempt += 1;
                warn!(step = name, attempt, error = %err, "step failed; retrying");
                let _ = ctx.emit(name, format!("attempt {attempt} failed: {err}; retrying"));
                tokio::time::sleep(policy.delay(attempt)).await;
            }
            Err(err) => return Err(err),
        }
    }
}
