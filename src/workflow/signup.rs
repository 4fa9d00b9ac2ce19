//! The signup workflow: fetch the user, send the welcome email.
//!
//! Deliberately tiny, but it follows the exact same step contract as
//! triage: named steps, per-step retry budget, non-retriable short-circuit
//! on a missing record, and run-boundary error absorption.

use std::sync::Arc;

use tracing::{error, info, instrument};
use uuid::Uuid;

use super::step::{RetryPolicy, StepContext, StepError, run_step};
use crate::event_bus::Event;
use crate::model::{User, UserId};
use crate::notifier::Notifier;
use crate::store::UserStore;

const WELCOME_SUBJECT: &str = "Welcome to the support desk";
const WELCOME_BODY: &str = "Hi,\n\nThanks for signing up. We're glad to have you onboard!\n\nBest regards,\nThe support team";

/// Terminal outcome of one signup run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignupOutcome {
    Completed,
    Aborted { step: &'static str, reason: String },
    Abandoned { step: &'static str, reason: String },
}

/// Report returned from [`SignupWorkflow::run`].
#[derive(Clone, Debug)]
pub struct SignupReport {
    pub run_id: String,
    pub user_id: UserId,
    pub outcome: SignupOutcome,
}

struct RunFailure {
    step: &'static str,
    error: StepError,
}

/// Welcome-email workflow triggered by `user.signup`.
pub struct SignupWorkflow {
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    events: flume::Sender<Event>,
}

impl SignupWorkflow {
    pub fn new(
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
        events: flume::Sender<Event>,
    ) -> Self {
        Self {
            users,
            notifier,
            retry,
            events,
        }
    }

    /// Execute one signup run. Like triage, failures are absorbed here and
    /// reported through the outcome.
    #[instrument(skip(self), fields(%user_id))]
    pub async fn run(&self, user_id: UserId) -> SignupReport {
        let run_id = format!("signup-{}", Uuid::new_v4());
        let ctx = StepContext::new(run_id.clone(), "signup", self.events.clone());

        match self.execute(&ctx, user_id).await {
            Ok(()) => {
                info!(run = %run_id, "signup run completed");
                SignupReport {
                    run_id,
                    user_id,
                    outcome: SignupOutcome::Completed,
                }
            }
            Err(failure) => {
                let reason = failure.error.to_string();
                error!(run = %run_id, step = failure.step, error = %failure.error, "signup run failed");
                let _ = ctx.emit(failure.step, format!("run failed: {reason}"));
                let outcome = if failure.error.is_retriable() {
                    SignupOutcome::Abandoned {
                        step: failure.step,
                        reason,
                    }
                } else {
                    SignupOutcome::Aborted {
                        step: failure.step,
                        reason,
                    }
                };
                SignupReport {
                    run_id,
                    user_id,
                    outcome,
                }
            }
        }
    }

    async fn execute(&self, ctx: &StepContext, user_id: UserId) -> Result<(), RunFailure> {
        let at = |step: &'static str| move |error: StepError| RunFailure { step, error };

        let user = run_step(ctx, &self.retry, "fetch-user", || self.fetch_user(user_id))
            .await
            .map_err(at("fetch-user"))?;

        run_step(ctx, &self.retry, "send-welcome-email", || {
            self.send_welcome(&user)
        })
        .await
        .map_err(at("send-welcome-email"))?;

        Ok(())
    }

    async fn fetch_user(&self, id: UserId) -> Result<User, StepError> {
        self.users.get_user(id).await.map_err(Into::into)
    }

    async fn send_welcome(&self, user: &User) -> Result<(), StepError> {
        self.notifier
            .send(&user.email, WELCOME_SUBJECT, WELCOME_BODY)
            .await?;
        Ok(())
    }
}
