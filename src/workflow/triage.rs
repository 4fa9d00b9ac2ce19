//! The triage workflow: fetch, mark-in-review, classify, persist, assign,
//! notify.
//!
//! One [`TriageWorkflow::run`] call owns the full lifecycle of one triage
//! run for one ticket. Steps execute strictly in order; each await on a
//! store, classifier, or mailer call is a suspension point and nothing
//! else blocks. Re-running for the same ticket is safe: every write is a
//! version-guarded pure overwrite and status only advances.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::step::{RetryPolicy, StepContext, StepError, run_step};
use crate::assignment;
use crate::classifier::Classifier;
use crate::event_bus::Event;
use crate::model::{
    Priority, Ticket, TicketId, TicketPatch, TicketStatus, TriageResult, UserId,
};
use crate::notifier::Notifier;
use crate::store::{StoreError, TicketStore, UserStore};

/// Terminal outcome of one triage run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriageOutcome {
    /// All steps ran; the ticket is assigned iff `assignee` is `Some`.
    Completed { assignee: Option<UserId> },
    /// A non-retriable failure stopped the run; no further steps executed.
    Aborted { step: &'static str, reason: String },
    /// The retry budget ran out mid-pipeline; the ticket stays in whatever
    /// state the last successful step persisted.
    Abandoned { step: &'static str, reason: String },
}

/// Report returned from [`TriageWorkflow::run`].
#[derive(Clone, Debug)]
pub struct TriageReport {
    pub run_id: String,
    pub ticket_id: TicketId,
    pub outcome: TriageOutcome,
}

struct RunFailure {
    step: &'static str,
    error: StepError,
}

/// Orchestrates the ordered triage steps for one ticket at a time.
///
/// Shared immutably across concurrent runs; all mutable state lives in the
/// store behind version-guarded updates.
pub struct TriageWorkflow {
    tickets: Arc<dyn TicketStore>,
    users: Arc<dyn UserStore>,
    classifier: Arc<dyn Classifier>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    events: flume::Sender<Event>,
}

impl TriageWorkflow {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        users: Arc<dyn UserStore>,
        classifier: Arc<dyn Classifier>,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
        events: flume::Sender<Event>,
    ) -> Self {
        Self {
            tickets,
            users,
            classifier,
            notifier,
            retry,
            events,
        }
    }

    /// Execute one full triage run.
    ///
    /// Never returns an error: failures are absorbed at this boundary,
    /// logged, and reported through the outcome so the caller (usually an
    /// event handler) can decide whether the event deserves re-delivery.
    #[instrument(skip(self), fields(%ticket_id))]
    pub async fn run(&self, ticket_id: TicketId) -> TriageReport {
        let run_id = format!("triage-{}", Uuid::new_v4());
        let ctx = StepContext::new(run_id.clone(), "triage", self.events.clone());

        match self.execute(&ctx, ticket_id).await {
            Ok(assignee) => {
                info!(run = %run_id, ?assignee, "triage run completed");
                let _ = ctx.emit(
                    "complete",
                    match assignee {
                        Some(user) => format!("ticket assigned to {user}"),
                        None => "no assignee resolved; awaiting manual assignment".to_string(),
                    },
                );
                TriageReport {
                    run_id,
                    ticket_id,
                    outcome: TriageOutcome::Completed { assignee },
                }
            }
            Err(failure) => {
                let reason = failure.error.to_string();
                error!(run = %run_id, step = failure.step, error = %failure.error, "triage run failed");
                let _ = ctx.emit(failure.step, format!("run failed: {reason}"));
                let outcome = if failure.error.is_retriable() {
                    TriageOutcome::Abandoned {
                        step: failure.step,
                        reason,
                    }
                } else {
                    TriageOutcome::Aborted {
                        step: failure.step,
                        reason,
                    }
                };
                TriageReport {
                    run_id,
                    ticket_id,
                    outcome,
                }
            }
        }
    }

    async fn execute(
        &self,
        ctx: &StepContext,
        ticket_id: TicketId,
    ) -> Result<Option<UserId>, RunFailure> {
        let at = |step: &'static str| move |error: StepError| RunFailure { step, error };

        let ticket = run_step(ctx, &self.retry, "fetch-ticket", || {
            self.fetch_ticket(ticket_id)
        })
        .await
        .map_err(at("fetch-ticket"))?;

        run_step(ctx, &self.retry, "mark-in-review", || {
            self.mark_in_review(ticket_id)
        })
        .await
        .map_err(at("mark-in-review"))?;

        // Transport trouble is retried under the step budget like any other
        // dependency; once the budget is gone the run continues with no
        // enrichment instead of abandoning.
        let classification =
            match run_step(ctx, &self.retry, "classify", || self.classify(&ticket)).await {
                Ok(result) => result,
                Err(err) => {
                    warn!(error = %err, "classification unavailable; continuing without enrichment");
                    let _ = ctx.emit("classify", format!("classification unavailable: {err}"));
                    None
                }
            };

        let staged = run_step(ctx, &self.retry, "persist-classification", || {
            self.persist_classification(ticket_id, classification.as_ref())
        })
        .await
        .map_err(at("persist-classification"))?;

        let assignee = run_step(ctx, &self.retry, "resolve-assignee", || {
            self.resolve_and_assign(ticket_id, &staged)
        })
        .await
        .map_err(at("resolve-assignee"))?;

        if let Some(user_id) = assignee {
            // The assignment is already durable; a lost email must not
            // re-trigger the pipeline.
            if let Err(err) = run_step(ctx, &self.retry, "notify", || {
                self.notify_assignee(ticket_id, user_id)
            })
            .await
            {
                warn!(error = %err, "notification failed; assignment already persisted");
                let _ = ctx.emit("notify", format!("notification failed: {err}"));
            }
        }

        Ok(assignee)
    }

    async fn fetch_ticket(&self, id: TicketId) -> Result<Ticket, StepError> {
        self.tickets.get_ticket(id).await.map_err(Into::into)
    }

    async fn mark_in_review(&self, id: TicketId) -> Result<(), StepError> {
        self.patch_ticket(id, TicketPatch::new().with_status(TicketStatus::InReview))
            .await?;
        Ok(())
    }

    async fn classify(&self, ticket: &Ticket) -> Result<Option<TriageResult>, StepError> {
        let result = self
            .classifier
            .classify(&ticket.title, &ticket.description)
            .await?;
        Ok(result)
    }

    /// Write priority, notes, and skills in one atomic patch; stage the
    /// skill tags for assignment. With no classification there is nothing
    /// to persist and the staged set is empty.
    async fn persist_classification(
        &self,
        id: TicketId,
        classification: Option<&TriageResult>,
    ) -> Result<Vec<String>, StepError> {
        match classification {
            Some(result) => {
                let patch = TicketPatch::new()
                    .with_priority(Priority::clamp(&result.priority))
                    .with_helpful_notes(result.helpful_notes.clone())
                    .with_skills(result.skills.clone());
                self.patch_ticket(id, patch).await?;
                Ok(result.skills.clone())
            }
            None => Ok(Vec::new()),
        }
    }

    /// Resolve the assignee over the current user set and write it (or
    /// null) in one atomic patch. A non-null assignee advances the ticket
    /// to `Assigned`; otherwise it stays `InReview`.
    async fn resolve_and_assign(
        &self,
        id: TicketId,
        skills: &[String],
    ) -> Result<Option<UserId>, StepError> {
        let responders = self.users.find_responders(skills).await?;
        let admins = self.users.find_admins().await?;
        let assignee = assignment::resolve(skills, &responders, &admins);

        let mut patch = TicketPatch::new().with_assignee(assignee);
        if assignee.is_some() {
            patch = patch.with_status(TicketStatus::Assigned);
        }
        self.patch_ticket(id, patch).await?;
        Ok(assignee)
    }

    async fn notify_assignee(&self, id: TicketId, assignee: UserId) -> Result<(), StepError> {
        let user = self.users.get_user(assignee).await?;
        let ticket = self.tickets.get_ticket(id).await?;
        self.notifier
            .send(
                &user.email,
                "Ticket assigned",
                &format!("A new ticket is assigned to you: {}", ticket.title),
            )
            .await?;
        Ok(())
    }

    /// Apply a patch under the optimistic version guard: read the current
    /// version, attempt the write, and on conflict re-read and re-apply.
    /// The patch itself is a pure overwrite, so re-application after a
    /// conflicting concurrent run converges instead of corrupting.
    async fn patch_ticket(&self, id: TicketId, patch: TicketPatch) -> Result<Ticket, StepError> {
        loop {
            let current = self.tickets.get_ticket(id).await.map_err(StepError::from)?;
            match self
                .tickets
                .update_ticket(id, current.version, patch.clone())
                .await
            {
                Ok(updated) => return Ok(updated),
                Err(StoreError::VersionConflict { .. }) => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }
}
