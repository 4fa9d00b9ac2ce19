//! Event handlers binding domain events to workflow runs.
//!
//! The dispatcher re-delivers an event when its handler fails retriably, so
//! the mapping here is the policy knob: abandoned runs (budget exhausted on
//! a transient dependency) ask for re-delivery; aborted runs (record gone)
//! are terminal and consume the event.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use super::signup::{SignupOutcome, SignupWorkflow};
use super::triage::{TriageOutcome, TriageWorkflow};
use crate::dispatch::{EventHandler, HandlerError};
use crate::model::{TicketId, UserId};

#[derive(Debug, Deserialize)]
struct TicketCreatedPayload {
    ticket_id: TicketId,
}

#[derive(Debug, Deserialize)]
struct UserSignupPayload {
    user_id: UserId,
}

/// Handler for `ticket.created`: runs the triage workflow.
pub struct TicketCreatedHandler {
    workflow: Arc<TriageWorkflow>,
}

impl TicketCreatedHandler {
    pub fn new(workflow: Arc<TriageWorkflow>) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl EventHandler for TicketCreatedHandler {
    async fn handle(&self, payload: Value) -> Result<(), HandlerError> {
        let payload: TicketCreatedPayload = serde_json::from_value(payload)
            .map_err(|e| HandlerError::fatal(format!("malformed ticket.created payload: {e}")))?;

        let report = self.workflow.run(payload.ticket_id).await;
        match report.outcome {
            TriageOutcome::Completed { .. } | TriageOutcome::Aborted { .. } => Ok(()),
            TriageOutcome::Abandoned { step, reason } => Err(HandlerError::retriable(format!(
                "triage abandoned at {step}: {reason}"
            ))),
        }
    }
}

/// Handler for `user.signup`: runs the welcome-email workflow.
pub struct UserSignupHandler {
    workflow: Arc<SignupWorkflow>,
}

impl UserSignupHandler {
    pub fn new(workflow: Arc<SignupWorkflow>) -> Self {
        Self { workflow }
    }
}

#[async_trait]
impl EventHandler for UserSignupHandler {
    async fn handle(&self, payload: Value) -> Result<(), HandlerError> {
        let payload: UserSignupPayload = serde_json::from_value(payload)
            .map_err(|e| HandlerError::fatal(format!("malformed user.signup payload: {e}")))?;

        let report = self.workflow.run(payload.user_id).await;
        match report.outcome {
            SignupOutcome::Completed | SignupOutcome::Aborted { .. } => Ok(()),
            SignupOutcome::Abandoned { step, reason } => Err(HandlerError::retriable(format!(
                "signup abandoned at {step}: {reason}"
            ))),
        }
    }
}
