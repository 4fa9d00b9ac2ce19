//! Workflow engine: ordered, retriable, idempotent step pipelines.
//!
//! Two workflows ship today: [`TriageWorkflow`] for `ticket.created` and
//! [`SignupWorkflow`] for `user.signup`. Both are built from the same
//! machinery in [`step`]: named steps executed strictly in order, each with
//! an independent retry budget, non-retriable errors short-circuiting the
//! run, and every other failure absorbed at the run boundary.

pub mod handlers;
pub mod signup;
pub mod step;
pub mod triage;

pub use handlers::{TicketCreatedHandler, UserSignupHandler};
pub use signup::{SignupOutcome, SignupReport, SignupWorkflow};
pub use step::{RetryPolicy, StepContext, StepContextError, StepError, run_step};
pub use triage::{TriageOutcome, TriageReport, TriageWorkflow};
