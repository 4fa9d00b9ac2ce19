//! # Ticketflow: Event-driven Ticket Triage Pipeline
//!
//! Ticketflow routes incoming support tickets to qualified human responders
//! using an AI-assisted triage step. The core is a durable, step-based
//! workflow that runs after ticket creation: fetch the ticket, mark it in
//! review, classify it, persist the enrichment, resolve an assignee, and
//! notify them, with per-step retries, non-retriable short-circuiting, and
//! idempotent writes throughout.
//!
//! ## Core Concepts
//!
//! - **Domain events**: named triggers (`ticket.created`, `user.signup`)
//!   with JSON payloads, delivered at least once
//! - **Workflows**: strict sequences of named, retriable, idempotent steps
//! - **Stores**: repository traits over the external relational store,
//!   with version-guarded atomic patches
//! - **Classifier**: one HTTP call producing structured enrichment, or
//!   nothing, never a fatal error
//! - **Resolver**: pure, deterministic two-tier assignee selection
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use ticketflow::model::{Ticket, User, UserId, UserRole};
//! use ticketflow::store::{MemoryStore, TicketStore, UserStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! // Seed the store the way an external CRUD surface would.
//! let store = Arc::new(MemoryStore::new());
//! let responder = User::new(
//!     "dba@example.com",
//!     UserRole::Responder,
//!     vec!["Database".to_string()],
//! );
//! store.insert_user(responder).await.unwrap();
//!
//! let ticket = Ticket::new(
//!     "Queries time out",
//!     "Production queries take 30s since the last deploy.",
//!     UserId::new(),
//!     Utc::now() + Duration::days(2),
//! );
//! store.insert_ticket(ticket).await.unwrap();
//! # }
//! ```
//!
//! Wiring the full pipeline (classifier, notifier, dispatcher) happens in
//! [`service::Service::start`]; see that type for a complete example.
//!
//! ## Error Handling
//!
//! Components return `thiserror` enums annotated with [`miette::Diagnostic`]
//! codes under `ticketflow::…`. Only "record not found" is fatal to a run;
//! transient dependency failures retry under the step budget, a malformed
//! classifier response degrades to "no enrichment", and a lost notification
//! is logged and swallowed.
//!
//! ## Module Guide
//!
//! - [`model`] - Tickets, users, patches, and the triage result
//! - [`store`] - Repository traits and the in-memory reference store
//! - [`classifier`] - Classification client and response parsing
//! - [`assignment`] - Assignee resolution
//! - [`notifier`] - Email delivery seam
//! - [`workflow`] - Step machinery and the triage/signup workflows
//! - [`dispatch`] - Domain events, handler registry, re-delivery
//! - [`event_bus`] - Observability events fanned out to sinks
//! - [`service`] - End-to-end assembly
//! - [`config`] - Environment-resolved configuration
//! - [`telemetry`] - Tracing setup and event formatting

pub mod assignment;
pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod event_bus;
pub mod model;
pub mod notifier;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod workflow;
