//! Repository traits over the external relational store.
//!
//! The pipeline never talks to a database directly; it consumes these traits.
//! Updates are field-scoped atomic patches guarded by the ticket's version
//! token; there are no multi-step transactions spanning workflow steps.
//!
//! [`MemoryStore`] is the in-process reference implementation used by tests
//! and local runs; production deployments supply their own adapter.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::model::{Ticket, TicketId, TicketPatch, User, UserId};

pub mod memory;

pub use memory::MemoryStore;

/// Errors surfaced by store operations.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The ticket does not exist (possibly deleted after event publication).
    #[error("ticket not found: {id}")]
    #[diagnostic(code(ticketflow::store::ticket_not_found))]
    TicketNotFound { id: TicketId },

    /// The user does not exist.
    #[error("user not found: {id}")]
    #[diagnostic(code(ticketflow::store::user_not_found))]
    UserNotFound { id: UserId },

    /// The ticket changed underneath the writer.
    #[error("stale write for ticket {id}: expected version {expected}, found {found}")]
    #[diagnostic(
        code(ticketflow::store::version_conflict),
        help("Re-read the ticket and re-apply the patch.")
    )]
    VersionConflict {
        id: TicketId,
        expected: u64,
        found: u64,
    },

    /// The backing store could not be reached.
    #[error("store unavailable: {message}")]
    #[diagnostic(code(ticketflow::store::unavailable))]
    Unavailable { message: String },
}

impl StoreError {
    /// Whether a caller may retry the operation as-is (after re-reading,
    /// in the version-conflict case).
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoreError::VersionConflict { .. } | StoreError::Unavailable { .. }
        )
    }
}

/// Ticket CRUD consumed by the workflow engine.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Load a ticket by id.
    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError>;

    /// Insert a new ticket record.
    async fn insert_ticket(&self, ticket: Ticket) -> Result<(), StoreError>;

    /// Atomically apply a partial update, guarded by the version token.
    ///
    /// Fails with [`StoreError::VersionConflict`] if the stored version no
    /// longer matches `expected_version`; on success the stored version is
    /// bumped and the updated record returned.
    async fn update_ticket(
        &self,
        id: TicketId,
        expected_version: u64,
        patch: TicketPatch,
    ) -> Result<Ticket, StoreError>;
}

/// User lookups consumed by the workflow engine and assignment resolver.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a user by id.
    async fn get_user(&self, id: UserId) -> Result<User, StoreError>;

    /// Insert a new user record.
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    /// All responders whose skill set intersects `skills` (non-empty
    /// intersection), ordered by creation time then id.
    ///
    /// An empty `skills` slice matches no one.
    async fn find_responders(&self, skills: &[String]) -> Result<Vec<User>, StoreError>;

    /// All admins, ordered by creation time then id.
    async fn find_admins(&self) -> Result<Vec<User>, StoreError>;
}
