//! In-memory reference implementation of the store traits.

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{StoreError, TicketStore, UserStore};
use crate::model::{Ticket, TicketId, TicketPatch, User, UserId, UserRole};

/// Thread-safe in-memory store for tickets and users.
///
/// Cheap to clone conceptually (wrap it in an `Arc`), safe to share across
/// concurrent triage runs. Version guarding mirrors what a relational adapter
/// would do with a `WHERE version = ?` update.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tickets: RwLock<FxHashMap<TicketId, Ticket>>,
    users: RwLock<FxHashMap<UserId, User>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tickets currently stored. Test convenience.
    #[must_use]
    pub fn ticket_count(&self) -> usize {
        self.tickets.read().len()
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError> {
        self.tickets
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::TicketNotFound { id })
    }

    async fn insert_ticket(&self, ticket: Ticket) -> Result<(), StoreError> {
        self.tickets.write().insert(ticket.id, ticket);
        Ok(())
    }

    async fn update_ticket(
        &self,
        id: TicketId,
        expected_version: u64,
        patch: TicketPatch,
    ) -> Result<Ticket, StoreError> {
        let mut tickets = self.tickets.write();
        let ticket = tickets
            .get_mut(&id)
            .ok_or(StoreError::TicketNotFound { id })?;
        if ticket.version != expected_version {
            return Err(StoreError::VersionConflict {
                id,
                expected: expected_version,
                found: ticket.version,
            });
        }
        ticket.apply(patch);
        ticket.version += 1;
        Ok(ticket.clone())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user(&self, id: UserId) -> Result<User, StoreError> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::UserNotFound { id })
    }

    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.users.write().insert(user.id, user);
        Ok(())
    }

    async fn find_responders(&self, skills: &[String]) -> Result<Vec<User>, StoreError> {
        let mut matches: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| u.role == UserRole::Responder)
            .filter(|u| u.skills.iter().any(|s| skills.contains(s)))
            .cloned()
            .collect();
        matches.sort_by_key(|u| (u.created_at, u.id));
        Ok(matches)
    }

    async fn find_admins(&self) -> Result<Vec<User>, StoreError> {
        let mut admins: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| u.role == UserRole::Admin)
            .cloned()
            .collect();
        admins.sort_by_key(|u| (u.created_at, u.id));
        Ok(admins)
    }
}
