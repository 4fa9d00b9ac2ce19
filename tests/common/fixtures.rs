use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use ticketflow::classifier::{Classifier, ClassifierError};
use ticketflow::event_bus::Event;
use ticketflow::model::{
    Ticket, TicketId, TicketPatch, TriageResult, User, UserId, UserRole,
};
use ticketflow::notifier::{MemoryNotifier, Notifier, NotifierError};
use ticketflow::store::{MemoryStore, StoreError, TicketStore};
use ticketflow::workflow::RetryPolicy;

/// Retry policy with negligible delays so retry-path tests stay fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

/// Event channel whose receiver the test can drain or drop.
pub fn event_channel() -> (flume::Sender<Event>, flume::Receiver<Event>) {
    flume::unbounded()
}

pub fn ticket(title: &str, description: &str) -> Ticket {
    Ticket::new(title, description, UserId::new(), Utc::now())
}

/// A user with a controlled creation timestamp, for tie-break assertions.
pub fn user_created_at(email: &str, role: UserRole, skills: &[&str], minute: u32) -> User {
    let mut user = User::new(
        email,
        role,
        skills.iter().map(|s| s.to_string()).collect(),
    );
    user.created_at = Utc.with_ymd_and_hms(2026, 1, 1, 9, minute, 0).unwrap();
    user
}

pub fn responder(email: &str, skills: &[&str], minute: u32) -> User {
    user_created_at(email, UserRole::Responder, skills, minute)
}

pub fn admin(email: &str, minute: u32) -> User {
    user_created_at(email, UserRole::Admin, &[], minute)
}

pub fn triage_result(priority: &str, skills: &[&str]) -> TriageResult {
    TriageResult {
        summary: "summary".to_string(),
        priority: priority.to_string(),
        helpful_notes: "check the connection pool settings".to_string(),
        skills: skills.iter().map(|s| s.to_string()).collect(),
    }
}

/// Classifier returning a fixed result (or `None`) on every call.
pub struct StaticClassifier {
    pub result: Option<TriageResult>,
}

impl StaticClassifier {
    pub fn some(result: TriageResult) -> Self {
        Self {
            result: Some(result),
        }
    }

    pub fn empty() -> Self {
        Self { result: None }
    }
}

#[async_trait]
impl Classifier for StaticClassifier {
    async fn classify(
        &self,
        _title: &str,
        _description: &str,
    ) -> Result<Option<TriageResult>, ClassifierError> {
        Ok(self.result.clone())
    }
}

/// Classifier failing with a transport error N times before succeeding.
pub struct FlakyClassifier {
    failures_remaining: AtomicU32,
    result: Option<TriageResult>,
    pub calls: AtomicU32,
}

impl FlakyClassifier {
    pub fn new(failures: u32, result: Option<TriageResult>) -> Self {
        Self {
            failures_remaining: AtomicU32::new(failures),
            result,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Classifier for FlakyClassifier {
    async fn classify(
        &self,
        _title: &str,
        _description: &str,
    ) -> Result<Option<TriageResult>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ClassifierError::transport("connection refused"));
        }
        Ok(self.result.clone())
    }
}

/// Notifier failing with a transport error N times, recording successes.
pub struct FlakyNotifier {
    failures_remaining: AtomicU32,
    pub inner: MemoryNotifier,
}

impl FlakyNotifier {
    pub fn new(failures: u32) -> Self {
        Self {
            failures_remaining: AtomicU32::new(failures),
            inner: MemoryNotifier::new(),
        }
    }

    pub fn always_failing() -> Self {
        Self::new(u32::MAX)
    }
}

#[async_trait]
impl Notifier for FlakyNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifierError> {
        if self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(NotifierError::transport("smtp relay unreachable"));
        }
        self.inner.send(to, subject, body).await
    }
}

/// Ticket store wrapper that fails `update_ticket` N times with
/// `Unavailable`, then delegates.
pub struct FlakyTicketStore {
    pub inner: Arc<MemoryStore>,
    update_failures: AtomicU32,
}

impl FlakyTicketStore {
    pub fn new(inner: Arc<MemoryStore>, update_failures: u32) -> Self {
        Self {
            inner,
            update_failures: AtomicU32::new(update_failures),
        }
    }
}

#[async_trait]
impl TicketStore for FlakyTicketStore {
    async fn get_ticket(&self, id: TicketId) -> Result<Ticket, StoreError> {
        self.inner.get_ticket(id).await
    }

    async fn insert_ticket(&self, ticket: Ticket) -> Result<(), StoreError> {
        self.inner.insert_ticket(ticket).await
    }

    async fn update_ticket(
        &self,
        id: TicketId,
        expected_version: u64,
        patch: TicketPatch,
    ) -> Result<Ticket, StoreError> {
        if self
            .update_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable {
                message: "connection pool exhausted".to_string(),
            });
        }
        self.inner.update_ticket(id, expected_version, patch).await
    }
}
