//! Domain model for the ticket-triage pipeline.
//!
//! The records here are owned by the store; workflow steps never hold them in
//! memory across step boundaries: each step re-reads what it needs and writes
//! back through a [`TicketPatch`]. Patch application is a pure overwrite, so
//! re-applying the same patch after a partial failure is always safe.
//!
//! # Core Types
//!
//! - [`Ticket`] / [`User`]: the persistent records
//! - [`TicketPatch`]: a partial, idempotent field update
//! - [`TriageResult`]: the ephemeral classifier output, consumed once
//! - [`Priority`], [`TicketStatus`], [`UserRole`]: closed enums
//!
//! # Examples
//!
//! ```rust
//! use ticketflow::model::{Priority, Ticket, TicketPatch, TicketStatus, UserId};
//! use chrono::{Duration, Utc};
//!
//! let mut ticket = Ticket::new(
//!     "Login page broken",
//!     "The login form throws a 500 on submit.",
//!     UserId::new(),
//!     Utc::now() + Duration::days(3),
//! );
//! assert_eq!(ticket.status, TicketStatus::Created);
//!
//! ticket.apply(
//!     TicketPatch::new()
//!         .with_status(TicketStatus::InReview)
//!         .with_priority(Priority::High),
//! );
//! assert_eq!(ticket.status, TicketStatus::InReview);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a [`Ticket`].
///
/// Wraps a v4 UUID. Ordering is total and stable, which the assignment
/// resolver relies on for deterministic tie-breaking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub Uuid);

impl TicketId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a [`User`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a ticket.
///
/// Transitions are monotonic: `Created → InReview → Assigned`. The ordering
/// derive is load-bearing: [`Ticket::apply`] only ever advances the status,
/// so a straggler triage run can never regress an assignment made by a
/// faster duplicate run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Created,
    InReview,
    Assigned,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Created => "created",
            TicketStatus::InReview => "in_review",
            TicketStatus::Assigned => "assigned",
        };
        write!(f, "{s}")
    }
}

/// Ticket priority as persisted on the record.
///
/// The classifier reports priority as free text; [`Priority::clamp`] maps
/// anything outside the closed set back to `Medium`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Map a raw classifier-reported priority onto the closed enum.
    ///
    /// Unrecognized values (e.g. `"urgent"`) clamp to `Medium`.
    ///
    /// # Examples
    /// ```
    /// use ticketflow::model::Priority;
    ///
    /// assert_eq!(Priority::clamp("high"), Priority::High);
    /// assert_eq!(Priority::clamp("HIGH"), Priority::High);
    /// assert_eq!(Priority::clamp("urgent"), Priority::Medium);
    /// ```
    #[must_use]
    pub fn clamp(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Priority::Low,
            "medium" => Priority::Medium,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        };
        write!(f, "{s}")
    }
}

/// Role of a user within the support system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Requester,
    Responder,
    Admin,
}

/// A support ticket record.
///
/// `version` is the optimistic-concurrency token: every store update checks
/// it and bumps it, rejecting stale writes so overlapping triage runs cannot
/// interleave half-applied states.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub helpful_notes: String,
    pub skills: Vec<String>,
    pub assignee: Option<UserId>,
    pub created_by: UserId,
    pub deadline: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub version: u64,
}

impl Ticket {
    /// Create a fresh ticket in `Created` status with no enrichment.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        created_by: UserId,
        deadline: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TicketId::new(),
            title: title.into(),
            description: description.into(),
            status: TicketStatus::Created,
            priority: Priority::default(),
            helpful_notes: String::new(),
            skills: Vec::new(),
            assignee: None,
            created_by,
            deadline,
            created_at: Utc::now(),
            version: 0,
        }
    }

    /// Apply a partial update in place.
    ///
    /// Every field is a pure overwrite; status only ever advances. The
    /// version token is not touched here; bumping it is the store's job.
    pub fn apply(&mut self, patch: TicketPatch) {
        if let Some(status) = patch.status {
            if status > self.status {
                self.status = status;
            }
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(notes) = patch.helpful_notes {
            self.helpful_notes = notes;
        }
        if let Some(skills) = patch.skills {
            self.skills = skills;
        }
        if let Some(assignee) = patch.assignee {
            self.assignee = assignee;
        }
    }
}

/// Partial update for a [`Ticket`].
///
/// All fields are optional so callers update only what they care about.
/// `assignee` is doubly optional: the outer `Option` is "do I touch this
/// field", the inner one is the value written (explicit null clears it).
///
/// # Examples
///
/// ```rust
/// use ticketflow::model::{Priority, TicketPatch, TicketStatus};
///
/// let patch = TicketPatch::new()
///     .with_status(TicketStatus::InReview)
///     .with_priority(Priority::High)
///     .with_skills(vec!["Database".to_string()]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub helpful_notes: Option<String>,
    pub skills: Option<Vec<String>>,
    pub assignee: Option<Option<UserId>>,
}

impl TicketPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_helpful_notes(mut self, notes: impl Into<String>) -> Self {
        self.helpful_notes = Some(notes.into());
        self
    }

    #[must_use]
    pub fn with_skills(mut self, skills: Vec<String>) -> Self {
        self.skills = Some(skills);
        self
    }

    /// Write the assignee field, `None` meaning "clear it".
    #[must_use]
    pub fn with_assignee(mut self, assignee: Option<UserId>) -> Self {
        self.assignee = Some(assignee);
        self
    }
}

/// A user record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub role: UserRole,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(email: impl Into<String>, role: UserRole, skills: Vec<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            role,
            skills,
            created_at: Utc::now(),
        }
    }
}

/// Structured output of one classification call.
///
/// Ephemeral: produced by the classifier, consumed once by the
/// persist-classification step, never stored as-is. `priority` stays a raw
/// string here; clamping to the closed enum happens at persist time.
///
/// Field names follow the model's JSON contract; all fields default so a
/// sparse-but-valid JSON object still parses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default, rename = "helpfulNotes")]
    pub helpful_notes: String,
    #[serde(default, rename = "relatedSkills", alias = "skills")]
    pub skills: Vec<String>,
}
