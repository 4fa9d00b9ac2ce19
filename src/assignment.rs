//! Assignment resolution: pick the responder for a triaged ticket.
//!
//! A pure function over the user lists supplied at call time: no caching,
//! no memory of prior assignments. Callers feed it the store's
//! `find_responders` / `find_admins` results; the resolver re-checks role
//! and intersection itself so the decision logic is fully testable without
//! a store.

use crate::model::{User, UserId, UserRole};

/// Select an assignee for a ticket given its inferred skills.
///
/// Two deterministic tiers:
/// 1. Responders whose skill set intersects `required_skills`; earliest
///    created wins. An empty `required_skills` yields no tier-1 candidate.
/// 2. Fallback: any admin, earliest created.
///
/// Ties on creation time break by id ordering, making the selection total
/// and stable. Returns `None` when neither tier produces a candidate; the
/// ticket then stays in review awaiting manual assignment.
///
/// # Examples
///
/// ```rust
/// use ticketflow::assignment::resolve;
/// use ticketflow::model::{User, UserRole};
///
/// let dba = User::new("dba@example.com", UserRole::Responder, vec!["Database".into()]);
/// let admin = User::new("admin@example.com", UserRole::Admin, vec![]);
///
/// let skills = vec!["Database".to_string()];
/// assert_eq!(resolve(&skills, &[dba.clone()], &[admin.clone()]), Some(dba.id));
/// assert_eq!(resolve(&skills, &[], &[admin.clone()]), Some(admin.id));
/// assert_eq!(resolve(&skills, &[], &[]), None);
/// ```
#[must_use]
pub fn resolve(required_skills: &[String], responders: &[User], admins: &[User]) -> Option<UserId> {
    if !required_skills.is_empty() {
        let candidate = responders
            .iter()
            .filter(|u| u.role == UserRole::Responder)
            .filter(|u| u.skills.iter().any(|s| required_skills.contains(s)))
            .min_by_key(|u| (u.created_at, u.id));
        if let Some(user) = candidate {
            return Some(user.id);
        }
    }

    admins
        .iter()
        .filter(|u| u.role == UserRole::Admin)
        .min_by_key(|u| (u.created_at, u.id))
        .map(|u| u.id)
}
