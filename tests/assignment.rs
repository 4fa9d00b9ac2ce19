mod common;
use common::*;

use proptest::prelude::*;
use ticketflow::assignment::resolve;
use ticketflow::model::{User, UserRole};

fn skills(tags: &[&str]) -> Vec<String> {
    tags.iter().map(|s| s.to_string()).collect()
}

#[test]
fn earliest_created_matching_responder_wins() {
    let older = responder("older@example.com", &["Database"], 0);
    let newer = responder("newer@example.com", &["Database", "API"], 5);

    let chosen = resolve(&skills(&["Database"]), &[newer.clone(), older.clone()], &[]);
    assert_eq!(chosen, Some(older.id));
}

#[test]
fn responder_without_skill_overlap_is_skipped() {
    let frontend = responder("fe@example.com", &["Frontend"], 0);
    let dba = responder("dba@example.com", &["Database"], 5);

    let chosen = resolve(&skills(&["Database"]), &[frontend, dba.clone()], &[]);
    assert_eq!(chosen, Some(dba.id));
}

#[test]
fn empty_required_skills_never_matches_a_responder() {
    let any = responder("any@example.com", &["Database"], 0);
    let boss = admin("boss@example.com", 0);

    let chosen = resolve(&[], &[any], &[boss.clone()]);
    assert_eq!(chosen, Some(boss.id));
}

#[test]
fn falls_back_to_earliest_admin() {
    let late_admin = admin("late@example.com", 9);
    let early_admin = admin("early@example.com", 1);

    let chosen = resolve(
        &skills(&["Security"]),
        &[],
        &[late_admin, early_admin.clone()],
    );
    assert_eq!(chosen, Some(early_admin.id));
}

#[test]
fn no_candidates_resolves_to_none() {
    assert_eq!(resolve(&skills(&["Database"]), &[], &[]), None);
}

#[test]
fn creation_time_ties_break_by_id() {
    let a = responder("a@example.com", &["API"], 3);
    let mut b = responder("b@example.com", &["API"], 3);
    b.created_at = a.created_at;

    let expected = a.id.min(b.id);
    let chosen = resolve(&skills(&["API"]), &[a, b], &[]);
    assert_eq!(chosen, Some(expected));
}

#[test]
fn non_responder_roles_are_ignored_in_tier_one() {
    let requester = user_created_at("req@example.com", UserRole::Requester, &["API"], 0);
    let late = responder("late@example.com", &["API"], 9);

    let chosen = resolve(&skills(&["API"]), &[requester, late.clone()], &[]);
    assert_eq!(chosen, Some(late.id));
}

fn responder_pool() -> impl Strategy<Value = Vec<User>> {
    prop::collection::vec((0u32..60, prop::sample::subsequence(
        vec!["Database", "API", "Frontend", "Backend"],
        0..=4,
    )), 0..8)
    .prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (minute, tags))| {
                responder(&format!("r{i}@example.com"), &tags, minute)
            })
            .collect()
    })
}

proptest! {
    // The resolver is a pure function of its inputs: input order must not
    // change the selection.
    #[test]
    fn prop_resolution_is_order_independent(pool in responder_pool()) {
        let required = skills(&["Database", "API"]);
        let admins = [admin("boss@example.com", 0)];

        let forward = resolve(&required, &pool, &admins);
        let mut reversed = pool.clone();
        reversed.reverse();
        let backward = resolve(&required, &reversed, &admins);

        prop_assert_eq!(forward, backward);
    }

    // Tier 1 never selects a responder lacking skill overlap.
    #[test]
    fn prop_selected_responder_overlaps(pool in responder_pool()) {
        let required = skills(&["Database"]);
        if let Some(chosen) = resolve(&required, &pool, &[]) {
            let user = pool.iter().find(|u| u.id == chosen).unwrap();
            prop_assert!(user.skills.iter().any(|s| required.contains(s)));
        }
    }
}
