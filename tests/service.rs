//! End-to-end: publish a domain event, watch the pipeline finish.

mod common;
use common::*;

use std::sync::Arc;
use std::time::Duration;

use ticketflow::config::Config;
use ticketflow::event_bus::{EventBus, MemorySink};
use ticketflow::model::TicketStatus;
use ticketflow::notifier::MemoryNotifier;
use ticketflow::service::Service;
use ticketflow::store::{MemoryStore, TicketStore, UserStore};

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within deadline");
}

fn test_config() -> Config {
    Config::default()
        .with_retry(fast_retry())
        .with_redelivery(fast_retry())
}

#[tokio::test]
async fn ticket_created_event_drives_triage_to_assignment() {
    ticketflow::telemetry::init();
    let store = Arc::new(MemoryStore::new());
    let dba = responder("dba@example.com", &["Database"], 0);
    let dba_id = dba.id;
    store.insert_user(dba).await.unwrap();

    let t = ticket("Queries time out", "Production queries hang");
    let ticket_id = t.id;
    store.insert_ticket(t).await.unwrap();

    let notifier = Arc::new(MemoryNotifier::new());
    let sink = MemorySink::new();
    let service = Service::start(
        test_config(),
        store.clone(),
        store.clone(),
        Arc::new(StaticClassifier::some(triage_result("high", &["Database"]))),
        notifier.clone(),
        EventBus::with_sink(sink.clone()),
    );

    service.publish_ticket_created(ticket_id).unwrap();

    wait_for(|| !notifier.snapshot().is_empty()).await;
    service.shutdown().await;

    let final_ticket = store.get_ticket(ticket_id).await.unwrap();
    assert_eq!(final_ticket.status, TicketStatus::Assigned);
    assert_eq!(final_ticket.assignee, Some(dba_id));
    assert_eq!(notifier.snapshot()[0].to, "dba@example.com");

    // The observability stream saw the run complete.
    assert!(
        sink.snapshot()
            .iter()
            .any(|e| e.scope_label() == "triage" && e.message().contains("assigned"))
    );
}

#[tokio::test]
async fn user_signup_event_sends_welcome_email() {
    let store = Arc::new(MemoryStore::new());
    let user = responder("new@example.com", &[], 0);
    let user_id = user.id;
    store.insert_user(user).await.unwrap();

    let notifier = Arc::new(MemoryNotifier::new());
    let service = Service::start(
        test_config(),
        store.clone(),
        store,
        Arc::new(StaticClassifier::empty()),
        notifier.clone(),
        EventBus::with_sink(MemorySink::new()),
    );

    service.publish_user_signup(user_id).unwrap();

    wait_for(|| !notifier.snapshot().is_empty()).await;
    service.shutdown().await;

    assert_eq!(notifier.snapshot()[0].to, "new@example.com");
}

#[tokio::test]
async fn duplicate_delivery_converges_to_the_same_state() {
    let store = Arc::new(MemoryStore::new());
    let dba = responder("dba@example.com", &["Database"], 0);
    let dba_id = dba.id;
    store.insert_user(dba).await.unwrap();

    let t = ticket("t", "d");
    let ticket_id = t.id;
    store.insert_ticket(t).await.unwrap();

    let notifier = Arc::new(MemoryNotifier::new());
    let service = Service::start(
        test_config(),
        store.clone(),
        store.clone(),
        Arc::new(StaticClassifier::some(triage_result("low", &["Database"]))),
        notifier.clone(),
        EventBus::with_sink(MemorySink::new()),
    );

    // At-least-once delivery: the same event lands twice.
    service.publish_ticket_created(ticket_id).unwrap();
    service.publish_ticket_created(ticket_id).unwrap();

    wait_for(|| notifier.snapshot().len() >= 2).await;
    service.shutdown().await;

    let final_ticket = store.get_ticket(ticket_id).await.unwrap();
    assert_eq!(final_ticket.status, TicketStatus::Assigned);
    assert_eq!(final_ticket.assignee, Some(dba_id));
    // Both runs chose the same responder; the record is stable.
    assert!(notifier.snapshot().iter().all(|m| m.to == "dba@example.com"));
}
