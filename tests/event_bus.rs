use std::time::Duration;

use ticketflow::event_bus::{ChannelSink, Event, EventBus, MemorySink};

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within deadline");
}

#[tokio::test]
async fn events_reach_memory_sink() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();

    let sender = bus.get_sender();
    sender
        .send(Event::step_message_with_meta(
            "run-1",
            "fetch-ticket",
            "triage",
            "loaded",
        ))
        .unwrap();
    sender.send(Event::diagnostic("dispatch", "hello")).unwrap();

    wait_for(|| sink.snapshot().len() == 2).await;
    let events = sink.snapshot();
    assert_eq!(events[0].scope_label(), "triage");
    assert_eq!(events[1].message(), "hello");
    bus.stop_listener().await;
}

#[tokio::test]
async fn listener_startup_is_idempotent() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();
    bus.listen_for_events();

    bus.get_sender()
        .send(Event::diagnostic("test", "once"))
        .unwrap();

    wait_for(|| !sink.snapshot().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(sink.snapshot().len(), 1);
    bus.stop_listener().await;
}

#[tokio::test]
async fn sinks_added_dynamically_receive_events() {
    let bus = EventBus::with_sink(MemorySink::new());
    bus.listen_for_events();

    let late = MemorySink::new();
    bus.add_sink(late.clone());
    bus.get_sender()
        .send(Event::diagnostic("test", "late sink"))
        .unwrap();

    wait_for(|| !late.snapshot().is_empty()).await;
    bus.stop_listener().await;
}

#[tokio::test]
async fn channel_sink_streams_to_async_consumers() {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let bus = EventBus::with_sink(ChannelSink::new(tx));
    bus.listen_for_events();

    bus.get_sender()
        .send(Event::step_message("triage", "streamed"))
        .unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("event within deadline")
        .expect("channel open");
    assert_eq!(received.message(), "streamed");
    bus.stop_listener().await;
}

#[test]
fn step_event_json_schema() {
    let event = Event::step_message_with_meta("run-9", "classify", "triage", "calling model");
    let json = event.to_json_value();

    assert_eq!(json["type"], "step");
    assert_eq!(json["scope"], "triage");
    assert_eq!(json["message"], "calling model");
    assert_eq!(json["metadata"]["run_id"], "run-9");
    assert_eq!(json["metadata"]["step"], "classify");
}

#[test]
fn display_includes_run_metadata() {
    let event = Event::step_message_with_meta("run-9", "classify", "triage", "calling model");
    assert_eq!(event.to_string(), "[run-9:classify] calling model");

    let diag = Event::diagnostic("dispatch", "queue empty");
    assert_eq!(diag.to_string(), "queue empty");
}
