//! Domain-event dispatch: named events, handler registry, re-delivery.
//!
//! Collaborators publish [`DomainEvent`]s; a background dispatcher task
//! delivers each one to the handler registered for its name, on a spawned
//! task so concurrent runs stay isolated. Delivery is at-least-once: a
//! handler failing retriably gets the event re-delivered after a backoff,
//! up to the policy's budget. There is no ambient global registration:
//! the [`HandlerRegistry`] is built explicitly at startup and handed to
//! the dispatcher.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{self, JoinSet};
use tracing::{error, warn};

use crate::event_bus::Event;
use crate::model::{TicketId, UserId};
use crate::workflow::RetryPolicy;

/// Event name for "a ticket was created, triage it".
pub const TICKET_CREATED: &str = "ticket.created";
/// Event name for "a user signed up, welcome them".
pub const USER_SIGNUP: &str = "user.signup";

/// A named event with a JSON payload.
///
/// `attempt` counts deliveries already consumed; the dispatcher bumps it on
/// every re-delivery so the budget check is carried with the event itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub name: String,
    pub payload: Value,
    #[serde(default)]
    pub attempt: u32,
}

impl DomainEvent {
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
            attempt: 0,
        }
    }

    /// The `ticket.created` trigger for the triage workflow.
    pub fn ticket_created(ticket_id: TicketId) -> Self {
        Self::new(TICKET_CREATED, serde_json::json!({ "ticket_id": ticket_id }))
    }

    /// The `user.signup` trigger for the welcome workflow.
    pub fn user_signup(user_id: UserId) -> Self {
        Self::new(USER_SIGNUP, serde_json::json!({ "user_id": user_id }))
    }

    fn redelivered(mut self) -> Self {
        self.attempt += 1;
        self
    }
}

/// Error returned by an [`EventHandler`].
///
/// `retriable` decides whether the dispatcher schedules a re-delivery.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(ticketflow::dispatch::handler))]
pub struct HandlerError {
    pub message: String,
    pub retriable: bool,
}

impl HandlerError {
    pub fn retriable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retriable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retriable: false,
        }
    }
}

/// A consumer for one named domain event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, payload: Value) -> Result<(), HandlerError>;
}

/// Explicit mapping from event name to handler, built once at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: FxHashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event name. Last registration wins.
    #[must_use]
    pub fn register(mut self, name: impl Into<String>, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.insert(name.into(), handler);
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(name)
    }

    /// Registered event names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

/// Publishing failed because the dispatcher channel is closed.
#[derive(Debug, Error, Diagnostic)]
#[error("event channel closed")]
#[diagnostic(code(ticketflow::dispatch::channel_closed))]
pub struct PublishError;

/// Background consumer delivering domain events to registered handlers.
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    channel: (flume::Sender<DomainEvent>, flume::Receiver<DomainEvent>),
    events: flume::Sender<Event>,
    redelivery: RetryPolicy,
    listener: Mutex<Option<ListenerState>>,
}

impl Dispatcher {
    pub fn new(
        registry: HandlerRegistry,
        events: flume::Sender<Event>,
        redelivery: RetryPolicy,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            channel: flume::unbounded(),
            events,
            redelivery,
            listener: Mutex::new(None),
        }
    }

    /// Enqueue an event for delivery.
    pub fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        self.channel.0.send(event).map_err(|_| PublishError)
    }

    /// Clone of the publishing side, for collaborators that outlive a
    /// borrow of the dispatcher.
    pub fn sender(&self) -> flume::Sender<DomainEvent> {
        self.channel.0.clone()
    }

    /// Spawn the delivery loop. Idempotent: calling twice has no effect.
    ///
    /// Each incoming event is handed to its handler on a fresh task;
    /// handler tasks own any re-delivery sleep so the loop never blocks.
    pub fn start(&self) {
        let mut guard = self.listener.lock();
        if guard.is_some() {
            return;
        }

        let receiver = self.channel.1.clone();
        let sender = self.channel.0.clone();
        let registry = self.registry.clone();
        let events = self.events.clone();
        let redelivery = self.redelivery.clone();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let handle = task::spawn(async move {
            let mut inflight: JoinSet<()> = JoinSet::new();
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
                    recv = receiver.recv_async() => match recv {
                        Err(_) => break,
                        Ok(event) => {
                            deliver(
                                event,
                                &registry,
                                &sender,
                                &events,
                                &redelivery,
                                &mut inflight,
                            );
                        }
                    }
                }
            }
            // Drain in-flight runs before the loop task exits.
            while inflight.join_next().await.is_some() {}
        });

        *guard = Some(ListenerState {
            shutdown_tx,
            handle,
        });
    }

    /// Stop the delivery loop, waiting for in-flight runs to finish.
    pub async fn stop(&self) {
        let state = self.listener.lock().take();
        if let Some(state) = state {
            let _ = state.shutdown_tx.send(());
            let _ = state.handle.await;
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        if let Some(state) = self.listener.lock().take() {
            let _ = state.shutdown_tx.send(());
            state.handle.abort();
        }
    }
}

fn deliver(
    event: DomainEvent,
    registry: &Arc<HandlerRegistry>,
    sender: &flume::Sender<DomainEvent>,
    events: &flume::Sender<Event>,
    redelivery: &RetryPolicy,
    inflight: &mut JoinSet<()>,
) {
    let Some(handler) = registry.get(&event.name).cloned() else {
        warn!(event = %event.name, "no handler registered; dropping event");
        let _ = events.send(Event::diagnostic(
            "dispatch",
            format!("no handler registered for event '{}'", event.name),
        ));
        return;
    };

    let sender = sender.clone();
    let events = events.clone();
    let redelivery = redelivery.clone();

    inflight.spawn(async move {
        match handler.handle(event.payload.clone()).await {
            Ok(()) => {}
            Err(err) if err.retriable && event.attempt < redelivery.max_retries => {
                let next_attempt = event.attempt + 1;
                let delay = redelivery.delay(next_attempt);
                let delay_ms = delay.as_millis() as u64;
                warn!(
                    event = %event.name,
                    attempt = next_attempt,
                    delay_ms,
                    error = %err,
                    "handler failed; deferring re-delivery"
                );
                let _ = events.send(Event::diagnostic(
                    "dispatch",
                    format!(
                        "re-delivering '{}' (attempt {next_attempt}): {err}",
                        event.name
                    ),
                ));
                tokio::time::sleep(delay).await;
                let _ = sender.send(event.redelivered());
            }
            Err(err) => {
                error!(event = %event.name, attempt = event.attempt, error = %err, "dropping event after handler failure");
                let _ = events.send(Event::diagnostic(
                    "dispatch",
                    format!("dropping '{}' after failure: {err}", event.name),
                ));
            }
        }
    });
}

struct ListenerState {
    shutdown_tx: oneshot::Sender<()>,
    handle: task::JoinHandle<()>,
}
