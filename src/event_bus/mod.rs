//! Observability bus: structured run/step events fanned out to sinks.
//!
//! Workflow steps and the dispatcher emit [`Event`]s through a cloned
//! sender; the [`EventBus`] broadcasts them to pluggable [`EventSink`]s
//! (stdout for humans, memory for tests, channels for live consumers).
//! Domain events, the things that *trigger* runs, live in
//! [`crate::dispatch`], not here.

pub mod bus;
pub mod event;
pub mod sink;

pub use bus::EventBus;
pub use event::{DiagnosticEvent, Event, StepEvent};
pub use sink::{ChannelSink, EventSink, MemorySink, StdOutSink};
