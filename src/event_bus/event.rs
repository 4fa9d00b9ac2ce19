use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured observability event emitted while the pipeline runs.
///
/// Step events carry run/step metadata so a single stream of events from
/// many concurrent runs stays traceable; diagnostics come from the
/// dispatcher and service layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    Step(StepEvent),
    Diagnostic(DiagnosticEvent),
}

impl Event {
    pub fn step_message(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Step(StepEvent::new(None, None, scope.into(), message.into()))
    }

    pub fn step_message_with_meta(
        run_id: impl Into<String>,
        step: impl Into<String>,
        scope: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Event::Step(StepEvent::new(
            Some(run_id.into()),
            Some(step.into()),
            scope.into(),
            message.into(),
        ))
    }

    pub fn diagnostic(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Diagnostic(DiagnosticEvent {
            scope: scope.into(),
            message: message.into(),
        })
    }

    pub fn scope_label(&self) -> &str {
        match self {
            Event::Step(step) => step.scope(),
            Event::Diagnostic(diag) => diag.scope(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Event::Step(step) => step.message(),
            Event::Diagnostic(diag) => diag.message(),
        }
    }

    /// Convert the event to a JSON value with a normalized schema:
    ///
    /// ```json
    /// {
    ///   "type": "step" | "diagnostic",
    ///   "scope": "scope_label",
    ///   "message": "event_message",
    ///   "timestamp": "2026-01-12T12:34:56.789Z",
    ///   "metadata": { "run_id": "...", "step": "..." }
    /// }
    /// ```
    pub fn to_json_value(&self) -> Value {
        use serde_json::json;

        let (event_type, metadata) = match self {
            Event::Step(step) => {
                let mut meta = serde_json::Map::new();
                if let Some(run_id) = step.run_id() {
                    meta.insert("run_id".to_string(), json!(run_id));
                }
                if let Some(name) = step.step() {
                    meta.insert("step".to_string(), json!(name));
                }
                ("step", Value::Object(meta))
            }
            Event::Diagnostic(_) => ("diagnostic", Value::Object(serde_json::Map::new())),
        };

        json!({
            "type": event_type,
            "scope": self.scope_label(),
            "message": self.message(),
            "timestamp": Utc::now().to_rfc3339(),
            "metadata": metadata,
        })
    }

    /// Compact JSON string representation.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Step(step) => match (step.run_id(), step.step()) {
                (Some(run), Some(name)) => write!(f, "[{run}:{name}] {}", step.message()),
                (Some(run), None) => write!(f, "[{run}] {}", step.message()),
                (None, Some(name)) => write!(f, "[{name}] {}", step.message()),
                (None, None) => write!(f, "{}", step.message()),
            },
            Event::Diagnostic(diag) => write!(f, "{}", diag.message()),
        }
    }
}

/// Event scoped to one step of one workflow run.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepEvent {
    run_id: Option<String>,
    step: Option<String>,
    scope: String,
    message: String,
}

impl StepEvent {
    pub fn new(
        run_id: Option<String>,
        step: Option<String>,
        scope: String,
        message: String,
    ) -> Self {
        Self {
            run_id,
            step,
            scope,
            message,
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    pub fn step(&self) -> Option<&str> {
        self.step.as_deref()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Free-form diagnostic event from the dispatcher or service layer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiagnosticEvent {
    scope: String,
    message: String,
}

impl DiagnosticEvent {
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
