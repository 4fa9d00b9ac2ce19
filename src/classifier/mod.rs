//! Classification of ticket text into a structured triage result.
//!
//! The [`Classifier`] trait is the seam the workflow engine consumes;
//! [`HttpClassifier`] is the production implementation speaking to an
//! OpenAI-compatible chat endpoint. The response contract is strict JSON,
//! but models drift: the parser tolerates a surrounding ```json code fence
//! and missing fields, and downgrades anything unparseable to "no result"
//! rather than an error. Transport failures are errors: the engine retries
//! those at the step level; this component never retries on its own.

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::model::TriageResult;

pub mod http;

pub use http::HttpClassifier;

/// The closed skill vocabulary the classifier is instructed to draw from.
///
/// Free-text technologies are mapped onto these buckets by the model prompt;
/// user skill sets use the same tags, which is what makes the intersection
/// matching in assignment meaningful.
pub const SKILL_VOCABULARY: [&str; 12] = [
    "React",
    "Node.js",
    "JavaScript",
    "TypeScript",
    "Database",
    "API",
    "Frontend",
    "Backend",
    "DevOps",
    "Mobile",
    "Testing",
    "Security",
];

/// Errors surfaced by a classification call.
///
/// These are exclusively transport-shaped: an unreachable endpoint, a
/// non-success status, or an undecodable response envelope. Model output
/// that fails to parse as a triage result is not an error; it yields
/// `Ok(None)` from [`Classifier::classify`].
#[derive(Debug, Error, Diagnostic)]
pub enum ClassifierError {
    /// The endpoint could not be reached or the request failed in flight.
    #[error("classifier transport failure: {message}")]
    #[diagnostic(code(ticketflow::classifier::transport))]
    Transport { message: String },

    /// The endpoint answered with a non-success status.
    #[error("classifier endpoint returned {status}: {body}")]
    #[diagnostic(
        code(ticketflow::classifier::status),
        help("Check the configured endpoint, model name, and API key.")
    )]
    Status { status: u16, body: String },
}

impl ClassifierError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ClassifierError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
        }
    }
}

/// Seam between the workflow engine and the external classification service.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a ticket by title and description.
    ///
    /// `Ok(None)` means the service answered but produced nothing usable;
    /// the pipeline proceeds without enrichment. `Err` means the call
    /// itself failed and may be retried by the caller.
    async fn classify(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Option<TriageResult>, ClassifierError>;
}

/// Strip an optional surrounding Markdown code fence from raw model output.
///
/// Handles ```json / ``` fences with or without trailing newlines. Text
/// without a fence is returned trimmed.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest
        .strip_prefix("json")
        .or_else(|| rest.strip_prefix("JSON"))
        .unwrap_or(rest);
    match rest.rsplit_once("```") {
        Some((body, _)) => body.trim(),
        None => trimmed,
    }
}

/// Parse raw model output into a [`TriageResult`].
///
/// Fenced and unfenced JSON parse identically; anything that is not a JSON
/// object yields `None`.
#[must_use]
pub fn parse_triage_response(raw: &str) -> Option<TriageResult> {
    serde_json::from_str(strip_code_fence(raw)).ok()
}
