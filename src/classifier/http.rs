//! HTTP classifier speaking to an OpenAI-compatible chat endpoint.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Classifier, ClassifierError, SKILL_VOCABULARY, parse_triage_response};
use crate::config::ClassifierConfig;
use crate::model::TriageResult;
use async_trait::async_trait;

/// Fixed instruction prompt for the triage model.
///
/// Constrains priority to the closed {low, medium, high} set and skills to
/// the closed vocabulary, and demands bare JSON output. The fence-stripping
/// parser still tolerates models that wrap the object anyway.
const TRIAGE_SYSTEM_PROMPT: &str = "You are an assistant that processes technical support tickets.\n\
Your job is to:\n\
1. Summarize the issue.\n\
2. Estimate its priority.\n\
3. Provide helpful notes and resource links for human responders.\n\
4. List relevant technical skills required.\n\
\n\
Map specific technologies to broader categories, for example:\n\
- MongoDB/PostgreSQL/MySQL -> \"Database\"\n\
- Express/FastAPI/Django -> \"Backend\"\n\
- HTML/CSS -> \"Frontend\"\n\
- REST/GraphQL -> \"API\"\n\
\n\
Respond with only a valid raw JSON object. Do not include markdown, code \
fences, comments, or any extra formatting.";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Production [`Classifier`] backed by a single chat-completion call.
///
/// No internal retries and no streaming: one request, one response, parsed
/// leniently. The step-level retry budget in the workflow engine owns all
/// retry behavior.
pub struct HttpClassifier {
    http_client: reqwest::Client,
    config: ClassifierConfig,
}

impl HttpClassifier {
    /// Build a classifier from configuration.
    ///
    /// Falls back to an unconfigured client if the builder rejects the
    /// timeout, which does not happen with the values [`ClassifierConfig`]
    /// produces.
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            config,
        }
    }

    fn user_prompt(title: &str, description: &str) -> String {
        let vocabulary = SKILL_VOCABULARY.join("\", \"");
        format!(
            "Analyze the following support ticket and provide a JSON object with:\n\
             - summary: A short 1-2 sentence summary of the issue.\n\
             - priority: One of \"low\", \"medium\", or \"high\".\n\
             - helpfulNotes: A detailed technical explanation that a responder can use to solve this issue.\n\
             - relatedSkills: An array of skills from this exact list only: [\"{vocabulary}\"]\n\
             \n\
             Respond only with the JSON object, no extra text, headers, or markdown.\n\
             \n\
             ---\n\
             \n\
             Ticket information:\n\
             \n\
             - Title: {title}\n\
             - Description: {description}"
        )
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn classify(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Option<TriageResult>, ClassifierError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: TRIAGE_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::user_prompt(title, description),
                },
            ],
            stream: false,
        };

        let mut builder = self.http_client.post(&self.config.endpoint).json(&request);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        debug!(
            endpoint = %self.config.endpoint,
            model = %self.config.model,
            "sending classification request"
        );

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::transport(format!("undecodable response: {e}")))?;

        let Some(choice) = envelope.choices.into_iter().next() else {
            warn!("classifier response contained no choices");
            return Ok(None);
        };

        let parsed = parse_triage_response(&choice.message.content);
        if parsed.is_none() {
            warn!(
                content_len = choice.message.content.len(),
                "classifier output was not parseable JSON; continuing without enrichment"
            );
        }
        Ok(parsed)
    }
}
