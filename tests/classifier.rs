use httpmock::prelude::*;
use serde_json::json;

use ticketflow::classifier::{
    Classifier, ClassifierError, HttpClassifier, parse_triage_response, strip_code_fence,
};
use ticketflow::config::ClassifierConfig;

const RESULT_JSON: &str = r#"{"summary":"DB connection pool exhausted","priority":"high","helpfulNotes":"Raise the pool limit.","relatedSkills":["Database","Backend"]}"#;

fn chat_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn test_config(server: &MockServer) -> ClassifierConfig {
    ClassifierConfig::default()
        .with_endpoint(server.url("/v1/chat/completions"))
        .with_model("test-model")
}

#[test]
fn fenced_response_parses_identically_to_unfenced() {
    let fenced = format!("```json\n{RESULT_JSON}\n```");
    assert_eq!(
        parse_triage_response(&fenced),
        parse_triage_response(RESULT_JSON)
    );

    let parsed = parse_triage_response(&fenced).unwrap();
    assert_eq!(parsed.priority, "high");
    assert_eq!(parsed.skills, vec!["Database", "Backend"]);
}

#[test]
fn fence_stripping_tolerates_whitespace() {
    let raw = format!("  ```json\n{RESULT_JSON}\n```  ");
    assert_eq!(strip_code_fence(&raw), RESULT_JSON);
}

#[test]
fn malformed_text_parses_to_none() {
    assert!(parse_triage_response("Sorry, I can't help with that.").is_none());
    assert!(parse_triage_response("```json\nnot json\n```").is_none());
}

#[tokio::test]
async fn classify_returns_structured_result() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(chat_body(RESULT_JSON));
        })
        .await;

    let classifier = HttpClassifier::new(test_config(&server));
    let result = classifier
        .classify("DB timeouts", "Queries hang in production")
        .await
        .unwrap()
        .unwrap();

    mock.assert_async().await;
    assert_eq!(result.summary, "DB connection pool exhausted");
    assert_eq!(result.priority, "high");
}

#[tokio::test]
async fn classify_strips_code_fence_from_model_output() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .json_body(chat_body(&format!("```json\n{RESULT_JSON}\n```")));
        })
        .await;

    let classifier = HttpClassifier::new(test_config(&server));
    let result = classifier.classify("t", "d").await.unwrap().unwrap();
    assert_eq!(result.skills, vec!["Database", "Backend"]);
}

#[tokio::test]
async fn unparseable_model_output_is_empty_not_an_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200)
                .json_body(chat_body("I think this is a database problem."));
        })
        .await;

    let classifier = HttpClassifier::new(test_config(&server));
    assert!(classifier.classify("t", "d").await.unwrap().is_none());
}

#[tokio::test]
async fn server_error_surfaces_as_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(503).body("overloaded");
        })
        .await;

    let classifier = HttpClassifier::new(test_config(&server));
    let err = classifier.classify("t", "d").await.unwrap_err();
    assert!(matches!(err, ClassifierError::Status { status: 503, .. }));
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer secret-key");
            then.status(200).json_body(chat_body(RESULT_JSON));
        })
        .await;

    let config = test_config(&server).with_api_key("secret-key");
    let classifier = HttpClassifier::new(config);
    classifier.classify("t", "d").await.unwrap();
    mock.assert_async().await;
}
