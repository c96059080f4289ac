use super::*;

fn config(base_url: &str) -> JudgeConfig {
    JudgeConfig {
        base_url: base_url.to_string(),
        api_key: Some("sk-test".to_string()),
        model: "test-model".to_string(),
        temperature: 0.0,
        max_tokens: 256,
        timeout_secs: 5,
        max_retries: 0,
        retry_backoff_base_ms: 0,
    }
}

#[test]
fn endpoint_appends_completions_path() {
    let client = JudgeClient::new(config("https://api.example.com")).unwrap();
    assert_eq!(
        client.endpoint().as_str(),
        "https://api.example.com/v1/chat/completions"
    );
}

#[test]
fn endpoint_keeps_base_path_prefix() {
    let client = JudgeClient::new(config("http://localhost:8080/proxy/")).unwrap();
    assert_eq!(
        client.endpoint().as_str(),
        "http://localhost:8080/proxy/v1/chat/completions"
    );
}

#[test]
fn invalid_base_url_is_rejected() {
    let err = JudgeClient::new(config("not a url")).err().unwrap();
    assert!(matches!(err, JudgeError::InvalidBaseUrl(ref u) if u == "not a url"));
}

#[test]
fn debug_redacts_api_key() {
    let rendered = format!("{:?}", config("https://api.example.com"));
    assert!(!rendered.contains("sk-test"));
    assert!(rendered.contains("[redacted]"));
}

#[test]
fn error_message_prefers_structured_body() {
    let body = r#"{"error": {"message": "model not found", "type": "invalid_request_error"}}"#;
    assert_eq!(error_message(body), "model not found");
}

#[test]
fn error_message_truncates_raw_body() {
    let body = "x".repeat(2_000);
    assert_eq!(error_message(&body).len(), MAX_ERROR_BODY_CHARS);
}
