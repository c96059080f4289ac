//! Importance scoring and impact analysis over a mocked completions endpoint.

use std::sync::Arc;

use chrono::Utc;
use tdwatch_core::TopicCategory;
use tdwatch_judge::{JudgeClient, JudgeConfig, JudgeError};
use tdwatch_scoring::{
    AnalysisContext, Article, ImpactAnalyzer, ImportanceScorer, LlmImportanceScorer,
    PoliticianMention, ScoringError, Sentiment, SinglePassAnalyzer,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(base_url: &str) -> Arc<JudgeClient> {
    Arc::new(
        JudgeClient::new(JudgeConfig {
            base_url: base_url.to_string(),
            api_key: None,
            model: "test-model".to_string(),
            temperature: 0.0,
            max_tokens: 400,
            timeout_secs: 2,
            max_retries: 0,
            retry_backoff_base_ms: 1,
        })
        .expect("client construction should not fail"),
    )
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn article() -> Article {
    Article {
        id: 5,
        title: "James Byrne unveils social housing fund".to_string(),
        content: "The fund will deliver 4,000 homes, James Byrne said.".to_string(),
        source: "The Irish Times".to_string(),
        url: "https://www.irishtimes.com/5".to_string(),
        published_date: Utc::now(),
        credibility_score: 0.9,
        processed: false,
        score_applied: false,
    }
}

#[tokio::test]
async fn importance_is_parsed_and_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains("James Byrne unveils social housing fund"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            r#"{"score": 140, "topic_category": "Housing",
                "primary_politicians": [" James Byrne "], "reasoning": "national policy"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let scorer = LlmImportanceScorer::new(client(&server.uri()));
    let assessment = scorer.score_importance(&article()).await.unwrap();

    assert!((assessment.score - 100.0).abs() < f64::EPSILON);
    assert_eq!(assessment.topic_category, TopicCategory::Housing);
    assert_eq!(assessment.primary_politicians, vec!["James Byrne".to_string()]);
}

#[tokio::test]
async fn importance_without_score_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(r#"{"topic_category": "housing"}"#)),
        )
        .mount(&server)
        .await;

    let err = LlmImportanceScorer::new(client(&server.uri()))
        .score_importance(&article())
        .await
        .unwrap_err();
    assert!(matches!(err, ScoringError::MalformedJudgment(_)));
}

#[tokio::test]
async fn api_errors_surface_as_judge_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "message": "bad request" }
        })))
        .mount(&server)
        .await;

    let err = LlmImportanceScorer::new(client(&server.uri()))
        .score_importance(&article())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ScoringError::Judge(JudgeError::Api { status: 400, .. })
    ));
}

#[tokio::test]
async fn single_pass_analysis_over_http() {
    let server = MockServer::start().await;
    let reply = serde_json::json!({
        "sentiment": "negative",
        "story_type": "controversy",
        "topic": "housing",
        "process_scores": { "transparency": 30, "integrity": null },
        "rationale": { "transparency": "costings withheld" },
        "impact_score": -4,
        "confidence": 0.7,
        "summary": "Fund announced without costings."
    });
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply.to_string())))
        .expect(1)
        .mount(&server)
        .await;

    let mention = PoliticianMention {
        name: "James Byrne".to_string(),
        party: "Fine Gael".to_string(),
        constituency: "Wicklow".to_string(),
        confidence: 0.95,
        substantial: true,
    };
    let judgment = SinglePassAnalyzer::new(client(&server.uri()))
        .analyze(&article(), &mention, &AnalysisContext::default())
        .await
        .unwrap();

    assert_eq!(judgment.sentiment, Sentiment::Negative);
    assert!((judgment.impact_score + 4.0).abs() < f64::EPSILON);
    assert!(judgment.process_scores.integrity.value().is_none());
    assert_eq!(judgment.process_scores.transparency.value(), Some(30.0));
}
