//! HTTP sentiment classifier against a local mock server

use sentiment_trader::{HttpSentimentOracle, RawSentiment, SentimentOracle};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn oracle(server: &MockServer) -> HttpSentimentOracle {
    HttpSentimentOracle::new(&format!("{}/classify", server.uri()), Duration::from_secs(5))
        .unwrap()
}

fn headlines() -> Vec<String> {
    vec![
        "Stocks rally as earnings beat estimates".to_string(),
        "Fed holds rates steady".to_string(),
    ]
}

#[tokio::test]
async fn test_classify_posts_headlines_and_decodes_reading() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify"))
        .and(header("content-type", "application/json"))
        .and(body_json(serde_json::json!({
            "headlines": [
                "Stocks rally as earnings beat estimates",
                "Fed holds rates steady"
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "probability": 0.9993,
            "label": "positive"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let raw = oracle(&mock_server).classify(&headlines()).await.unwrap();
    assert_eq!(
        raw,
        RawSentiment {
            probability: 0.9993,
            label: "positive".to_string(),
        }
    );
}

#[tokio::test]
async fn test_classify_passes_labels_through_unvalidated() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "probability": 1.7,
            "label": "bullish"
        })))
        .mount(&mock_server)
        .await;

    // Range and label checks belong to the cycle, not the transport
    let raw = oracle(&mock_server).classify(&[]).await.unwrap();
    assert_eq!(raw.label, "bullish");
    assert_eq!(raw.probability, 1.7);
}

#[tokio::test]
async fn test_classify_server_error_reports_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let err = oracle(&mock_server).classify(&headlines()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("500"));
    assert!(message.contains("model not loaded"));
}

#[tokio::test]
async fn test_classify_malformed_body_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/classify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"score\": \"high\"}")
                .insert_header("content-type", "application/json"),
        )
        .mount(&mock_server)
        .await;

    let err = oracle(&mock_server).classify(&headlines()).await.unwrap_err();
    assert!(err.to_string().contains("decoding classifier response"));
}
