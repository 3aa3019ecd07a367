use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use compass_api::build_app;
use compass_core::CRISIS_MESSAGE;
use serde_json::json;
use tower::ServiceExt;

const API_KEY: &str = "dev-compass-key";

fn turn_request(session_id: Option<&str>, text: &str) -> Request<Body> {
    let mut payload = json!({ "text": text });
    if let Some(session_id) = session_id {
        payload["session_id"] = json!(session_id);
    }

    Request::builder()
        .method("POST")
        .uri("/v1/turn")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn turn_requires_api_key() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/turn")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "text": "I am struggling to pay my tuition" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn turn_returns_clarifying_question_for_matched_input() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(turn_request(None, "I am struggling to pay my tuition"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert!(parsed.get("session_id").is_some());
    let question = parsed["clarifying_question"]
        .as_str()
        .expect("clarifying question should be present");
    assert!(question.contains("Financial Aid Office"));
    assert!(question.ends_with("Would you like more details?"));
    assert!(parsed.get("recommended_services").is_none());
}

#[tokio::test]
async fn confirmation_flow_spans_two_requests() {
    let app = build_app().await.expect("app should build");

    let first = app
        .clone()
        .oneshot(turn_request(None, "my disability makes lectures hard"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let first_body = json_body(first).await;
    let session_id = first_body["session_id"]
        .as_str()
        .expect("session id should be assigned")
        .to_string();
    assert!(first_body.get("clarifying_question").is_some());

    let second = app
        .oneshot(turn_request(Some(&session_id), "yes"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let second_body = json_body(second).await;
    assert_eq!(second_body["session_id"], session_id);

    let recommendations = second_body["recommended_services"]
        .as_array()
        .expect("confirmation should yield recommendations");
    assert_eq!(recommendations.len(), 1);
    assert_eq!(
        recommendations[0]["service_name"],
        "Disability Support Services"
    );
    assert_eq!(recommendations[0]["priority_rank"], 1);
    assert_eq!(recommendations[0]["confidence_level"], "High");
}

#[tokio::test]
async fn crisis_input_returns_fixed_message() {
    let app = build_app().await.expect("app should build");

    let response = app
        .oneshot(turn_request(None, "lately I have felt suicidal"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed["message"], CRISIS_MESSAGE);
    assert!(parsed.get("clarifying_question").is_none());
    assert!(parsed.get("recommended_services").is_none());
}

#[tokio::test]
async fn catalog_lists_services_without_matching_internals() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("GET")
        .uri("/v1/catalog")
        .header("x-api-key", API_KEY)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    let entries = parsed.as_array().expect("catalog should be a list");
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["key"], "disability_support");
    assert!(entries[0].get("keywords").is_none());
}

#[tokio::test]
async fn speech_without_synthesizer_returns_no_content() {
    let app = build_app().await.expect("app should build");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/speech")
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(json!({ "text": "hello" }).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
