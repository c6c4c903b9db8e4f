use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::harness;
use crate::capture::router::capture_router;
use crate::capture::service::CaptureOptions;

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ORIGIN, "https://app.example.com")
        .header(header::USER_AGENT, "formpulse-tests")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[tokio::test]
async fn post_creates_submission_and_returns_it() {
    let harness = harness(CaptureOptions::default(), Vec::new());
    let app = capture_router(harness.service.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/capture/forms/form-1/submissions",
            json!({ "data": { "feedbackType": "idea" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok()),
        Some("*"),
        "capture routes are CORS-open"
    );

    let body = body_json(response).await;
    assert_eq!(body["formId"], "form-1");
    assert_eq!(body["data"]["feedbackType"], "idea");
    assert_eq!(body["finished"], false);
    assert_eq!(body["meta"]["userAgent"], "formpulse-tests");
}

#[tokio::test]
async fn post_to_unknown_form_is_404() {
    let harness = harness(CaptureOptions::default(), Vec::new());
    let app = capture_router(harness.service.clone());

    let response = app
        .oneshot(json_request(
            "POST",
            "/capture/forms/nope/submissions",
            json!({}),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Form not found");
}

#[tokio::test]
async fn put_merges_into_existing_submission() {
    let harness = harness(CaptureOptions::default(), Vec::new());
    let app = capture_router(harness.service.clone());

    let created = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/capture/forms/form-1/submissions",
            json!({ "data": { "feedbackType": "idea" } }),
        ))
        .await
        .expect("router responds");
    let created = body_json(created).await;
    let submission_id = created["id"].as_str().expect("id present");

    let response = app
        .oneshot(json_request(
            "PUT",
            &format!("/capture/forms/form-1/submissions/{submission_id}"),
            json!({ "data": { "message": "great tool" }, "finished": true }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["data"]["feedbackType"], "idea");
    assert_eq!(body["data"]["message"], "great tool");
    assert_eq!(body["finished"], true);
}

#[tokio::test]
async fn put_to_unknown_submission_is_404() {
    let harness = harness(CaptureOptions::default(), Vec::new());
    let app = capture_router(harness.service.clone());

    let response = app
        .oneshot(json_request(
            "PUT",
            "/capture/forms/form-1/submissions/missing",
            json!({ "data": { "message": "late" } }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Submission not found");
}

#[tokio::test]
async fn unsupported_methods_get_explicit_405() {
    let harness = harness(CaptureOptions::default(), Vec::new());
    let app = capture_router(harness.service.clone());

    let response = app
        .oneshot(json_request(
            "DELETE",
            "/capture/forms/form-1/submissions",
            json!({}),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(
        body["message"],
        "The HTTP DELETE method is not supported by this route."
    );
}
