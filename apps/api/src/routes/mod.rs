pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::chat::handlers as chat;
use crate::pipeline::handlers;
use crate::state::AppState;

/// Room for multipart boundaries and part headers on top of the file bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state
        .config
        .max_session_attachment_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/countries", get(handlers::handle_list_countries))
        // Sessions
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route("/api/v1/sessions/:id/input", put(handlers::handle_update_input))
        .route(
            "/api/v1/sessions/:id/files",
            post(handlers::handle_upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/api/v1/sessions/:id/files/:index",
            get(handlers::handle_get_file).delete(handlers::handle_remove_file),
        )
        // Pipeline
        .route("/api/v1/sessions/:id/estimate", post(handlers::handle_submit))
        .route("/api/v1/sessions/:id/cancel", post(handlers::handle_cancel))
        .route("/api/v1/sessions/:id/reset", post(handlers::handle_reset))
        .route("/api/v1/sessions/:id/share", get(handlers::handle_share))
        // Follow-up chat
        .route("/api/v1/sessions/:id/chat", post(chat::handle_chat))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::llm_client::testing::ScriptedModel;
    use crate::llm_client::{GenerativeModel, LlmError};
    use crate::pipeline::store::SessionStore;

    const BOUNDARY: &str = "devcost-test-boundary";

    fn app_with(replies: Vec<Result<String, LlmError>>) -> Router {
        let model: Arc<dyn GenerativeModel> = Arc::new(ScriptedModel::new(replies));
        build_router(AppState {
            model,
            sessions: SessionStore::default(),
            config: Config::for_tests(),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn upload(app: &Router, id: &str, file_name: &str, mime: &str, data: &[u8]) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/sessions/{id}/files"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn create_session(app: &Router, country: &str) -> String {
        let (status, body) = send(app, "POST", "/api/v1/sessions", Some(json!({"country": country}))).await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn wait_for_status(app: &Router, id: &str, wanted: &str) -> Value {
        for _ in 0..100 {
            let (_, body) = send(app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
            if body["status"] == wanted {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {id} never reached {wanted}");
    }

    fn market_reply() -> String {
        json!({
            "country": "Germany", "currencySymbol": "€", "currencyCode": "EUR",
            "hourlyRates": {"junior": 35, "mid": 55, "senior": 80, "devops": 75},
            "sourceSummary": "Surveys"
        })
        .to_string()
    }

    fn estimate_reply() -> String {
        json!({
            "projectName": "Clinic Booking",
            "summary": "Appointment booking for clinics.",
            "totalCost": {"min": 30000, "avg": 42000, "max": 55000},
            "timelineWeeks": {"min": 8, "max": 12},
            "componentCosts": {"backend": 16800, "frontend": 12600, "devops": 8400, "qa": 4200},
            "infrastructureCostMonthly": 250,
            "thirdPartyLicensesCost": 600,
            "assumptions": ["Single region"]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = app_with(vec![]);
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_countries_lists_supported_markets() {
        let app = app_with(vec![]);
        let (status, body) = send(&app, "GET", "/api/v1/countries", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 12);
        assert_eq!(body[0], "United States");
    }

    #[tokio::test]
    async fn test_new_session_defaults() {
        let app = app_with(vec![]);
        let (status, body) = send(&app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "IDLE");
        assert_eq!(body["country"], "United States");
        assert_eq!(body["canSubmit"], true);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let app = app_with(vec![]);
        let uri = format!("/api/v1/sessions/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_submit_without_input_is_rejected() {
        let app = app_with(vec![]);
        let id = create_session(&app, "Germany").await;
        let (status, body) = send(&app, "POST", &format!("/api/v1/sessions/{id}/estimate"), None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"]["message"],
            "Please upload diagrams or enter requirements."
        );
        let (_, snapshot) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(snapshot["status"], "IDLE");
    }

    #[tokio::test]
    async fn test_full_estimate_chat_and_share_flow() {
        let app = app_with(vec![
            Ok(market_reply()),
            Ok(estimate_reply()),
            Ok("Backend dominates because of the scheduling engine.".to_string()),
        ]);
        let id = create_session(&app, "Germany").await;

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/input"),
            Some(json!({"requirements": "Clinic appointment booking with reminders"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "POST", &format!("/api/v1/sessions/{id}/estimate"), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "ANALYZING_MARKET");

        let done = wait_for_status(&app, &id, "COMPLETE").await;
        assert_eq!(done["result"]["wageDataUsed"]["currencyCode"], "EUR");
        assert_eq!(done["result"]["componentCosts"]["backend"], 16800.0);

        let (status, chat) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/chat"),
            Some(json!({"message": "Why is backend so expensive?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            chat["reply"]["text"],
            "Backend dominates because of the scheduling engine."
        );
        assert_eq!(chat["messages"].as_array().unwrap().len(), 2);

        let (status, share) = send(&app, "GET", &format!("/api/v1/sessions/{id}/share"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(share["text"].as_str().unwrap().contains("€30,000.00 - €55,000.00"));

        let (status, reset) = send(&app, "POST", &format!("/api/v1/sessions/{id}/reset"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reset["status"], "IDLE");
        assert!(reset["result"].is_null());
        assert_eq!(reset["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_failed_chat_returns_apology() {
        let app = app_with(vec![Ok(market_reply()), Ok(estimate_reply())]);
        let id = create_session(&app, "Germany").await;
        send(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/input"),
            Some(json!({"requirements": "Booking"})),
        )
        .await;
        send(&app, "POST", &format!("/api/v1/sessions/{id}/estimate"), None).await;
        wait_for_status(&app, &id, "COMPLETE").await;

        // The scripted model has no replies left, so the call fails.
        let (status, chat) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/chat"),
            Some(json!({"message": "Can we cut QA?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(chat["reply"]["role"], "model");
        assert_eq!(
            chat["reply"]["text"],
            "Sorry, I encountered an error answering that."
        );
    }

    #[tokio::test]
    async fn test_estimation_failure_is_visible_on_the_session() {
        let app = app_with(vec![
            Ok(market_reply()),
            Err(LlmError::Api {
                status: 400,
                message: "Unsupported file".to_string(),
            }),
        ]);
        let id = create_session(&app, "Germany").await;
        send(
            &app,
            "PUT",
            &format!("/api/v1/sessions/{id}/input"),
            Some(json!({"requirements": "Booking"})),
        )
        .await;
        send(&app, "POST", &format!("/api/v1/sessions/{id}/estimate"), None).await;

        let failed = wait_for_status(&app, &id, "ERROR").await;
        assert_eq!(failed["errorMessage"], "API error (status 400): Unsupported file");
        assert_eq!(failed["canSubmit"], true);
    }

    #[tokio::test]
    async fn test_chat_before_estimate_conflicts() {
        let app = app_with(vec![]);
        let id = create_session(&app, "Poland").await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/api/v1/sessions/{id}/chat"),
            Some(json!({"message": "Hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_upload_accepts_images_and_rejects_text() {
        let app = app_with(vec![]);
        let id = create_session(&app, "India").await;

        let (status, body) = upload(&app, &id, "flow.png", "image/png", b"\x89PNG").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["files"][0]["fileName"], "flow.png");
        assert_eq!(body["files"][0]["sizeBytes"], 4);
        assert_eq!(body["files"][0]["isImage"], true);

        let request = Request::builder()
            .uri(format!("/api/v1/sessions/{id}/files/0"))
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"\x89PNG");

        let (status, body) = upload(&app, &id, "notes.txt", "text/plain", b"hello").await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");

        let (status, body) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}/files/0"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["files"], json!([]));
    }

    #[tokio::test]
    async fn test_snapshot_size_does_not_track_upload_size() {
        let app = app_with(vec![]);
        let small_id = create_session(&app, "India").await;
        let large_id = create_session(&app, "India").await;

        let (_, small) = upload(&app, &small_id, "a.png", "image/png", &[7u8; 10]).await;
        let (_, large) = upload(&app, &large_id, "a.png", "image/png", &[7u8; 1000]).await;

        // sizeBytes and timestamp precision are the only length differences.
        let small_len = small.to_string().len();
        let large_len = large.to_string().len();
        assert!(large_len < small_len + 64, "{small_len} vs {large_len}");

        let (_, polled) = send(&app, "GET", &format!("/api/v1/sessions/{large_id}"), None).await;
        assert!(polled.to_string().len() < 1000);
    }

    #[tokio::test]
    async fn test_attachments_are_capped_per_session() {
        let app = app_with(vec![]);
        let id = create_session(&app, "India").await;
        let file = vec![1u8; 1000];

        let (status, _) = upload(&app, &id, "one.pdf", "application/pdf", &file).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = upload(&app, &id, "two.pdf", "application/pdf", &file).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = upload(&app, &id, "three.pdf", "application/pdf", &file).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");

        let (_, snapshot) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(snapshot["files"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_file_is_404() {
        let app = app_with(vec![]);
        let id = create_session(&app, "India").await;
        let (status, body) = send(&app, "GET", &format!("/api/v1/sessions/{id}/files/0"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let app = app_with(vec![]);
        let id = create_session(&app, "India").await;
        let big = vec![0u8; Config::for_tests().max_upload_bytes + 1];

        let (status, _) = upload(&app, &id, "scan.pdf", "application/pdf", &big).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let app = app_with(vec![]);
        let id = create_session(&app, "Mexico").await;
        let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
