//! 故事生成处理器

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::gateway::{
    handlers::{error_response, INVALID_BODY, MISSING_ANIMAL, UPSTREAM_FAILED},
    state::AppState,
};
use crate::providers::extract_text;
use crate::story::{build_system_instruction, StoryRequest};

/// 成功响应
#[derive(Serialize)]
pub struct StoryResponse {
    text: String,
}

/// `Content-Type` 是否为 JSON（`application/json` 或 `application/*+json`）
fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let essence = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}

/// 解析请求体
///
/// 非 JSON 的 `Content-Type` 或空请求体按 `{}` 处理，交给后续的 `animal` 校验；
/// 只有声明为 JSON 且内容非空却无法解析时才返回错误。
fn parse_story_request(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<StoryRequest, serde_json::Error> {
    if !is_json_content_type(headers) || body.trim_ascii().is_empty() {
        return Ok(StoryRequest::default());
    }
    serde_json::from_slice(body)
}

/// POST /transcript 处理器
///
/// 校验 → 构建提示词 → 调用上游一次 → 提取文本
pub async fn handle_transcript(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match parse_story_request(&headers, &body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(reason = %e, "Invalid request body");
            return error_response(
                StatusCode::BAD_REQUEST,
                INVALID_BODY,
                Some(Value::String(format!(
                    "Failed to parse the request body as JSON: {}",
                    e
                ))),
            );
        }
    };

    if state.verbose() {
        tracing::info!(
            body = %serde_json::to_string(&request).unwrap_or_default(),
            "Incoming request to /transcript"
        );
    } else {
        tracing::debug!(?request, "Incoming request to /transcript");
    }

    let Some(animal) = request.animal() else {
        tracing::warn!("{}", MISSING_ANIMAL);
        return error_response(StatusCode::BAD_REQUEST, MISSING_ANIMAL, None);
    };

    let system_instruction = build_system_instruction(&request);
    let provider = state.provider();

    if state.verbose() {
        tracing::info!(
            provider = provider.name(),
            model = provider.model(),
            prompt_len = system_instruction.len(),
            prompt = %system_instruction,
            "Sending request upstream"
        );
    } else {
        tracing::debug!(
            provider = provider.name(),
            model = provider.model(),
            prompt_len = system_instruction.len(),
            "Sending request upstream"
        );
    }

    match provider.generate(&system_instruction, animal).await {
        Ok(body) => {
            let text = extract_text(&body);
            tracing::info!(
                model = provider.model(),
                text_len = text.len(),
                "Transcript generated"
            );
            (StatusCode::OK, Json(StoryResponse { text })).into_response()
        }
        Err(err) => {
            let details = err.details();
            tracing::error!(
                model = provider.model(),
                status = err.status().map(|s| s.as_u16()),
                error = %err,
                "Gemini request failed"
            );
            if state.verbose() {
                tracing::error!(details = %details, "Upstream error details");
            }
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                UPSTREAM_FAILED,
                Some(details),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, Request as MockRequest, ResponseTemplate};

    use crate::gateway::{build_router, AppState};
    use crate::providers::GeminiProvider;

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.0-flash:generateContent";

    fn app(server: &MockServer, verbose: bool) -> Router {
        let provider = GeminiProvider::new(
            format!("{}/v1beta", server.uri()),
            "gemini-2.0-flash".to_string(),
            "test-key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        build_router(
            AppState::new(Arc::new(provider), verbose),
            Duration::from_secs(10),
        )
    }

    fn post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/transcript")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn story(text: &str) -> Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}], "role": "model"}}]})
    }

    async fn expect_no_upstream_call(server: &MockServer) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(story("unused")))
            .expect(0)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn empty_object_is_rejected_without_upstream_call() {
        let server = MockServer::start().await;
        expect_no_upstream_call(&server).await;

        let response = app(&server, false).oneshot(post("{}")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            std::str::from_utf8(&body).unwrap(),
            r#"{"error":"Missing required parameter: animal"}"#
        );
    }

    #[tokio::test]
    async fn bodies_without_json_fall_through_to_missing_animal() {
        let server = MockServer::start().await;
        expect_no_upstream_call(&server).await;

        let requests = [
            Request::builder()
                .method("POST")
                .uri("/transcript")
                .body(Body::empty())
                .unwrap(),
            Request::builder()
                .method("POST")
                .uri("/transcript")
                .body(Body::from("{}"))
                .unwrap(),
            Request::builder()
                .method("POST")
                .uri("/transcript")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from(r#"{"animal":"fox"}"#))
                .unwrap(),
            post(""),
            post("  \n"),
        ];

        for request in requests {
            let response = app(&server, false).oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);

            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(
                std::str::from_utf8(&body).unwrap(),
                r#"{"error":"Missing required parameter: animal"}"#
            );
        }
    }

    #[tokio::test]
    async fn json_content_type_with_charset_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(story("A sleepy bear.")))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::builder()
            .method("POST")
            .uri("/transcript")
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(r#"{"animal":"bear"}"#))
            .unwrap();

        let (status, body) = send(app(&server, false), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"text": "A sleepy bear."}));
    }

    #[tokio::test]
    async fn empty_or_null_animal_is_rejected() {
        let server = MockServer::start().await;
        expect_no_upstream_call(&server).await;

        for body in [
            r#"{"animal":""}"#,
            r#"{"animal":null}"#,
            r#"{"animal_name":"Pip","moral":"courage"}"#,
        ] {
            let (status, body) = send(app(&server, false), post(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"error": "Missing required parameter: animal"}));
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let server = MockServer::start().await;
        expect_no_upstream_call(&server).await;

        for raw in ["{not json", r#"{"animal": 7}"#, "[1, 2]"] {
            let (status, body) = send(app(&server, false), post(raw)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Invalid request body");
            assert!(body["details"].is_string());
        }
    }

    #[tokio::test]
    async fn fox_request_uses_defaults_and_returns_story() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{"role": "user", "parts": [{"text": "fox"}]}],
                "generationConfig": {"temperature": 0.7, "maxOutputTokens": 2000}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(story("Once, a fox...")))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = send(app(&server, true), post(r#"{"animal":"fox"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"text": "Once, a fox..."}));

        let requests: Vec<MockRequest> = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let instruction = sent["system_instruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        for default in [
            "Whisper",
            "kindness",
            "enchanted forest",
            "and the stars twinkled overhead",
        ] {
            assert!(instruction.contains(default), "missing default {default}");
        }
    }

    #[tokio::test]
    async fn extracted_text_is_returned_untrimmed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(story("\n  sleepy owl  \n")))
            .mount(&server)
            .await;

        let (status, body) = send(app(&server, false), post(r#"{"animal":"owl"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["text"], "\n  sleepy owl  \n");
    }

    #[tokio::test]
    async fn no_candidates_yield_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let (status, body) = send(app(&server, false), post(r#"{"animal":"owl"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"text": ""}));

        server.reset().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"promptFeedback": {}})))
            .mount(&server)
            .await;

        let (status, body) = send(app(&server, false), post(r#"{"animal":"owl"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"text": ""}));
    }

    #[tokio::test]
    async fn upstream_error_status_is_passed_through_as_details() {
        let server = MockServer::start().await;
        let upstream_error = json!({
            "error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(upstream_error.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let (status, body) = send(app(&server, true), post(r#"{"animal":"fox"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"error": "Gemini request failed", "details": upstream_error})
        );
    }

    #[tokio::test]
    async fn network_failure_reports_message() {
        let provider = GeminiProvider::new(
            "http://127.0.0.1:1/v1beta".to_string(),
            "gemini-2.0-flash".to_string(),
            "test-key".to_string(),
            Duration::from_secs(5),
        )
        .unwrap();
        let app = build_router(
            AppState::new(Arc::new(provider), false),
            Duration::from_secs(10),
        );

        let (status, body) = send(app, post(r#"{"animal":"fox"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Gemini request failed");
        let details = body["details"].as_str().unwrap();
        assert!(!details.is_empty());
        assert!(!details.contains("test-key"));
    }
}
