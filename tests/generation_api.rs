mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{ScriptedCompletion, TestApp};

#[tokio::test]
async fn generate_requires_a_token() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let (status, body) = app
        .call(Method::POST, "/api/generate", None, Some(json!({ "prompt": "todo app", "type": "website" })))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Not authorized, no token provided"));
}

#[tokio::test]
async fn rejects_garbage_tokens() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let (status, body) = app.call(Method::GET, "/api/auth/me", Some("not-a-token"), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Not authorized, token failed"));
}

#[tokio::test]
async fn generates_a_website_from_fenced_output() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "todo app", "type": "website" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["types"], json!(["website"]));
    assert_eq!(body["message"], json!("Project generated successfully"));
    let website = &body["generatedCode"]["website"];
    assert_eq!(website["type"], json!("website"));
    assert_eq!(website["framework"], json!("html"));
    assert_eq!(website["files"]["styles.css"], json!("h1{}"));
    assert!(body.get("project").is_none());
}

#[tokio::test]
async fn partial_failure_keeps_the_successful_type() {
    let app = TestApp::new(ScriptedCompletion::failing_mobile()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "todo app", "types": ["website", "mobile-app"] })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["types"], json!(["website", "mobile-app"]));
    assert_eq!(body["generatedCode"]["website"]["type"], json!("website"));
    assert_eq!(body["generatedCode"]["mobile-app"]["error"], json!("Failed to generate mobile-app"));
    assert_eq!(body["message"], json!("Generated 1 of 2 project types; see per-type errors"));
    assert_eq!(app.completion.calls(), 2);
}

#[tokio::test]
async fn total_failure_is_a_bad_gateway() {
    let app = TestApp::new(ScriptedCompletion::failing_everything()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "todo app", "types": ["website", "mobile-app"] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Failed to generate project"));
    assert_eq!(body["details"]["website"]["error"], json!("Failed to generate website"));
}

#[tokio::test]
async fn unknown_types_fail_before_any_completion_call() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "todo app", "types": ["website", "desktop-app"] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Invalid types: desktop-app. Must be \"website\" or \"mobile-app\""));
    assert_eq!(app.completion.calls(), 0);
}

#[tokio::test]
async fn empty_type_list_is_rejected() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(Method::POST, "/api/generate", Some(&token), Some(json!({ "prompt": "todo app", "types": [] })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Please provide type or types array"));
}

#[tokio::test]
async fn blank_prompt_is_rejected() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(Method::POST, "/api/generate", Some(&token), Some(json!({ "prompt": "  ", "type": "website" })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Please provide a prompt"));
}

#[tokio::test]
async fn save_as_stores_both_types_as_one_project() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({
                "prompt": "todo app",
                "types": ["website", "mobile-app"],
                "features": ["dark mode"],
                "saveAs": "Todo Suite",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], json!("Website and mobile app generated successfully"));
    let project = &body["project"];
    assert_eq!(project["type"], json!("both"));
    assert_eq!(project["name"], json!("Todo Suite"));
    assert_eq!(project["versions"].as_array().map(Vec::len), Some(1));
    assert_eq!(project["generatedCode"]["mobile-app"]["framework"], json!("react-native"));

    let prompts = app.completion.prompts.lock().clone();
    assert!(prompts.iter().all(|p| p.contains("- dark mode")));
}

#[tokio::test]
async fn enhance_requires_code_and_instruction() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate/enhance",
            Some(&token),
            Some(json!({ "enhancementPrompt": "add a footer" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Please provide existing code and enhancement prompt"));
    assert_eq!(app.completion.calls(), 0);
}

#[tokio::test]
async fn enhance_returns_the_parsed_result() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate/enhance",
            Some(&token),
            Some(json!({
                "existingCode": { "type": "website", "framework": "html", "files": { "index.html": "<h1>Todo</h1>" } },
                "enhancementPrompt": "add a footer",
            })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], json!("Code enhanced successfully"));
    assert_eq!(body["enhancedCode"]["files"]["index.html"], json!("<h1>Todo</h1><footer>2026</footer>"));
}

#[tokio::test]
async fn invalid_save_name_fails_before_any_completion_call() {
    let app = TestApp::new(ScriptedCompletion::new()).await;
    let token = app.register("ada@example.com").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/generate",
            Some(&token),
            Some(json!({ "prompt": "todo app", "types": ["website", "mobile-app"], "saveAs": "x" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("Project name must be between 2 and 100 characters"));
    assert_eq!(app.completion.calls(), 0);
}
