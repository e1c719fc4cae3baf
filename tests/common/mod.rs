#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;

use prompt_builder::{
    app,
    completion::{CompletionError, CompletionService},
    config::Config,
    routes::{AppState, ensure_default_admin},
    store::MemoryStore,
};

pub const WEBSITE_JSON: &str = "```json\n{\"type\":\"website\",\"framework\":\"html\",\"files\":{\"index.html\":\"<!DOCTYPE html><h1>Todo</h1>\",\"styles.css\":\"h1{}\"}}\n```";
pub const MOBILE_JSON: &str = r#"{"type":"mobile-app","framework":"react-native","files":{"App.js":"export default App;","screens/HomeScreen.js":"home"}}"#;
pub const ENHANCED_JSON: &str = r#"{"type":"website","framework":"html","files":{"index.html":"<h1>Todo</h1><footer>2026</footer>"}}"#;

/// Answers by prompt shape and records every prompt it sees.
pub struct ScriptedCompletion {
    pub fail_mobile: bool,
    pub fail_website: bool,
    /// Mobile prompts get prose instead of JSON, so the parser falls back.
    pub prose_mobile: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self { fail_mobile: false, fail_website: false, prose_mobile: false, prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing_mobile() -> Self {
        Self { fail_mobile: true, ..Self::new() }
    }

    pub fn prose_mobile() -> Self {
        Self { prose_mobile: true, ..Self::new() }
    }

    pub fn failing_everything() -> Self {
        Self { fail_mobile: true, fail_website: true, ..Self::new() }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().push(prompt.to_string());
        if prompt.starts_with("Enhance") {
            Ok(ENHANCED_JSON.to_string())
        } else if prompt.contains("mobile app") {
            if self.fail_mobile {
                Err(CompletionError::Transport("connection refused".into()))
            } else if self.prose_mobile {
                Ok("Sure! Here is a friendly todo app for your phone.".to_string())
            } else {
                Ok(MOBILE_JSON.to_string())
            }
        } else if self.fail_website {
            Err(CompletionError::Transport("connection refused".into()))
        } else {
            Ok(WEBSITE_JSON.to_string())
        }
    }
}

pub fn test_config(extra: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("TOKEN_SECRET", "test-secret"),
        ("GENERATION_TIMEOUT_SECS", "5"),
        ("ADMIN_USERNAME", "admin"),
        ("ADMIN_PASSWORD", "admin-pass"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(move |k| vars.get(k).cloned())
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub completion: Arc<ScriptedCompletion>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }
}

impl TestApp {
    pub async fn new(completion: ScriptedCompletion) -> Self {
        Self::with_config(completion, test_config(&[])).await
    }

    pub async fn with_config(completion: ScriptedCompletion, config: Config) -> Self {
        let completion = Arc::new(completion);
        let state = AppState::new(config, Arc::new(MemoryStore::new()), completion.clone());
        ensure_default_admin(&state).await.unwrap();
        Self { router: app(state.clone()), state, completion }
    }

    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
        TestResponse { status, headers, bytes }
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.send(method, uri, token, body).await;
        (response.status, response.json())
    }

    /// Registers a user and returns its bearer token.
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "name": "Test User", "email": email, "password": "password123" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/admin/login",
                None,
                Some(json!({ "username": "admin", "password": "admin-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a single-type website project and returns its id.
    pub async fn create_website_project(&self, token: &str, name: &str) -> String {
        let code: Value = serde_json::from_str(
            r#"{"type":"website","framework":"html","files":{"index.html":"<h1>v1</h1>"}}"#,
        )
        .unwrap();
        let (status, body) = self
            .call(
                Method::POST,
                "/api/projects",
                Some(token),
                Some(json!({ "name": name, "prompt": "todo app", "generatedCode": code })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
        body["project"]["id"].as_str().unwrap().to_string()
    }
}
