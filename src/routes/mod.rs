use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Uri},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    auth::{TokenSigner, hash_password},
    completion::CompletionService,
    config::Config,
    deploy::Deployer,
    error::AppError,
    generator::Generator,
    models::DeploymentPlatform,
    store::{Store, StoreError},
};

pub mod admin;
pub mod auth;
pub mod deploy;
pub mod generate;
pub mod projects;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub generator: Arc<Generator>,
    pub deployer: Arc<Deployer>,
    pub tokens: Arc<TokenSigner>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn Store>, completion: Arc<dyn CompletionService>) -> Self {
        Self {
            store,
            generator: Arc::new(Generator::new(completion, config.generation_timeout)),
            deployer: Arc::new(Deployer::new(config.deploy.clone())),
            tokens: Arc::new(TokenSigner::new(&config.token_secret)),
            config: Arc::new(config),
        }
    }
}

/// Creates the configured administrator unless one with that username exists.
pub async fn ensure_default_admin(state: &AppState) -> Result<(), AppError> {
    let admin = &state.config.admin;
    if state.store.find_admin_by_username(&admin.username).await?.is_some() {
        return Ok(());
    }
    match state.store.create_admin(&admin.username, &admin.email, &hash_password(&admin.password)).await {
        Ok(_) => {
            info!("✅ Default admin created: username={}", admin.username);
            Ok(())
        }
        Err(StoreError::Duplicate(_)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn app(state: AppState) -> Router {
    let cors = match state.config.frontend_url.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any),
        Some(Err(_)) => {
            warn!("FRONTEND_URL is not a valid origin, allowing any origin");
            CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
        }
        None => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/projects", get(projects::list_projects).post(projects::create_project))
        .route(
            "/api/projects/:id",
            get(projects::get_project).put(projects::update_project).delete(projects::delete_project),
        )
        .route("/api/projects/:id/versions", get(projects::list_versions))
        .route("/api/generate", post(generate::generate))
        .route("/api/generate/enhance", post(generate::enhance))
        .route("/api/deploy/vercel", post(deploy::deploy_vercel))
        .route("/api/deploy/netlify", post(deploy::deploy_netlify))
        .route("/api/deploy/export/:project_id", post(deploy::export_project))
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id", get(admin::get_user))
        .route("/api/admin/prompts", get(admin::list_prompts))
        .route("/api/admin/prompts/user/:user_id", get(admin::list_user_prompts))
        .route("/api/admin/code/:project_id", get(admin::get_project_code))
        .route("/api/admin/analytics", get(admin::analytics))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn index() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Welcome to One-Prompt Builder API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "auth": {
                "register": "POST /api/auth/register",
                "login": "POST /api/auth/login",
                "me": "GET /api/auth/me",
            },
            "projects": {
                "list": "GET /api/projects",
                "create": "POST /api/projects",
                "get": "GET /api/projects/:id",
                "update": "PUT /api/projects/:id",
                "delete": "DELETE /api/projects/:id",
                "versions": "GET /api/projects/:id/versions",
            },
            "generate": {
                "generate": "POST /api/generate",
                "enhance": "POST /api/generate/enhance",
            },
            "deploy": {
                "vercel": "POST /api/deploy/vercel",
                "netlify": "POST /api/deploy/netlify",
                "export": "POST /api/deploy/export/:project_id",
            },
        },
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": Utc::now().to_rfc3339(),
        "completionConfigured": state.config.completion.api_key.is_some(),
        "deployTargets": {
            "vercel": state.deployer.is_configured(DeploymentPlatform::Vercel),
            "netlify": state.deployer.is_configured(DeploymentPlatform::Netlify),
        },
    }))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("Not Found - {}", uri.path()))
}
