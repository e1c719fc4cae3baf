use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::{
    auth::{AuthUser, TokenKind, hash_password, verify_password},
    error::AppError,
    models::{NewUser, PublicUser, Role, User},
    store::StoreError,
};

use super::AppState;

const MIN_PASSWORD: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn session_response(state: &AppState, user: &User) -> Value {
    let token = state.tokens.issue(&user.id, TokenKind::User, state.config.token_ttl);
    json!({ "success": true, "token": token, "user": PublicUser::from(user) })
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (Some(name), Some(email), Some(password)) = (required(body.name), required(body.email), body.password) else {
        return Err(AppError::Validation("Please provide all required fields".into()));
    };
    if !email.contains('@') {
        return Err(AppError::Validation("Please provide a valid email".into()));
    }
    if password.chars().count() < MIN_PASSWORD {
        return Err(AppError::Validation(format!("Password must be at least {MIN_PASSWORD} characters")));
    }

    let new_user = NewUser { name, email: email.to_lowercase(), password_hash: hash_password(&password), role: Role::User };
    let user = match state.store.create_user(new_user).await {
        Ok(user) => user,
        Err(StoreError::Duplicate(_)) => {
            return Err(AppError::Conflict("User already exists with this email".into()));
        }
        Err(e) => return Err(e.into()),
    };

    info!("👤 Registered user {}", user.id);
    Ok((StatusCode::CREATED, Json(session_response(&state, &user))))
}

pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Result<Json<Value>, AppError> {
    let (Some(email), Some(password)) = (required(body.email), body.password) else {
        return Err(AppError::Validation("Please provide email and password".into()));
    };
    let user = state.store.find_user_by_email(&email).await?;
    match user {
        Some(user) if verify_password(&password, &user.password_hash) => Ok(Json(session_response(&state, &user))),
        _ => Err(AppError::Auth("Invalid credentials".into())),
    }
}

pub async fn me(AuthUser(user): AuthUser) -> Json<Value> {
    Json(json!({ "success": true, "user": PublicUser::from(&user) }))
}
