use axum::{Json, extract::{Path, State}};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

use crate::{
    auth::{AdminAuth, TokenKind, expires_after, verify_password},
    error::AppError,
    models::{AdminSession, GenerationType, Project, ProjectKind, User, UserActivity},
};

use super::AppState;

const RECENT_ACTIVITY: usize = 10;

#[derive(Debug, Deserialize)]
pub struct AdminLoginBody {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    #[serde(flatten)]
    pub user: User,
    pub project_count: usize,
    pub activity: UserActivity,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptView {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    pub created_at: DateTime<Utc>,
    pub project_name: String,
}

async fn activity_or_empty(state: &AppState, user: &User) -> Result<UserActivity, AppError> {
    Ok(state
        .store
        .find_activity(&user.id)
        .await?
        .unwrap_or_else(|| UserActivity::empty(&user.id, user.created_at)))
}

fn prompt_view(project: &Project, owner: Option<&User>) -> PromptView {
    PromptView {
        id: project.id.clone(),
        user_id: project.owner_id.clone(),
        user_name: owner.map_or_else(|| "Unknown".to_string(), |u| u.name.clone()),
        user_email: owner.map_or_else(|| "Unknown".to_string(), |u| u.email.clone()),
        prompt: project.prompt.clone(),
        kind: project.kind,
        created_at: project.created_at,
        project_name: project.name.clone(),
    }
}

fn newest_first(mut views: Vec<PromptView>) -> Vec<PromptView> {
    views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    views
}

pub async fn login(State(state): State<AppState>, Json(body): Json<AdminLoginBody>) -> Result<Json<Value>, AppError> {
    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(AppError::Validation("Username and password required".into()));
    };
    let admin = state
        .store
        .find_admin_by_username(username.trim())
        .await?
        .filter(|a| verify_password(&password, &a.password_hash))
        .ok_or_else(|| AppError::Auth("Invalid credentials".into()))?;

    let ttl = state.config.admin.session_ttl;
    let token = state.tokens.issue(&admin.id, TokenKind::Admin, ttl);
    let expires_at = expires_after(ttl);
    state
        .store
        .create_admin_session(AdminSession { admin_id: admin.id.clone(), token: token.clone(), expires_at })
        .await?;
    state.store.record_admin_login(&admin.id).await?;

    info!("🔐 Admin {} logged in", admin.username);
    Ok(Json(json!({
        "success": true,
        "token": token,
        "admin": { "id": admin.id, "username": admin.username, "email": admin.email },
    })))
}

pub async fn logout(State(state): State<AppState>, admin: AdminAuth) -> Result<Json<Value>, AppError> {
    state.store.delete_admin_session(&admin.token).await?;
    info!("🔐 Admin {} logged out", admin.admin_id);
    Ok(Json(json!({ "success": true, "message": "Logged out successfully" })))
}

pub async fn list_users(State(state): State<AppState>, _admin: AdminAuth) -> Result<Json<Vec<AdminUserView>>, AppError> {
    let users = state.store.list_users().await?;
    let mut project_counts: HashMap<String, usize> = HashMap::new();
    for project in state.store.list_projects().await? {
        *project_counts.entry(project.owner_id).or_default() += 1;
    }

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        let activity = activity_or_empty(&state, &user).await?;
        let project_count = project_counts.get(&user.id).copied().unwrap_or(0);
        views.push(AdminUserView { user, project_count, activity });
    }
    Ok(Json(views))
}

pub async fn get_user(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Value>, AppError> {
    let user = state
        .store
        .find_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let projects = state.store.list_projects_by_owner(&user.id).await?;
    let activity = activity_or_empty(&state, &user).await?;
    Ok(Json(json!({ "user": user, "projects": projects, "activity": activity })))
}

pub async fn list_prompts(State(state): State<AppState>, _admin: AdminAuth) -> Result<Json<Vec<PromptView>>, AppError> {
    let users: HashMap<String, User> =
        state.store.list_users().await?.into_iter().map(|u| (u.id.clone(), u)).collect();
    let views = state
        .store
        .list_projects()
        .await?
        .iter()
        .map(|p| prompt_view(p, users.get(&p.owner_id)))
        .collect();
    Ok(Json(newest_first(views)))
}

pub async fn list_user_prompts(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<PromptView>>, AppError> {
    let owner = state.store.find_user(&user_id).await?;
    let views = state
        .store
        .list_projects_by_owner(&user_id)
        .await?
        .iter()
        .map(|p| prompt_view(p, owner.as_ref()))
        .collect();
    Ok(Json(newest_first(views)))
}

pub async fn get_project_code(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Value>, AppError> {
    let project = state
        .store
        .find_project(&project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    let owner = state.store.find_user(&project.owner_id).await?;

    let code = serde_json::to_value(&project.generated_code).map_err(|e| AppError::Internal(e.to_string()))?;
    let mut view = serde_json::to_value(&project).map_err(|e| AppError::Internal(e.to_string()))?;
    if let Some(obj) = view.as_object_mut() {
        obj.insert("userName".into(), json!(owner.as_ref().map_or("Unknown", |u| u.name.as_str())));
        obj.insert("userEmail".into(), json!(owner.as_ref().map_or("Unknown", |u| u.email.as_str())));
    }
    Ok(Json(json!({ "project": view, "code": code })))
}

pub async fn analytics(State(state): State<AppState>, _admin: AdminAuth) -> Result<Json<Value>, AppError> {
    let users: HashMap<String, User> =
        state.store.list_users().await?.into_iter().map(|u| (u.id.clone(), u)).collect();
    let mut projects = state.store.list_projects().await?;
    let total_generations: u64 = state.store.list_activity().await?.iter().map(|a| a.total_generations).sum();

    let count = |ty: GenerationType| projects.iter().filter(|p| p.kind.includes(ty)).count();
    let stats = json!({
        "websiteProjects": count(GenerationType::Website),
        "mobileProjects": count(GenerationType::MobileApp),
        "dualProjects": projects.iter().filter(|p| p.kind == ProjectKind::Both).count(),
    });

    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    let recent: Vec<Value> = projects
        .iter()
        .take(RECENT_ACTIVITY)
        .map(|p| json!({
            "projectId": p.id,
            "projectName": p.name,
            "userName": users.get(&p.owner_id).map_or("Unknown", |u| u.name.as_str()),
            "type": p.kind,
            "createdAt": p.created_at,
        }))
        .collect();

    Ok(Json(json!({
        "totalUsers": users.len(),
        "totalProjects": projects.len(),
        "totalGenerations": total_generations,
        "recentActivity": recent,
        "stats": stats,
    })))
}
