use axum::{Json, extract::{Path, State}, http::StatusCode};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{CodeSnapshot, Project, ProjectKind, ProjectPatch, ProjectStatus, PromptRecord, User},
    normalizer::{self, ProjectDraft},
};

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectBody {
    pub name: Option<String>,
    pub prompt: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ProjectKind>,
    pub framework: Option<String>,
    pub description: Option<String>,
    pub generated_code: Option<CodeSnapshot>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectBody {
    pub name: Option<String>,
    pub generated_code: Option<CodeSnapshot>,
    /// Describes the version created by `generated_code`.
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
}

/// Loads a project and checks that `user` owns it.
pub(crate) async fn owned_project(state: &AppState, user: &User, id: &str) -> Result<Project, AppError> {
    let project = state
        .store
        .find_project(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    if project.owner_id != user.id {
        return Err(AppError::Ownership("Not authorized to access this project".into()));
    }
    Ok(project)
}

/// Persists a new project and records its prompt in the owner's activity.
pub(crate) async fn save_project(state: &AppState, draft: ProjectDraft) -> Result<Project, AppError> {
    let owner_id = draft.owner_id.clone();
    let project = state.store.create_project(normalizer::new_project(draft)?).await?;
    state
        .store
        .record_prompt(&owner_id, PromptRecord {
            id: Uuid::new_v4().to_string(),
            text: project.prompt.clone(),
            timestamp: Utc::now(),
            project_id: project.id.clone(),
        })
        .await?;
    info!("💾 Saved project {} ({:?}, {} files)", project.id, project.kind, project.generated_code.file_count());
    Ok(project)
}

pub async fn list_projects(State(state): State<AppState>, AuthUser(user): AuthUser) -> Result<Json<Value>, AppError> {
    let mut projects = state.store.list_projects_by_owner(&user.id).await?;
    projects.reverse();
    Ok(Json(json!({ "success": true, "count": projects.len(), "projects": projects })))
}

pub async fn get_project(
    Path(id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let project = owned_project(&state, &user, &id).await?;
    Ok(Json(json!({ "success": true, "project": project })))
}

pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateProjectBody>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (Some(name), Some(prompt), Some(code)) = (body.name, body.prompt, body.generated_code) else {
        return Err(AppError::Validation("Please provide name, prompt, and generatedCode".into()));
    };
    let kind = normalizer::resolve_kind(body.kind, &code)?;
    let project = save_project(&state, ProjectDraft {
        owner_id: user.id,
        name,
        description: body.description,
        prompt,
        kind,
        framework: body.framework,
        code,
    })
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "project": project }))))
}

pub async fn update_project(
    Path(id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<UpdateProjectBody>,
) -> Result<Json<Value>, AppError> {
    let current = owned_project(&state, &user, &id).await?;

    let mut patch = match body.generated_code {
        Some(code) => normalizer::code_update(current.kind, code, body.description)?,
        None => ProjectPatch::default(),
    };
    if let Some(name) = body.name {
        patch.name = Some(normalizer::validate_name(&name)?);
    }
    patch.status = body.status;

    let project = state
        .store
        .update_project(&id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))?;
    info!("✏️ Updated project {} ({} versions)", project.id, project.versions.len());
    Ok(Json(json!({ "success": true, "project": project })))
}

pub async fn delete_project(
    Path(id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    owned_project(&state, &user, &id).await?;
    state.store.delete_project(&id).await?;
    info!("🗑️ Deleted project {}", id);
    Ok(Json(json!({ "success": true, "message": "Project deleted successfully" })))
}

pub async fn list_versions(
    Path(id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>, AppError> {
    let project = owned_project(&state, &user, &id).await?;
    Ok(Json(json!({ "success": true, "count": project.versions.len(), "versions": project.versions })))
}
