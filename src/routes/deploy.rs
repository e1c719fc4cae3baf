use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::{
    auth::AuthUser,
    deploy::DeployError,
    error::AppError,
    export::{ExportError, archive_name, zip_files},
    models::{DeploymentPlatform, ProjectPatch, ProjectStatus, User},
};

use super::{AppState, projects::owned_project};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployBody {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub files: Option<BTreeMap<String, String>>,
}

pub async fn deploy_vercel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<DeployBody>,
) -> Result<Json<Value>, AppError> {
    deploy_to(&state, &user, DeploymentPlatform::Vercel, body).await
}

pub async fn deploy_netlify(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<DeployBody>,
) -> Result<Json<Value>, AppError> {
    deploy_to(&state, &user, DeploymentPlatform::Netlify, body).await
}

async fn deploy_to(
    state: &AppState,
    user: &User,
    platform: DeploymentPlatform,
    body: DeployBody,
) -> Result<Json<Value>, AppError> {
    let project = match &body.project_id {
        Some(id) => Some(owned_project(state, user, id).await?),
        None => None,
    };
    let files = body
        .files
        .filter(|f| !f.is_empty())
        .or_else(|| project.as_ref().map(|p| p.generated_code.flatten_files()));
    let name = body
        .project_name
        .filter(|n| !n.trim().is_empty())
        .or_else(|| project.as_ref().map(|p| p.name.clone()));
    let (Some(name), Some(files)) = (name, files) else {
        return Err(AppError::Validation("Please provide project name and files".into()));
    };

    let result = state.deployer.deploy(platform, &name, &files).await.map_err(|e| match e {
        DeployError::MissingToken(_) => AppError::Config(e.to_string()),
        other => AppError::upstream(format!("{platform} deployment failed"), other.to_string()),
    })?;

    if let Some(project) = project {
        let patch = ProjectPatch {
            status: Some(ProjectStatus::Published),
            deployment: Some((platform, result.url.clone())),
            ..ProjectPatch::default()
        };
        state.store.update_project(&project.id, patch).await?;
    }

    Ok(Json(json!({
        "success": true,
        "url": result.url,
        "deploymentId": result.deployment_id,
        "message": format!("Successfully deployed to {platform}"),
    })))
}

pub async fn export_project(
    Path(project_id): Path<String>,
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Response, AppError> {
    let project = owned_project(&state, &user, &project_id).await?;
    let archive = zip_files(&project.generated_code.flatten_files()).map_err(|e| match e {
        ExportError::Empty => AppError::Validation(e.to_string()),
        other => AppError::Internal(other.to_string()),
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    let disposition = format!("attachment; filename=\"{}\"", archive_name(&project.name));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|e| AppError::Internal(e.to_string()))?,
    );
    Ok((StatusCode::OK, headers, archive).into_response())
}
