use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{GeneratedCode, GenerationRequest, GenerationType, Project},
    normalizer::{self, ProjectDraft},
    orchestrator::{GenerationResults, generate_all},
};

use super::{AppState, projects::save_project};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody {
    pub prompt: Option<String>,
    /// Single type; takes precedence over `types`.
    #[serde(rename = "type")]
    pub single_type: Option<String>,
    pub types: Option<Vec<String>>,
    pub framework: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    /// When set, successful output is saved as a project with this name.
    pub save_as: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub generated_code: GenerationResults,
    pub types: Vec<GenerationType>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceBody {
    pub existing_code: Option<Value>,
    pub enhancement_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub success: bool,
    pub enhanced_code: GeneratedCode,
    pub message: String,
}

fn batch_message(results: &GenerationResults) -> String {
    let (ok, total) = (results.success_count(), results.len());
    if ok < total {
        format!("Generated {ok} of {total} project types; see per-type errors")
    } else if total > 1 {
        "Website and mobile app generated successfully".to_string()
    } else {
        "Project generated successfully".to_string()
    }
}

pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, AppError> {
    let tokens = body.single_type.map(|t| vec![t]).or(body.types).unwrap_or_default();
    let request = GenerationRequest::new(
        body.prompt.as_deref().unwrap_or_default(),
        &tokens,
        body.framework,
        body.features,
    )?;
    let save_as = body.save_as.as_deref().map(normalizer::validate_name).transpose()?;

    let results = generate_all(&state.generator, &request).await;
    if results.all_failed() {
        let details = serde_json::to_value(&results).unwrap_or_else(|_| json!({}));
        return Err(AppError::upstream("Failed to generate project", details));
    }

    let project = match save_as {
        Some(name) => {
            let (kind, code) = normalizer::normalize(&results)?;
            let draft = ProjectDraft {
                owner_id: user.id.clone(),
                name,
                description: None,
                prompt: request.prompt.clone(),
                kind,
                framework: request.framework.clone(),
                code,
            };
            Some(save_project(&state, draft).await?)
        }
        None => None,
    };

    info!("✅ Generation for user {} finished: {}/{} types", user.id, results.success_count(), results.len());
    Ok(Json(GenerateResponse {
        success: true,
        message: batch_message(&results),
        types: results.types(),
        generated_code: results,
        project,
    }))
}

pub async fn enhance(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    Json(body): Json<EnhanceBody>,
) -> Result<Json<EnhanceResponse>, AppError> {
    let existing = body.existing_code.filter(|v| !v.is_null());
    let instruction = body.enhancement_prompt.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
    let (Some(existing), Some(instruction)) = (existing, instruction) else {
        return Err(AppError::Validation("Please provide existing code and enhancement prompt".into()));
    };

    let enhanced_code = state
        .generator
        .enhance(&existing, &instruction)
        .await
        .map_err(|e| AppError::upstream("Failed to enhance code", e.to_string()))?;

    Ok(Json(EnhanceResponse {
        success: true,
        enhanced_code,
        message: "Code enhanced successfully".to_string(),
    }))
}
