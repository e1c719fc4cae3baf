//! Shapes generation output into project records and version history.

use chrono::Utc;
use std::collections::BTreeMap;

use crate::{
    error::AppError,
    models::{CodeSnapshot, NewProject, ProjectKind, ProjectPatch, ProjectVersion},
    orchestrator::GenerationResults,
};

pub const INITIAL_VERSION: &str = "Initial version";
pub const UPDATED_VERSION: &str = "Updated version";

const NAME_LEN: std::ops::RangeInclusive<usize> = 2..=100;
const MAX_DESCRIPTION: usize = 500;
const MAX_VERSION_DESCRIPTION: usize = 200;

/// Picks the project kind and snapshot from a batch. Only successful types count:
/// one success keeps that type, several become `both` with one entry per type.
pub fn normalize(results: &GenerationResults) -> Result<(ProjectKind, CodeSnapshot), AppError> {
    let mut successes: BTreeMap<_, _> =
        results.successes().map(|(ty, code)| (ty, code.clone())).collect();
    match successes.len() {
        0 => Err(AppError::Validation("No successful generation to save".into())),
        1 => {
            let (ty, code) = successes.pop_first().ok_or_else(|| AppError::Internal("empty results".into()))?;
            Ok((ty.into(), CodeSnapshot::Single(code)))
        }
        _ => Ok((ProjectKind::Both, CodeSnapshot::Combined(successes))),
    }
}

/// Reconciles an optional caller-declared kind with the snapshot's own shape.
pub fn resolve_kind(declared: Option<ProjectKind>, snapshot: &CodeSnapshot) -> Result<ProjectKind, AppError> {
    let actual = snapshot.kind()?;
    match declared {
        Some(declared) if declared != actual => Err(AppError::Validation(format!(
            "Project type {:?} does not match generated code ({:?})",
            declared, actual
        ))),
        _ => Ok(actual),
    }
}

pub fn new_version(
    code: CodeSnapshot,
    description: Option<String>,
    default: &str,
) -> Result<ProjectVersion, AppError> {
    let description = description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| default.to_string());
    if description.chars().count() > MAX_VERSION_DESCRIPTION {
        return Err(AppError::Validation(format!(
            "Version description cannot exceed {MAX_VERSION_DESCRIPTION} characters"
        )));
    }
    Ok(ProjectVersion { code, timestamp: Utc::now(), description })
}

/// Everything needed to create a project, including its first version entry.
pub struct ProjectDraft {
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub prompt: String,
    pub kind: ProjectKind,
    pub framework: Option<String>,
    pub code: CodeSnapshot,
}

pub fn new_project(draft: ProjectDraft) -> Result<NewProject, AppError> {
    let name = validate_name(&draft.name)?;
    let description = validate_description(draft.description)?;
    let prompt = draft.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(AppError::Validation("Prompt is required".into()));
    }
    let framework = draft
        .framework
        .filter(|f| !f.trim().is_empty())
        .or_else(|| draft.code.framework().map(str::to_string));
    let initial_version = new_version(draft.code.clone(), None, INITIAL_VERSION)?;
    Ok(NewProject {
        owner_id: draft.owner_id,
        name,
        description,
        prompt,
        kind: draft.kind,
        framework,
        generated_code: draft.code,
        initial_version,
    })
}

/// Kind of a project after its code is replaced. The `type` inside a single
/// snapshot is model output (a parser fallback always says `website`), so a
/// single-type project keeps its kind unless the snapshot changes shape.
pub fn updated_kind(current: ProjectKind, code: &CodeSnapshot) -> Result<ProjectKind, AppError> {
    let derived = code.kind()?;
    match (current, code) {
        (ProjectKind::Website | ProjectKind::MobileApp, CodeSnapshot::Single(_)) => Ok(current),
        _ => Ok(derived),
    }
}

/// A patch replacing the snapshot and appending the matching version entry.
pub fn code_update(
    current: ProjectKind,
    code: CodeSnapshot,
    description: Option<String>,
) -> Result<ProjectPatch, AppError> {
    let kind = updated_kind(current, &code)?;
    let version = new_version(code.clone(), description, UPDATED_VERSION)?;
    Ok(ProjectPatch { code: Some((kind, code, version)), ..ProjectPatch::default() })
}

pub fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if !NAME_LEN.contains(&name.chars().count()) {
        return Err(AppError::Validation(format!(
            "Project name must be between {} and {} characters",
            NAME_LEN.start(),
            NAME_LEN.end()
        )));
    }
    Ok(name.to_string())
}

pub fn validate_description(description: Option<String>) -> Result<Option<String>, AppError> {
    let description = description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
    if description.as_ref().is_some_and(|d| d.chars().count() > MAX_DESCRIPTION) {
        return Err(AppError::Validation(format!("Description cannot exceed {MAX_DESCRIPTION} characters")));
    }
    Ok(description)
}
