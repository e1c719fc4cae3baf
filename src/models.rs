use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};
use std::{collections::BTreeMap, fmt, str::FromStr};

use crate::error::AppError;

/// One of the two things the completion service can be asked to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationType {
    Website,
    MobileApp,
}

impl GenerationType {
    pub const ALL: [GenerationType; 2] = [GenerationType::Website, GenerationType::MobileApp];

    pub fn as_str(self) -> &'static str {
        match self {
            GenerationType::Website => "website",
            GenerationType::MobileApp => "mobile-app",
        }
    }

    /// Framework used when the caller does not name one.
    pub fn default_framework(self) -> &'static str {
        match self {
            GenerationType::Website => "html",
            GenerationType::MobileApp => "react-native",
        }
    }
}

impl fmt::Display for GenerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "website" => Ok(GenerationType::Website),
            "mobile-app" => Ok(GenerationType::MobileApp),
            other => Err(other.to_string()),
        }
    }
}

/// The stored type of a project; `Both` when more than one type was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectKind {
    Website,
    MobileApp,
    Both,
}

impl ProjectKind {
    pub fn includes(self, ty: GenerationType) -> bool {
        match self {
            ProjectKind::Both => true,
            ProjectKind::Website => ty == GenerationType::Website,
            ProjectKind::MobileApp => ty == GenerationType::MobileApp,
        }
    }
}

impl From<GenerationType> for ProjectKind {
    fn from(ty: GenerationType) -> Self {
        match ty {
            GenerationType::Website => ProjectKind::Website,
            GenerationType::MobileApp => ProjectKind::MobileApp,
        }
    }
}

/// A validated generation request. Construct through [`GenerationRequest::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub types: Vec<GenerationType>,
    pub framework: Option<String>,
    pub features: Vec<String>,
}

impl GenerationRequest {
    /// Validates raw type tokens. Every unknown token is reported, duplicates
    /// collapse onto their first occurrence.
    pub fn new(
        prompt: &str,
        tokens: &[String],
        framework: Option<String>,
        features: Vec<String>,
    ) -> Result<Self, AppError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(AppError::Validation("Please provide a prompt".into()));
        }
        if tokens.is_empty() {
            return Err(AppError::Validation("Please provide type or types array".into()));
        }

        let mut types = Vec::with_capacity(tokens.len());
        let mut invalid = Vec::new();
        for token in tokens {
            match token.parse::<GenerationType>() {
                Ok(ty) if !types.contains(&ty) => types.push(ty),
                Ok(_) => {}
                Err(bad) => invalid.push(bad),
            }
        }
        if !invalid.is_empty() {
            return Err(AppError::Validation(format!(
                "Invalid types: {}. Must be \"website\" or \"mobile-app\"",
                invalid.join(", ")
            )));
        }

        let framework = framework.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
        Ok(Self { prompt: prompt.to_string(), types, framework, features })
    }
}

/// A parsed multi-file project as returned by the completion service.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedCode {
    #[serde(rename = "type")]
    pub kind: String,
    pub framework: String,
    pub files: BTreeMap<String, String>,
    pub dependencies: Option<BTreeMap<String, String>>,
    pub structure: Option<Vec<String>>,
    pub instructions: Option<String>,
}

/// Current code of a project: one result, or one result per type for `both`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeSnapshot {
    Single(GeneratedCode),
    Combined(BTreeMap<GenerationType, GeneratedCode>),
}

impl CodeSnapshot {
    /// Project kind implied by the snapshot itself.
    pub fn kind(&self) -> Result<ProjectKind, AppError> {
        match self {
            CodeSnapshot::Single(code) => code
                .kind
                .parse::<GenerationType>()
                .map(ProjectKind::from)
                .map_err(|bad| AppError::Validation(format!("Unknown generated code type: {bad}"))),
            CodeSnapshot::Combined(map) => match map.len() {
                0 => Err(AppError::Validation("generatedCode must not be empty".into())),
                1 => Ok(map.keys().next().copied().map(ProjectKind::from).unwrap_or(ProjectKind::Both)),
                _ => Ok(ProjectKind::Both),
            },
        }
    }

    pub fn framework(&self) -> Option<&str> {
        match self {
            CodeSnapshot::Single(code) => Some(code.framework.as_str()),
            CodeSnapshot::Combined(_) => None,
        }
    }

    /// Flat file view for export and deployment. Combined snapshots namespace
    /// every path by its type so files with equal names never collide.
    pub fn flatten_files(&self) -> BTreeMap<String, String> {
        match self {
            CodeSnapshot::Single(code) => code.files.clone(),
            CodeSnapshot::Combined(map) => map
                .iter()
                .flat_map(|(ty, code)| {
                    code.files
                        .iter()
                        .map(move |(path, body)| (format!("{}/{}", ty.as_str(), path), body.clone()))
                })
                .collect(),
        }
    }

    pub fn file_count(&self) -> usize {
        match self {
            CodeSnapshot::Single(code) => code.files.len(),
            CodeSnapshot::Combined(map) => map.values().map(|c| c.files.len()).sum(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProjectVersion {
    pub code: CodeSnapshot,
    pub timestamp: DateTime<Utc>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentPlatform {
    Vercel,
    Netlify,
}

impl fmt::Display for DeploymentPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeploymentPlatform::Vercel => "Vercel",
            DeploymentPlatform::Netlify => "Netlify",
        })
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub prompt: String,
    #[serde(rename = "type")]
    pub kind: ProjectKind,
    pub framework: Option<String>,
    pub generated_code: CodeSnapshot,
    pub versions: Vec<ProjectVersion>,
    pub status: ProjectStatus,
    pub deployment_url: Option<String>,
    pub deployment_platform: Option<DeploymentPlatform>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for a project that does not exist yet; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub prompt: String,
    pub kind: ProjectKind,
    pub framework: Option<String>,
    pub generated_code: CodeSnapshot,
    pub initial_version: ProjectVersion,
}

/// A partial update applied by the store in one write.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    /// New snapshot plus the version entry recording it.
    pub code: Option<(ProjectKind, CodeSnapshot, ProjectVersion)>,
    pub deployment: Option<(DeploymentPlatform, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// What a client is allowed to see of a user.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(u: &User) -> Self {
        Self { id: u.id.clone(), name: u.name.clone(), email: u.email.clone(), role: u.role }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminSession {
    pub admin_id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptRecord {
    pub id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub project_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserActivity {
    pub user_id: String,
    pub prompts: Vec<PromptRecord>,
    pub projects: Vec<String>,
    pub total_generations: u64,
    pub last_active: DateTime<Utc>,
}

impl UserActivity {
    pub fn empty(user_id: &str, since: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            prompts: Vec::new(),
            projects: Vec::new(),
            total_generations: 0,
            last_active: since,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn code(kind: &str, files: &[(&str, &str)]) -> GeneratedCode {
        GeneratedCode {
            kind: kind.into(),
            framework: "html".into(),
            files: files.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            dependencies: None,
            structure: None,
            instructions: None,
        }
    }

    #[test]
    fn request_rejects_every_unknown_token() {
        let tokens = vec!["website".to_string(), "desktop-app".into(), "cli".into()];
        let err = GenerationRequest::new("todo app", &tokens, None, vec![]).unwrap_err();
        match err {
            AppError::Validation(msg) => {
                assert!(msg.contains("desktop-app"));
                assert!(msg.contains("cli"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn request_rejects_empty_types_and_prompt() {
        assert!(matches!(
            GenerationRequest::new("todo", &[], None, vec![]),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            GenerationRequest::new("   ", &["website".to_string()], None, vec![]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn request_collapses_duplicates_in_order() {
        let tokens = vec!["mobile-app".to_string(), "website".into(), "mobile-app".into()];
        let req = GenerationRequest::new("todo", &tokens, Some("  ".into()), vec![]).unwrap();
        assert_eq!(req.types, vec![GenerationType::MobileApp, GenerationType::Website]);
        assert_eq!(req.framework, None);
    }

    #[test]
    fn combined_snapshot_namespaces_colliding_paths() {
        let mut map = BTreeMap::new();
        map.insert(GenerationType::Website, code("website", &[("index.html", "web"), ("README.md", "a")]));
        map.insert(GenerationType::MobileApp, code("mobile-app", &[("App.js", "app"), ("README.md", "b")]));
        let snapshot = CodeSnapshot::Combined(map);

        let flat = snapshot.flatten_files();
        assert_eq!(flat.len(), 4);
        assert_eq!(flat["website/README.md"], "a");
        assert_eq!(flat["mobile-app/README.md"], "b");
        assert_eq!(snapshot.kind().unwrap(), ProjectKind::Both);
        assert_eq!(snapshot.file_count(), 4);
    }

    #[test]
    fn snapshot_deserializes_single_and_combined_shapes() {
        let single: CodeSnapshot = serde_json::from_str(
            r#"{"type":"website","framework":"html","files":{"index.html":"<p>"}}"#,
        )
        .unwrap();
        assert!(matches!(single, CodeSnapshot::Single(_)));
        assert_eq!(single.kind().unwrap(), ProjectKind::Website);

        let combined: CodeSnapshot = serde_json::from_str(
            r#"{"mobile-app":{"type":"mobile-app","framework":"react-native","files":{"App.js":"x"}}}"#,
        )
        .unwrap();
        assert_eq!(combined.kind().unwrap(), ProjectKind::MobileApp);
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User {
            id: "u1".into(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "secret".into(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "user");
    }
}
