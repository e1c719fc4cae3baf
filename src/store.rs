use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Admin, AdminSession, NewProject, NewUser, Project, ProjectPatch, PromptRecord, User, UserActivity,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for {0}")]
    Duplicate(&'static str),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary. Identifiers are opaque strings chosen by the implementation.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn create_project(&self, project: NewProject) -> StoreResult<Project>;
    async fn find_project(&self, id: &str) -> StoreResult<Option<Project>>;
    async fn list_projects_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Project>>;
    async fn list_projects(&self) -> StoreResult<Vec<Project>>;
    /// Applies the whole patch atomically; `None` when the project does not exist.
    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<Option<Project>>;
    async fn delete_project(&self, id: &str) -> StoreResult<bool>;

    async fn create_admin(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<Admin>;
    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>>;
    async fn record_admin_login(&self, id: &str) -> StoreResult<()>;
    async fn create_admin_session(&self, session: AdminSession) -> StoreResult<()>;
    async fn find_admin_session(&self, token: &str) -> StoreResult<Option<AdminSession>>;
    async fn delete_admin_session(&self, token: &str) -> StoreResult<bool>;

    async fn record_prompt(&self, user_id: &str, prompt: PromptRecord) -> StoreResult<()>;
    async fn find_activity(&self, user_id: &str) -> StoreResult<Option<UserActivity>>;
    async fn list_activity(&self) -> StoreResult<Vec<UserActivity>>;
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    projects: RwLock<HashMap<String, Project>>,
    admins: RwLock<HashMap<String, Admin>>,
    admin_sessions: RwLock<HashMap<String, AdminSession>>,
    activity: RwLock<HashMap<String, UserActivity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn by_created_at<T>(mut items: Vec<T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    items.sort_by_key(|item| key(item));
    items
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write();
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Duplicate("email"));
        }
        let created = User {
            id: new_id(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        users.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = self.users.read().values().cloned().collect();
        Ok(by_created_at(users, |u: &User| u.created_at))
    }

    async fn create_project(&self, project: NewProject) -> StoreResult<Project> {
        let now = Utc::now();
        let created = Project {
            id: new_id(),
            owner_id: project.owner_id,
            name: project.name,
            description: project.description,
            prompt: project.prompt,
            kind: project.kind,
            framework: project.framework,
            generated_code: project.generated_code,
            versions: vec![project.initial_version],
            status: Default::default(),
            deployment_url: None,
            deployment_platform: None,
            created_at: now,
            updated_at: now,
        };
        self.projects.write().insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn find_project(&self, id: &str) -> StoreResult<Option<Project>> {
        Ok(self.projects.read().get(id).cloned())
    }

    async fn list_projects_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().values().filter(|p| p.owner_id == owner_id).cloned().collect();
        Ok(by_created_at(projects, |p: &Project| p.created_at))
    }

    async fn list_projects(&self) -> StoreResult<Vec<Project>> {
        let projects = self.projects.read().values().cloned().collect();
        Ok(by_created_at(projects, |p: &Project| p.created_at))
    }

    async fn update_project(&self, id: &str, patch: ProjectPatch) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write();
        let Some(project) = projects.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            project.name = name;
        }
        if let Some(description) = patch.description {
            project.description = Some(description);
        }
        if let Some(status) = patch.status {
            project.status = status;
        }
        if let Some((kind, code, version)) = patch.code {
            project.kind = kind;
            project.generated_code = code;
            project.versions.push(version);
        }
        if let Some((platform, url)) = patch.deployment {
            project.deployment_platform = Some(platform);
            project.deployment_url = Some(url);
        }
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        Ok(self.projects.write().remove(id).is_some())
    }

    async fn create_admin(&self, username: &str, email: &str, password_hash: &str) -> StoreResult<Admin> {
        let mut admins = self.admins.write();
        if admins.values().any(|a| a.username == username) {
            return Err(StoreError::Duplicate("username"));
        }
        let admin = Admin {
            id: new_id(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            last_login: None,
        };
        admins.insert(admin.id.clone(), admin.clone());
        Ok(admin)
    }

    async fn find_admin_by_username(&self, username: &str) -> StoreResult<Option<Admin>> {
        Ok(self.admins.read().values().find(|a| a.username == username).cloned())
    }

    async fn record_admin_login(&self, id: &str) -> StoreResult<()> {
        if let Some(admin) = self.admins.write().get_mut(id) {
            admin.last_login = Some(Utc::now());
        }
        Ok(())
    }

    async fn create_admin_session(&self, session: AdminSession) -> StoreResult<()> {
        let mut sessions = self.admin_sessions.write();
        let now = Utc::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session.token.clone(), session);
        Ok(())
    }

    async fn find_admin_session(&self, token: &str) -> StoreResult<Option<AdminSession>> {
        Ok(self.admin_sessions.read().get(token).cloned())
    }

    async fn delete_admin_session(&self, token: &str) -> StoreResult<bool> {
        Ok(self.admin_sessions.write().remove(token).is_some())
    }

    async fn record_prompt(&self, user_id: &str, prompt: PromptRecord) -> StoreResult<()> {
        let mut activity = self.activity.write();
        let entry = activity
            .entry(user_id.to_string())
            .or_insert_with(|| UserActivity::empty(user_id, prompt.timestamp));
        if !entry.projects.contains(&prompt.project_id) {
            entry.projects.push(prompt.project_id.clone());
        }
        entry.last_active = prompt.timestamp;
        entry.total_generations += 1;
        entry.prompts.push(prompt);
        Ok(())
    }

    async fn find_activity(&self, user_id: &str) -> StoreResult<Option<UserActivity>> {
        Ok(self.activity.read().get(user_id).cloned())
    }

    async fn list_activity(&self) -> StoreResult<Vec<UserActivity>> {
        Ok(self.activity.read().values().cloned().collect())
    }
}
