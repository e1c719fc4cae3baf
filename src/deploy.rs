use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, info};

use crate::{config::DeployConfig, models::DeploymentPlatform};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("{0} token not configured")]
    MissingToken(DeploymentPlatform),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("{platform} API error ({status}): {message}")]
    Api { platform: DeploymentPlatform, status: u16, message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentResult {
    pub url: String,
    pub deployment_id: String,
}

/// Publishes flat file sets to hosting platforms.
pub struct Deployer {
    client: Client,
    config: DeployConfig,
}

#[derive(Debug, Deserialize)]
struct VercelDeployment { id: String, url: String }

#[derive(Debug, Deserialize)]
struct NetlifySite {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    ssl_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NetlifyDeploy { id: String }

impl Deployer {
    pub fn new(config: DeployConfig) -> Self {
        Self { client: Client::new(), config }
    }

    pub fn is_configured(&self, platform: DeploymentPlatform) -> bool {
        self.token(platform).is_ok()
    }

    fn token(&self, platform: DeploymentPlatform) -> Result<&str, DeployError> {
        let token = match platform {
            DeploymentPlatform::Vercel => self.config.vercel_token.as_deref(),
            DeploymentPlatform::Netlify => self.config.netlify_token.as_deref(),
        };
        token.ok_or(DeployError::MissingToken(platform))
    }

    pub async fn deploy(
        &self,
        platform: DeploymentPlatform,
        project_name: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<DeploymentResult, DeployError> {
        let token = self.token(platform)?;
        let name = slugify(project_name);
        info!("🚀 Deploying '{}' ({} files) to {}", name, files.len(), platform);
        let result = match platform {
            DeploymentPlatform::Vercel => self.deploy_vercel(token, &name, files).await,
            DeploymentPlatform::Netlify => self.deploy_netlify(token, &name, files).await,
        };
        match &result {
            Ok(r) => info!("✅ Deployed to {}: {}", platform, r.url),
            Err(e) => error!("❌ {} deployment failed: {}", platform, e),
        }
        result
    }

    async fn deploy_vercel(
        &self,
        token: &str,
        name: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<DeploymentResult, DeployError> {
        let payload = json!({
            "name": name,
            "files": files.iter().map(|(file, content)| json!({
                "file": file,
                "data": STANDARD.encode(content.as_bytes()),
                "encoding": "base64",
            })).collect::<Vec<_>>(),
            "projectSettings": { "framework": null },
        });
        let url = format!("{}/v13/deployments", self.config.vercel_api_base.trim_end_matches('/'));
        let deployment: VercelDeployment = self.post_json(DeploymentPlatform::Vercel, &url, token, &payload).await?;
        Ok(DeploymentResult { url: format!("https://{}", deployment.url), deployment_id: deployment.id })
    }

    async fn deploy_netlify(
        &self,
        token: &str,
        name: &str,
        files: &BTreeMap<String, String>,
    ) -> Result<DeploymentResult, DeployError> {
        let base = self.config.netlify_api_base.trim_end_matches('/');
        let site: NetlifySite = self
            .post_json(DeploymentPlatform::Netlify, &format!("{base}/sites"), token, &json!({ "name": name }))
            .await?;

        let encoded: BTreeMap<&str, String> =
            files.iter().map(|(file, content)| (file.as_str(), STANDARD.encode(content.as_bytes()))).collect();
        let deploy: NetlifyDeploy = self
            .post_json(
                DeploymentPlatform::Netlify,
                &format!("{base}/sites/{}/deploys", site.id),
                token,
                &json!({ "files": encoded }),
            )
            .await?;

        let url = site.ssl_url.or(site.url).unwrap_or_else(|| format!("https://{name}.netlify.app"));
        Ok(DeploymentResult { url, deployment_id: deploy.id })
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        platform: DeploymentPlatform,
        url: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> Result<T, DeployError> {
        let response = self.client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|e| DeployError::Http(e.to_string()))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| DeployError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(DeployError::Api { platform, status: status.as_u16(), message: api_message(&text) });
        }
        serde_json::from_str(&text).map_err(|e| DeployError::Http(format!("unexpected {platform} response: {e}")))
    }
}

/// Vercel and Netlify error bodies use `error.message` or a top-level `message`.
fn api_message(body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).unwrap_or_default();
    value
        .pointer("/error/message")
        .or_else(|| value.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| crate::completion::preview(body, 300))
}

/// Lowercase, dash-separated name accepted by both platforms.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() { "project".to_string() } else { slug.to_string() }
}
