use axum::{
    Extension,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use utoipa::ToSchema;

/// Where to look for the `.env` markers provisioning leaves behind.
#[derive(Debug, Clone)]
pub struct StatusConfig {
    state_dir: PathBuf,
    mail_domain: Option<String>,
}

impl StatusConfig {
    #[must_use]
    pub fn new(state_dir: PathBuf, mail_domain: Option<String>) -> Self {
        Self {
            state_dir,
            mail_domain,
        }
    }

    fn local_env(&self) -> PathBuf {
        self.state_dir.join(".env")
    }

    fn thunder_env(&self) -> PathBuf {
        self.state_dir.join("thunder").join("scripts").join(".env")
    }
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    initialized: bool,
    local_env: bool,
    thunder_env: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    mail_domain: Option<String>,
}

#[utoipa::path(
    get,
    path= "/api/status",
    responses (
        (status = 200, description = "Provisioning state", body = SystemStatus)
    ),
    tag = "provisioning",
)]
/// Report whether the system has been provisioned.
///
/// Provisioning is considered complete once both the local `.env` and the
/// Thunder scripts `.env` exist.
pub async fn status(Extension(config): Extension<Arc<StatusConfig>>) -> impl IntoResponse {
    let local_env = marker_exists(&config.local_env());
    let thunder_env = marker_exists(&config.thunder_env());

    Json(SystemStatus {
        initialized: local_env && thunder_env,
        local_env,
        thunder_env,
        mail_domain: config.mail_domain.clone(),
    })
}

fn marker_exists(path: &Path) -> bool {
    path.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::to_bytes;
    use std::fs;

    async fn status_json(config: StatusConfig) -> Result<serde_json::Value> {
        let response = status(Extension(Arc::new(config))).await.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[tokio::test]
    async fn initialized_requires_both_markers() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(".env"), "DOMAIN=example.com")?;

        let json = status_json(StatusConfig::new(dir.path().to_path_buf(), None)).await?;
        assert_eq!(json["initialized"], false);
        assert_eq!(json["localEnv"], true);
        assert_eq!(json["thunderEnv"], false);

        fs::create_dir_all(dir.path().join("thunder/scripts"))?;
        fs::write(dir.path().join("thunder/scripts/.env"), "TOKEN=x")?;

        let json = status_json(StatusConfig::new(dir.path().to_path_buf(), None)).await?;
        assert_eq!(json["initialized"], true);
        Ok(())
    }

    #[tokio::test]
    async fn mail_domain_is_reported_when_configured() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let json = status_json(StatusConfig::new(
            dir.path().to_path_buf(),
            Some("example.com".to_string()),
        ))
        .await?;
        assert_eq!(json["mailDomain"], "example.com");

        let json = status_json(StatusConfig::new(dir.path().to_path_buf(), None)).await?;
        assert!(json.get("mailDomain").is_none());
        Ok(())
    }
}
