use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// The fields of a GCP service-account key file the pipeline relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub project_id: String,
    pub client_email: String,
}

impl ServiceAccountKey {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid credentials file: {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let key: ServiceAccountKey =
            serde_json::from_str(contents).context("Failed to parse service account JSON")?;

        if key.key_type != "service_account" {
            bail!("expected a service_account key, found '{}'", key.key_type);
        }
        if key.project_id.trim().is_empty() {
            bail!("service account key has an empty project_id");
        }

        Ok(key)
    }
}
