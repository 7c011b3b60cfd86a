//! Configuration and version endpoints
//!
//! Configs live under their project; versions are immutable and append-only,
//! with a server-computed checksum per version. The diff endpoint compares a
//! version against its predecessor (`base=prev`) or an explicit version
//! number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsdeck_gateway::{Gateway, Result};

/// Configuration kinds known to the platform's validators.
pub const CONFIG_TYPES: &[&str] = &["K8S_YAML", "TERRAFORM", "GENERIC_YAML"];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub config_type: String,
    pub latest_version_id: Option<Uuid>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigCreate {
    pub title: String,
    #[serde(rename = "type")]
    pub config_type: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigVersion {
    pub id: Uuid,
    pub config_id: Uuid,
    pub version_number: i64,
    pub content: String,
    pub checksum: String,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
struct VersionCreate<'a> {
    content: &'a str,
}

/// Diff of a version against a base version, as produced by the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionDiff {
    pub unified_diff: String,
    #[serde(default)]
    pub hunks: Vec<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

pub async fn create(gateway: &Gateway, project_id: Uuid, config: &ConfigCreate) -> Result<Config> {
    gateway
        .post_json(&format!("/projects/{project_id}/configs"), config)
        .await
}

pub async fn list(gateway: &Gateway, project_id: Uuid) -> Result<Vec<Config>> {
    gateway
        .get_json(&format!("/projects/{project_id}/configs"))
        .await
}

pub async fn get(gateway: &Gateway, config_id: Uuid) -> Result<Config> {
    gateway.get_json(&format!("/configs/{config_id}")).await
}

pub async fn delete(gateway: &Gateway, config_id: Uuid) -> Result<()> {
    gateway.delete(&format!("/configs/{config_id}")).await
}

/// Append a new version with the given content.
pub async fn create_version(
    gateway: &Gateway,
    config_id: Uuid,
    content: &str,
) -> Result<ConfigVersion> {
    gateway
        .post_json(
            &format!("/configs/{config_id}/versions"),
            &VersionCreate { content },
        )
        .await
}

pub async fn list_versions(gateway: &Gateway, config_id: Uuid) -> Result<Vec<ConfigVersion>> {
    gateway
        .get_json(&format!("/configs/{config_id}/versions"))
        .await
}

pub async fn get_version(gateway: &Gateway, version_id: Uuid) -> Result<ConfigVersion> {
    gateway.get_json(&format!("/versions/{version_id}")).await
}

/// Diff a version against `base`: `"prev"` or a version number.
pub async fn diff_version(gateway: &Gateway, version_id: Uuid, base: &str) -> Result<VersionDiff> {
    gateway
        .get_json_query(
            &format!("/versions/{version_id}/diff"),
            &[("base", base.to_string())],
        )
        .await
}
