//! Project endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsdeck_gateway::{Gateway, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cloud_provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectCreate {
    pub name: String,
    pub description: Option<String>,
    pub cloud_provider: String,
}

/// Partial update; unset fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,
}

pub async fn create(gateway: &Gateway, project: &ProjectCreate) -> Result<Project> {
    gateway.post_json("/projects", project).await
}

pub async fn list(gateway: &Gateway) -> Result<Vec<Project>> {
    gateway.get_json("/projects").await
}

pub async fn get(gateway: &Gateway, id: Uuid) -> Result<Project> {
    gateway.get_json(&format!("/projects/{id}")).await
}

pub async fn update(gateway: &Gateway, id: Uuid, update: &ProjectUpdate) -> Result<Project> {
    gateway.patch_json(&format!("/projects/{id}"), update).await
}
