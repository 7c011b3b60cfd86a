//! Policy endpoints
//!
//! Policies are either global or scoped to a project. The validate endpoint
//! dry-runs a rule against configuration content without persisting
//! anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsdeck_gateway::{Gateway, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub scope: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub rule: String,
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyCreate {
    pub name: String,
    /// GLOBAL or PROJECT
    pub scope: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyValidateRequest {
    pub rule: String,
    pub content: String,
    #[serde(rename = "type")]
    pub config_type: String,
}

/// Outcome of a validation dry-run. `valid` reports rule syntax; `passed`
/// reports whether the content satisfied the rule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyValidation {
    pub valid: bool,
    pub passed: bool,
    pub messages: Vec<String>,
}

pub async fn create(gateway: &Gateway, policy: &PolicyCreate) -> Result<Policy> {
    gateway.post_json("/policies", policy).await
}

pub async fn list(gateway: &Gateway, project_id: Option<Uuid>) -> Result<Vec<Policy>> {
    match project_id {
        Some(id) => {
            gateway
                .get_json_query("/policies", &[("project_id", id.to_string())])
                .await
        }
        None => gateway.get_json("/policies").await,
    }
}

pub async fn delete(gateway: &Gateway, policy_id: Uuid) -> Result<()> {
    gateway.delete(&format!("/policies/{policy_id}")).await
}

pub async fn validate(
    gateway: &Gateway,
    request: &PolicyValidateRequest,
) -> Result<PolicyValidation> {
    gateway.post_json("/policies/validate", request).await
}
