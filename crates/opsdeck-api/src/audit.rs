//! Audit log endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsdeck_gateway::{Gateway, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub subject_type: String,
    pub subject_id: Uuid,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Server-side filters for the audit listing; all optional.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub limit: Option<u32>,
}

/// List audit entries, newest first. Requires ADMIN or MAINTAINER role
/// server-side; others get a 403 through the normal error path.
pub async fn list(gateway: &Gateway, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
    let mut query: Vec<(&str, String)> = Vec::new();
    if let Some(actor_id) = filter.actor_id {
        query.push(("actor_id", actor_id.to_string()));
    }
    if let Some(action) = &filter.action {
        query.push(("action", action.clone()));
    }
    if let Some(limit) = filter.limit {
        query.push(("limit", limit.to_string()));
    }
    gateway.get_json_query("/audit", &query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_entry_deserializes_with_opaque_metadata() {
        let json = r#"{
            "id": "0b6f7f4e-9f08-4a5e-b3f0-1d2f2c4a9e11",
            "actor_id": "11111111-2222-3333-4444-555555555555",
            "action": "CONFIG_CREATED",
            "subject_type": "Config",
            "subject_id": "22222222-3333-4444-5555-666666666666",
            "metadata": {"title": "ingress", "version": 3},
            "created_at": "2025-03-01T12:00:00Z"
        }"#;
        let entry: AuditEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.action, "CONFIG_CREATED");
        assert_eq!(entry.metadata["version"], 3);
    }

    #[test]
    fn default_filter_is_empty() {
        let filter = AuditFilter::default();
        assert!(filter.actor_id.is_none());
        assert!(filter.action.is_none());
        assert!(filter.limit.is_none());
    }
}
