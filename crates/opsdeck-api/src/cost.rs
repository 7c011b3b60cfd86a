//! Cloud cost optimizer endpoints
//!
//! Cloud accounts are linked with provider credentials, analyses are run
//! against an account, and each analysis carries a set of recommendations
//! that can be applied or dismissed individually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsdeck_gateway::{Gateway, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub provider: String,
    pub region: Option<String>,
    pub is_active: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloudAccountCreate {
    pub name: String,
    /// AWS, GCP, or AZURE
    pub provider: String,
    /// Provider credentials; opaque to this client, encrypted server-side
    pub credentials: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CostRecommendation {
    pub id: Uuid,
    pub resource_type: String,
    pub resource_id: String,
    pub recommendation_type: String,
    pub title: String,
    pub description: String,
    pub current_cost: f64,
    pub estimated_new_cost: f64,
    pub monthly_savings: f64,
    pub annual_savings: f64,
    pub priority: String,
    pub implementation_effort: String,
    pub status: String,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CostAnalysis {
    pub id: Uuid,
    pub cloud_account_id: Uuid,
    pub analysis_date: DateTime<Utc>,
    pub total_monthly_cost: f64,
    pub potential_savings: f64,
    pub savings_percentage: f64,
    pub resource_count: i64,
    pub cost_breakdown: serde_json::Value,
    #[serde(default)]
    pub recommendations: Vec<CostRecommendation>,
}

#[derive(Serialize)]
struct AnalyzeRequest {
    cloud_account_id: Uuid,
}

#[derive(Serialize)]
struct RecommendationAction<'a> {
    action: &'a str,
}

pub async fn link_account(gateway: &Gateway, account: &CloudAccountCreate) -> Result<CloudAccount> {
    gateway
        .post_json("/cost-optimizer/cloud-accounts", account)
        .await
}

pub async fn list_accounts(gateway: &Gateway) -> Result<Vec<CloudAccount>> {
    gateway.get_json("/cost-optimizer/cloud-accounts").await
}

pub async fn get_account(gateway: &Gateway, account_id: Uuid) -> Result<CloudAccount> {
    gateway
        .get_json(&format!("/cost-optimizer/cloud-accounts/{account_id}"))
        .await
}

pub async fn unlink_account(gateway: &Gateway, account_id: Uuid) -> Result<()> {
    gateway
        .delete(&format!("/cost-optimizer/cloud-accounts/{account_id}"))
        .await
}

/// Run a cost analysis against a linked account. Synchronous server-side;
/// the response carries the full recommendation set.
pub async fn analyze(gateway: &Gateway, cloud_account_id: Uuid) -> Result<CostAnalysis> {
    gateway
        .post_json("/cost-optimizer/analyze", &AnalyzeRequest { cloud_account_id })
        .await
}

pub async fn list_analyses(gateway: &Gateway) -> Result<Vec<CostAnalysis>> {
    gateway.get_json("/cost-optimizer/analyses").await
}

pub async fn get_analysis(gateway: &Gateway, analysis_id: Uuid) -> Result<CostAnalysis> {
    gateway
        .get_json(&format!("/cost-optimizer/analyses/{analysis_id}"))
        .await
}

/// Apply or dismiss a recommendation. `action` is APPLY or DISMISS.
pub async fn update_recommendation(
    gateway: &Gateway,
    recommendation_id: Uuid,
    action: &str,
) -> Result<serde_json::Value> {
    gateway
        .patch_json(
            &format!("/cost-optimizer/recommendations/{recommendation_id}"),
            &RecommendationAction { action },
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_deserializes_without_recommendations() {
        // List responses omit the recommendation set
        let json = r#"{
            "id": "0b6f7f4e-9f08-4a5e-b3f0-1d2f2c4a9e11",
            "cloud_account_id": "11111111-2222-3333-4444-555555555555",
            "analysis_date": "2025-03-01T12:00:00Z",
            "total_monthly_cost": 12450.5,
            "potential_savings": 3120.25,
            "savings_percentage": 25.06,
            "resource_count": 84,
            "cost_breakdown": {"compute": 8000.0, "storage": 4450.5}
        }"#;
        let analysis: CostAnalysis = serde_json::from_str(json).unwrap();
        assert!(analysis.recommendations.is_empty());
        assert_eq!(analysis.resource_count, 84);
        assert_eq!(analysis.cost_breakdown["compute"], 8000.0);
    }

    #[test]
    fn account_create_keeps_credentials_opaque() {
        let create = CloudAccountCreate {
            name: "prod".into(),
            provider: "AWS".into(),
            credentials: serde_json::json!({"access_key_id": "AKIA...", "secret": "..."}),
            region: Some("eu-west-1".into()),
        };
        let out = serde_json::to_value(&create).unwrap();
        assert_eq!(out["credentials"]["access_key_id"], "AKIA...");
        assert_eq!(out["region"], "eu-west-1");
    }
}
