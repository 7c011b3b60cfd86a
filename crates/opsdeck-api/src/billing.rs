//! Subscription billing endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsdeck_gateway::{Gateway, Result};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub status: String,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCreate {
    /// FREE, PREMIUM, or ENTERPRISE
    pub plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CancelResponse {
    pub message: String,
}

pub async fn subscription(gateway: &Gateway) -> Result<Subscription> {
    gateway.get_json("/billing/subscription").await
}

/// Create or switch the subscription plan.
pub async fn subscribe(gateway: &Gateway, request: &SubscriptionCreate) -> Result<Subscription> {
    gateway.post_json("/billing/subscription", request).await
}

/// Flag the subscription for cancellation at period end.
pub async fn cancel(gateway: &Gateway) -> Result<CancelResponse> {
    gateway
        .post_json("/billing/subscription/cancel", &serde_json::json!({}))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_with_open_period_deserializes() {
        let json = r#"{
            "id": "0b6f7f4e-9f08-4a5e-b3f0-1d2f2c4a9e11",
            "user_id": "11111111-2222-3333-4444-555555555555",
            "plan": "FREE",
            "status": "ACTIVE",
            "current_period_start": null,
            "current_period_end": null,
            "cancel_at_period_end": false
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.plan, "FREE");
        assert!(sub.current_period_end.is_none());
        assert!(!sub.cancel_at_period_end);
    }
}
