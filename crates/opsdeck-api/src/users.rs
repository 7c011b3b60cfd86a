//! User administration endpoints
//!
//! `/users/me` is owned by the gateway (it caches the profile alongside the
//! session); this module covers the ADMIN-only listing and role updates.

use serde::Serialize;
use uuid::Uuid;

use opsdeck_auth::UserProfile;
use opsdeck_gateway::{Gateway, Result};

#[derive(Debug, Clone, Serialize)]
struct RoleUpdate<'a> {
    role: &'a str,
}

pub async fn list(gateway: &Gateway) -> Result<Vec<UserProfile>> {
    gateway.get_json("/users").await
}

/// Change a user's role. ADMIN only; MAINTAINER, VIEWER, and ADMIN are the
/// roles the server accepts.
pub async fn update_role(gateway: &Gateway, user_id: Uuid, role: &str) -> Result<UserProfile> {
    gateway
        .patch_json(&format!("/users/{user_id}"), &RoleUpdate { role })
        .await
}
