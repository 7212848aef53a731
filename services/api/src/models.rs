//! API models for request and response payloads

use serde::Serialize;
use uuid::Uuid;

pub mod fair;
pub mod stand;

/// Response for the current-user endpoint
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub roles: Vec<String>,
    pub highest_role: common::rbac::Role,
    pub permissions: Vec<String>,
}
