//! Fair models for the API service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fair entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Fair {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    /// Target number of stands; kept equal to the stand count by the allocator
    pub stand_capacity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request for fair creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFairRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub stand_capacity: u32,
}

/// Request for fair update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFairRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub stand_capacity: Option<u32>,
}

/// Request for toggling a fair on or off
#[derive(Debug, Clone, Deserialize)]
pub struct FairStatusRequest {
    pub is_active: bool,
}

/// Fair together with the stand codes touched by the request
#[derive(Debug, Serialize)]
pub struct FairResponse {
    #[serde(flatten)]
    pub fair: Fair,
    pub stands_created: Vec<String>,
    pub stands_removed: Vec<String>,
}

