//! Stand models for the API service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One allocable vendor slot of a fair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Stand {
    pub id: Uuid,
    pub fair_id: Uuid,
    /// `<Letter><2-digit number>`, e.g. `A01`
    pub code: String,
    pub assigned_date: DateTime<Utc>,
    pub occupied: bool,
}

/// Request for setting the occupied flag of a stand
#[derive(Debug, Clone, Deserialize)]
pub struct StandOccupancyRequest {
    pub occupied: bool,
}
