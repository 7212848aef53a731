//! Fair repository for database operations
//!
//! Creating a fair and changing its capacity run the stand allocator inside the
//! same transaction as the fair row write.

use anyhow::Result;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::stands::PgStandStore;
use crate::{
    allocator::{self, AllocatorError, Reconciliation},
    models::fair::{CreateFairRequest, Fair, UpdateFairRequest},
};

const FAIR_COLUMNS: &str =
    "id, name, description, location, stand_capacity, is_active, created_at, updated_at";

/// Fair repository for database operations
#[derive(Clone)]
pub struct FairRepository {
    pool: PgPool,
}

impl FairRepository {
    /// Create a new fair repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a fair and its initial stands
    pub async fn create(
        &self,
        payload: &CreateFairRequest,
    ) -> Result<(Fair, Reconciliation), AllocatorError> {
        info!("Creating fair: {}", payload.name);

        let mut tx = self.pool.begin().await?;

        let fair = sqlx::query_as::<_, Fair>(&format!(
            r#"
            INSERT INTO fairs (name, description, location, stand_capacity)
            VALUES ($1, $2, $3, $4)
            RETURNING {FAIR_COLUMNS}
            "#
        ))
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.location)
        .bind(payload.stand_capacity as i32)
        .fetch_one(&mut *tx)
        .await?;

        let mut store = PgStandStore::new(&mut tx);
        let stands =
            allocator::create_initial_stands(&mut store, fair.id, payload.stand_capacity).await?;

        tx.commit().await?;

        Ok((fair, stands))
    }

    /// Update a fair; a capacity change reconciles its stands in the same transaction
    ///
    /// Returns `NotFound` for a missing fair and `Conflict` when the new capacity
    /// would remove occupied stands. Either way nothing is committed.
    pub async fn update(
        &self,
        id: Uuid,
        payload: &UpdateFairRequest,
    ) -> Result<(Fair, Reconciliation), AllocatorError> {
        let mut tx = self.pool.begin().await?;

        let stands = match payload.stand_capacity {
            Some(capacity) => {
                let mut store = PgStandStore::new(&mut tx);
                allocator::adjust_stands_to_capacity(&mut store, id, capacity).await?
            }
            None => Reconciliation::default(),
        };

        let fair = sqlx::query_as::<_, Fair>(&format!(
            r#"
            UPDATE fairs
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                location = COALESCE($4, location),
                stand_capacity = COALESCE($5, stand_capacity),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {FAIR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&payload.name)
        .bind(&payload.description)
        .bind(&payload.location)
        .bind(payload.stand_capacity.map(|c| c as i32))
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AllocatorError::NotFound(id))?;

        tx.commit().await?;

        info!("Updated fair {}", id);
        Ok((fair, stands))
    }

    /// Activate or deactivate a fair
    pub async fn set_active(&self, id: Uuid, is_active: bool) -> Result<Option<Fair>> {
        let fair = sqlx::query_as::<_, Fair>(&format!(
            r#"
            UPDATE fairs
            SET is_active = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {FAIR_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?;

        Ok(fair)
    }

    /// Get all fairs, newest first
    pub async fn get_all(&self) -> Result<Vec<Fair>> {
        let fairs = sqlx::query_as::<_, Fair>(&format!(
            "SELECT {FAIR_COLUMNS} FROM fairs ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(fairs)
    }

    /// Find a fair by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Fair>> {
        let fair = sqlx::query_as::<_, Fair>(&format!(
            "SELECT {FAIR_COLUMNS} FROM fairs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(fair)
    }

    /// Delete a fair together with its stands
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM fairs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!("Deleted fair {}", id);
        }

        Ok(result.rows_affected() > 0)
    }
}
