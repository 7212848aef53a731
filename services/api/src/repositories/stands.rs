//! Stand persistence: the transactional allocator store and stand queries

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::{
    allocator::{self, StandStore},
    models::stand::Stand,
};

/// [`StandStore`] over one open Postgres transaction
///
/// Codes are ordered with `COLLATE "C"` so the database agrees with the byte
/// order the allocator relies on.
pub struct PgStandStore<'c> {
    conn: &'c mut PgConnection,
}

impl<'c> PgStandStore<'c> {
    /// Wrap a connection, normally `&mut *transaction`
    pub fn new(conn: &'c mut PgConnection) -> Self {
        Self { conn }
    }
}

impl StandStore for PgStandStore<'_> {
    async fn lock_fair(&mut self, fair_id: Uuid) -> Result<bool, sqlx::Error> {
        let row: Option<Uuid> = sqlx::query_scalar("SELECT id FROM fairs WHERE id = $1 FOR UPDATE")
            .bind(fair_id)
            .fetch_optional(&mut *self.conn)
            .await?;

        Ok(row.is_some())
    }

    async fn stands_by_fair(&mut self, fair_id: Uuid) -> Result<Vec<Stand>, sqlx::Error> {
        sqlx::query_as::<_, Stand>(
            r#"
            SELECT id, fair_id, code, assigned_date, occupied
            FROM stands
            WHERE fair_id = $1
            ORDER BY code COLLATE "C" ASC
            "#,
        )
        .bind(fair_id)
        .fetch_all(&mut *self.conn)
        .await
    }

    async fn all_stands(&mut self) -> Result<Vec<Stand>, sqlx::Error> {
        sqlx::query_as::<_, Stand>(
            r#"
            SELECT id, fair_id, code, assigned_date, occupied
            FROM stands
            ORDER BY fair_id ASC, code COLLATE "C" ASC
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await
    }

    async fn insert_stands(
        &mut self,
        fair_id: Uuid,
        codes: &[String],
        assigned_date: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO stands (fair_id, code, assigned_date, occupied)
            SELECT $1, code, $3, FALSE
            FROM UNNEST($2::text[]) AS new_stands(code)
            "#,
        )
        .bind(fair_id)
        .bind(codes)
        .bind(assigned_date)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    async fn delete_stands(&mut self, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM stands WHERE id = ANY($1)")
            .bind(ids)
            .execute(&mut *self.conn)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Stand repository for reads and the occupancy flag
#[derive(Clone)]
pub struct StandRepository {
    pool: PgPool,
}

impl StandRepository {
    /// Create a new stand repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stands of one fair ordered by code
    pub async fn list_by_fair(&self, fair_id: Uuid) -> Result<Vec<Stand>> {
        let mut conn = self.pool.acquire().await?;
        let mut store = PgStandStore::new(&mut conn);
        Ok(allocator::get_stands_by_fair(&mut store, fair_id).await?)
    }

    /// All stands ordered by fair id then code
    pub async fn list_all(&self) -> Result<Vec<Stand>> {
        let mut conn = self.pool.acquire().await?;
        let mut store = PgStandStore::new(&mut conn);
        Ok(allocator::get_all_stands_ordered(&mut store).await?)
    }

    /// Set the occupied flag of a stand
    ///
    /// The owning fair is locked first so the update cannot interleave with a
    /// capacity reconciliation of the same fair.
    pub async fn set_occupied(&self, stand_id: Uuid, occupied: bool) -> Result<Option<Stand>> {
        let mut tx = self.pool.begin().await?;

        let fair_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT f.id
            FROM fairs f
            JOIN stands s ON s.fair_id = f.id
            WHERE s.id = $1
            FOR UPDATE OF f
            "#,
        )
        .bind(stand_id)
        .fetch_optional(&mut *tx)
        .await?;

        if fair_id.is_none() {
            return Ok(None);
        }

        let stand = sqlx::query_as::<_, Stand>(
            r#"
            UPDATE stands
            SET occupied = $2
            WHERE id = $1
            RETURNING id, fair_id, code, assigned_date, occupied
            "#,
        )
        .bind(stand_id)
        .bind(occupied)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        if let Some(stand) = &stand {
            info!(
                "Stand {} of fair {} marked occupied={}",
                stand.code, stand.fair_id, stand.occupied
            );
        }

        Ok(stand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{AllocatorError, adjust_stands_to_capacity, create_initial_stands};
    use common::database::{DatabaseConfig, init_pool, run_migrations};

    #[tokio::test]
    #[ignore = "requires PostgreSQL"]
    async fn test_pg_store_reconciles_inside_transaction() -> Result<()> {
        let pool = init_pool(&DatabaseConfig::from_env()?).await?;
        run_migrations(&pool).await?;

        let mut tx = pool.begin().await?;
        let fair_id: Uuid = sqlx::query_scalar(
            "INSERT INTO fairs (name, stand_capacity) VALUES ('Feria de prueba', 12) RETURNING id",
        )
        .fetch_one(&mut *tx)
        .await?;

        let mut store = PgStandStore::new(&mut tx);
        let created = create_initial_stands(&mut store, fair_id, 12).await?;
        assert_eq!(created.created.len(), 12);

        // B02 is the twelfth stand by code order
        let codes: Vec<String> = allocator::get_stands_by_fair(&mut store, fair_id)
            .await?
            .into_iter()
            .map(|stand| stand.code)
            .collect();
        assert_eq!(codes.first().map(String::as_str), Some("A01"));
        assert_eq!(codes.last().map(String::as_str), Some("B02"));

        sqlx::query("UPDATE stands SET occupied = TRUE WHERE fair_id = $1 AND code = 'B02'")
            .bind(fair_id)
            .execute(&mut *tx)
            .await?;

        let mut store = PgStandStore::new(&mut tx);
        match adjust_stands_to_capacity(&mut store, fair_id, 10).await {
            Err(AllocatorError::Conflict { codes }) => assert_eq!(codes, vec!["B02"]),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(allocator::get_stands_by_fair(&mut store, fair_id).await?.len(), 12);

        let grown = adjust_stands_to_capacity(&mut store, fair_id, 14).await?;
        assert_eq!(grown.created, vec!["B03", "B04"]);

        tx.rollback().await?;
        Ok(())
    }
}
