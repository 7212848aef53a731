//! Stand allocation for fairs
//!
//! Keeps the stand inventory of a fair equal to its target capacity. Stand codes
//! are derived from their position (`A01`..`A10`, `B01`..), so after every
//! reconciliation the codes of a fair are exactly positions `0..capacity`.
//! Growth appends at the tail; shrinking only ever removes the tail and is
//! refused outright if any removed stand is occupied.
//!
//! All storage goes through a [`StandStore`], an explicit unit of work supplied
//! by the caller. The Postgres implementation wraps a single transaction, so a
//! failed call leaves nothing behind once the caller drops the transaction.

use chrono::Utc;
use std::future::Future;
use std::ops::Range;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::stand::Stand;

/// Errors raised by the allocator
#[derive(Error, Debug)]
pub enum AllocatorError {
    /// The fair does not exist
    #[error("Fair {0} not found")]
    NotFound(Uuid),

    /// Shrinking would delete occupied stands
    #[error("Cannot reduce capacity: stands {} are occupied", .codes.join(", "))]
    Conflict { codes: Vec<String> },

    /// Storage failure
    #[error("Stand storage error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Unit of work the allocator reads and writes stands through
pub trait StandStore {
    /// Lock the fair row for the rest of the unit of work; `false` if it does not exist
    fn lock_fair(
        &mut self,
        fair_id: Uuid,
    ) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;

    /// Stands of one fair, ordered by code ascending
    fn stands_by_fair(
        &mut self,
        fair_id: Uuid,
    ) -> impl Future<Output = Result<Vec<Stand>, sqlx::Error>> + Send;

    /// Every stand, ordered by fair id then code
    fn all_stands(&mut self) -> impl Future<Output = Result<Vec<Stand>, sqlx::Error>> + Send;

    /// Insert unoccupied stands with the given codes as one batch
    fn insert_stands(
        &mut self,
        fair_id: Uuid,
        codes: &[String],
        assigned_date: chrono::DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;

    /// Delete stands by id as one batch, returning the number removed
    fn delete_stands(
        &mut self,
        ids: &[Uuid],
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

/// Stand code for a zero-based position
///
/// `0 -> A01`, `9 -> A10`, `10 -> B01`, `23 -> C04`. Positions whose letter
/// would not be a valid `char` use U+FFFD instead.
pub fn code_for_position(position: u32) -> String {
    let letter = char::from_u32(u32::from(b'A') + position / 10)
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    format!("{}{:02}", letter, position % 10 + 1)
}

fn codes_for_positions(positions: Range<u32>) -> Vec<String> {
    positions.map(code_for_position).collect()
}

/// Change needed to bring a stand inventory to a target capacity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adjustment {
    Unchanged,
    /// Create stands for these positions
    Grow(Range<u32>),
    /// Delete these stands (the tail of the inventory)
    Shrink(Vec<Stand>),
}

/// Compute the adjustment for `stands` (ordered by code) without touching storage
pub fn plan_adjustment(stands: &[Stand], new_capacity: u32) -> Result<Adjustment, AllocatorError> {
    let current = stands.len() as u32;

    if new_capacity > current {
        return Ok(Adjustment::Grow(current..new_capacity));
    }

    if new_capacity == current {
        return Ok(Adjustment::Unchanged);
    }

    let candidates = &stands[new_capacity as usize..];
    let occupied: Vec<String> = candidates
        .iter()
        .filter(|stand| stand.occupied)
        .map(|stand| stand.code.clone())
        .collect();

    if !occupied.is_empty() {
        return Err(AllocatorError::Conflict { codes: occupied });
    }

    Ok(Adjustment::Shrink(candidates.to_vec()))
}

/// Stand codes created and removed by one allocator call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub created: Vec<String>,
    pub removed: Vec<String>,
}

/// Create the initial `capacity` stands of a freshly created fair
pub async fn create_initial_stands<S: StandStore>(
    store: &mut S,
    fair_id: Uuid,
    capacity: u32,
) -> Result<Reconciliation, AllocatorError> {
    if !store.lock_fair(fair_id).await? {
        return Err(AllocatorError::NotFound(fair_id));
    }

    let codes = codes_for_positions(0..capacity);
    if !codes.is_empty() {
        store.insert_stands(fair_id, &codes, Utc::now()).await?;
    }

    info!("Created {} stands for fair {}", codes.len(), fair_id);

    Ok(Reconciliation {
        created: codes,
        removed: Vec::new(),
    })
}

/// Bring the stand inventory of a fair to `new_capacity`
///
/// Fails with [`AllocatorError::Conflict`] listing every occupied stand that a
/// reduction would remove; in that case nothing is written.
pub async fn adjust_stands_to_capacity<S: StandStore>(
    store: &mut S,
    fair_id: Uuid,
    new_capacity: u32,
) -> Result<Reconciliation, AllocatorError> {
    if !store.lock_fair(fair_id).await? {
        return Err(AllocatorError::NotFound(fair_id));
    }

    let stands = store.stands_by_fair(fair_id).await?;

    let plan = plan_adjustment(&stands, new_capacity).inspect_err(|e| {
        if let AllocatorError::Conflict { .. } = e {
            warn!("Refusing capacity change for fair {}: {}", fair_id, e);
        }
    })?;

    match plan {
        Adjustment::Unchanged => Ok(Reconciliation::default()),
        Adjustment::Grow(positions) => {
            let codes = codes_for_positions(positions);
            store.insert_stands(fair_id, &codes, Utc::now()).await?;
            info!(
                "Fair {} grew from {} to {} stands",
                fair_id,
                stands.len(),
                new_capacity
            );
            Ok(Reconciliation {
                created: codes,
                removed: Vec::new(),
            })
        }
        Adjustment::Shrink(removed) => {
            let ids: Vec<Uuid> = removed.iter().map(|stand| stand.id).collect();
            store.delete_stands(&ids).await?;
            info!(
                "Fair {} shrank from {} to {} stands",
                fair_id,
                stands.len(),
                new_capacity
            );
            Ok(Reconciliation {
                created: Vec::new(),
                removed: removed.into_iter().map(|stand| stand.code).collect(),
            })
        }
    }
}

/// Stands of one fair ordered by code
pub async fn get_stands_by_fair<S: StandStore>(
    store: &mut S,
    fair_id: Uuid,
) -> Result<Vec<Stand>, AllocatorError> {
    Ok(store.stands_by_fair(fair_id).await?)
}

/// Stands of every fair ordered by fair id then code
pub async fn get_all_stands_ordered<S: StandStore>(
    store: &mut S,
) -> Result<Vec<Stand>, AllocatorError> {
    Ok(store.all_stands().await?)
}
