use std::sync::Arc;

use chrono::Utc;

use verdant_core::{BatchId, DomainError, DomainResult, GeneticId, GridMapId, RoomId};
use verdant_store::Collection;

use crate::batch::{Batch, BatchPatch, NewBatch};
use crate::genetic::Genetic;

/// Bulk discards are processed in fixed-size chunks to respect request-size
/// limits of the backing store.
pub const DISCARD_CHUNK_SIZE: usize = 50;

/// Outcome of a chunked bulk discard.
///
/// Chunks are independent: a failing id does not roll back ids already
/// discarded. Callers seeing `all_succeeded() == false` must reconcile by
/// id — some batches are discarded, some are not.
#[derive(Debug, Clone, Default)]
pub struct BulkDiscardReport {
    pub discarded: Vec<BatchId>,
    pub failed: Vec<(BatchId, DomainError)>,
}

impl BulkDiscardReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Canonical store for batch records.
///
/// Writes are per-row atomic only; there is no transaction spanning rows.
#[derive(Clone)]
pub struct BatchStore {
    batches: Arc<dyn Collection<Batch>>,
    genetics: Arc<dyn Collection<Genetic>>,
}

impl BatchStore {
    pub fn new(
        batches: Arc<dyn Collection<Batch>>,
        genetics: Arc<dyn Collection<Genetic>>,
    ) -> Self {
        Self { batches, genetics }
    }

    /// Assigns id and `created_at`, persists, returns the stored record.
    pub fn create(&self, new: NewBatch) -> DomainResult<Batch> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("batch name cannot be empty"));
        }
        if self.genetics.get(new.genetic_id)?.is_none() {
            return Err(DomainError::validation(format!(
                "unknown genetic: {}",
                new.genetic_id
            )));
        }
        if let Some(parent_id) = new.parent_batch_id {
            if self.batches.get(parent_id)?.is_none() {
                return Err(DomainError::validation(format!(
                    "unknown parent batch: {parent_id}"
                )));
            }
        }

        let batch = Batch {
            id: BatchId::new(),
            name: new.name,
            quantity: new.quantity,
            stage: new.stage,
            genetic_id: new.genetic_id,
            current_room_id: new.current_room_id,
            grid_map_id: new.grid_map_id,
            grid_position: new.grid_position,
            parent_batch_id: new.parent_batch_id,
            tracking_code: new.tracking_code,
            start_date: new.start_date,
            discarded_at: None,
            discard_reason: None,
            notes: new.notes,
            created_at: Utc::now(),
        };

        let stored = self.batches.insert(batch)?;
        tracing::info!(batch_id = %stored.id, stage = %stored.stage, "batch created");
        Ok(stored)
    }

    /// Point read, including discarded records (audit reads).
    pub fn get(&self, id: BatchId) -> DomainResult<Option<Batch>> {
        Ok(self.batches.get(id)?)
    }

    /// Apply a partial update to an active batch.
    ///
    /// Fails with a conflict when the batch is already discarded; the patch
    /// type cannot resurrect a discarded record.
    pub fn update(&self, id: BatchId, patch: BatchPatch) -> DomainResult<Batch> {
        let mut batch = self.batches.get(id)?.ok_or(DomainError::NotFound)?;
        if batch.is_discarded() {
            return Err(DomainError::conflict(format!("batch {id} is discarded")));
        }
        patch.apply_to(&mut batch);
        Ok(self.batches.replace(batch)?)
    }

    /// Mark a batch discarded and clear its placement.
    ///
    /// Quantity is left untouched for audit. Idempotent: a second call on
    /// the same id is a no-op returning the already-discarded record.
    pub fn soft_delete(&self, id: BatchId, reason: &str) -> DomainResult<Batch> {
        let mut batch = self.batches.get(id)?.ok_or(DomainError::NotFound)?;
        if batch.is_discarded() {
            return Ok(batch);
        }

        batch.discarded_at = Some(Utc::now());
        batch.discard_reason = Some(reason.to_string());
        batch.current_room_id = None;
        batch.grid_map_id = None;
        batch.grid_position = None;

        let stored = self.batches.replace(batch)?;
        tracing::info!(batch_id = %id, reason, "batch discarded");
        Ok(stored)
    }

    /// Discard many batches in chunks of [`DISCARD_CHUNK_SIZE`].
    ///
    /// Chunks commit independently; a failure in one chunk never rolls back
    /// earlier chunks. The report lists exactly which ids were discarded.
    pub fn bulk_soft_delete(&self, ids: &[BatchId], reason: &str) -> BulkDiscardReport {
        let mut report = BulkDiscardReport::default();

        for (chunk_index, chunk) in ids.chunks(DISCARD_CHUNK_SIZE).enumerate() {
            tracing::debug!(chunk_index, size = chunk.len(), "discarding chunk");
            for &id in chunk {
                match self.soft_delete(id, reason) {
                    Ok(_) => report.discarded.push(id),
                    Err(err) => {
                        tracing::warn!(batch_id = %id, %err, "bulk discard failed for id");
                        report.failed.push((id, err));
                    }
                }
            }
        }

        report
    }

    /// Non-discarded batches currently located in a room.
    pub fn active_in_room(&self, room_id: RoomId) -> DomainResult<Vec<Batch>> {
        Ok(self
            .batches
            .select(&|b| !b.is_discarded() && b.current_room_id == Some(room_id))?)
    }

    /// Non-discarded batches of one genetic in a room, oldest first.
    pub fn active_in_room_by_genetic(
        &self,
        room_id: RoomId,
        genetic_id: GeneticId,
    ) -> DomainResult<Vec<Batch>> {
        let mut batches = self.batches.select(&|b| {
            !b.is_discarded()
                && b.current_room_id == Some(room_id)
                && b.genetic_id == genetic_id
        })?;
        batches.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(batches)
    }

    /// Non-discarded batches placed on a grid map.
    pub fn active_on_grid(&self, grid_map_id: GridMapId) -> DomainResult<Vec<Batch>> {
        Ok(self
            .batches
            .select(&|b| !b.is_discarded() && b.grid_map_id == Some(grid_map_id))?)
    }

    /// Remove the row entirely. The single caller is batch finalization,
    /// which converts the batch into a finished-goods record first.
    pub fn hard_delete(&self, id: BatchId) -> DomainResult<()> {
        self.batches.delete(id)?;
        tracing::info!(batch_id = %id, "batch hard-deleted");
        Ok(())
    }
}
