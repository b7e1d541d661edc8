use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{ActorId, BatchId, DomainError, DomainResult, GeneticId, GridMapId, RoomId};

use verdant_batches::{
    Batch, BatchPatch, BatchStore, BulkDiscardReport, NewBatch, Stage, DISCARD_CHUNK_SIZE,
};
use verdant_grid::{DistributeOutcome, GridAllocator, GridMapStore, GridPosition, RoomStore};
use verdant_ledger::{MovementLedger, NewMovement};

/// A move/split request.
///
/// With `quantity` below the batch's current quantity this is a split; with
/// `quantity` equal or absent it is a full move. Grid placement at the
/// destination is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub batch_id: BatchId,
    pub from_room_id: Option<RoomId>,
    pub to_room_id: RoomId,
    pub notes: Option<String>,
    pub quantity: Option<u32>,
    pub grid_map_id: Option<GridMapId>,
    pub grid_position: Option<String>,
    pub actor: ActorId,
}

/// What a move produced. `remainder` is the source batch left behind by a
/// split; `None` for a full move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveOutcome {
    pub moved: Batch,
    pub remainder: Option<Batch>,
}

impl MoveOutcome {
    pub fn was_split(&self) -> bool {
        self.remainder.is_some()
    }
}

/// Caller-supplied fields for the batch a merge creates. Quantity is taken
/// verbatim, never summed from the sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSpec {
    pub name: String,
    pub quantity: u32,
    pub stage: Stage,
    pub genetic_id: GeneticId,
    pub room_id: Option<RoomId>,
    pub start_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub actor: ActorId,
}

/// Merge result. Not atomic: the merged batch exists even when some source
/// discards failed; `failed` tells the caller what to reconcile.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub merged: Batch,
    pub discarded: Vec<BatchId>,
    pub failed: Vec<(BatchId, DomainError)>,
}

impl MergeOutcome {
    pub fn all_sources_discarded(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransplantRequest {
    pub genetic_id: GeneticId,
    pub quantity: u32,
}

/// Per-genetic transfer summary. `moved` may fall short of `requested`
/// when the source room did not hold enough units; that is reported, not
/// raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneticTransfer {
    pub genetic_id: GeneticId,
    pub requested: u32,
    pub moved: u32,
    /// Ids now present in the destination room for this transfer.
    pub batch_ids: Vec<BatchId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransplantOutcome {
    pub transfers: Vec<GeneticTransfer>,
}

impl TransplantOutcome {
    pub fn total_moved(&self) -> u32 {
        self.transfers.iter().map(|t| t.moved).sum()
    }
}

/// Finished-goods value produced by `finalize`. Persisting it belongs to a
/// separate aggregate; this core only hands it to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedLot {
    pub batch_id: BatchId,
    pub name: String,
    pub genetic_id: GeneticId,
    pub tracking_code: Option<String>,
    pub quantity: u32,
    pub final_weight_grams: f64,
    pub notes: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// Orchestrates move/split/merge/stage-change/transplant/finalize workflows
/// over the batch store, grid allocator and movement ledger.
#[derive(Clone)]
pub struct LifecycleEngine {
    batches: BatchStore,
    allocator: GridAllocator,
    ledger: MovementLedger,
    rooms: RoomStore,
    grid_maps: GridMapStore,
}

impl LifecycleEngine {
    pub fn new(
        batches: BatchStore,
        allocator: GridAllocator,
        ledger: MovementLedger,
        rooms: RoomStore,
        grid_maps: GridMapStore,
    ) -> Self {
        Self {
            batches,
            allocator,
            ledger,
            rooms,
            grid_maps,
        }
    }

    /// Split a batch into individualized units on a grid. Delegates to
    /// [`GridAllocator::distribute`].
    pub fn distribute(
        &self,
        source_id: BatchId,
        grid_map_id: GridMapId,
        start: GridPosition,
        quantity: u32,
    ) -> DomainResult<DistributeOutcome> {
        self.allocator.distribute(source_id, grid_map_id, start, quantity)
    }

    /// Distribute several batches onto one grid with shared occupancy.
    /// Delegates to [`GridAllocator::bulk_distribute`].
    pub fn bulk_distribute(
        &self,
        source_ids: &[BatchId],
        grid_map_id: GridMapId,
        start: GridPosition,
    ) -> DomainResult<Vec<(BatchId, DistributeOutcome)>> {
        self.allocator.bulk_distribute(source_ids, grid_map_id, start)
    }

    /// Move a batch (or part of it) to another room.
    ///
    /// A split decrements the source in place and creates the moved part as
    /// a new batch; only the new batch gets a ledger entry — the unchanged
    /// remainder is not re-logged. A full move mutates the source and logs
    /// one entry for it.
    pub fn move_batch(&self, req: MoveRequest) -> DomainResult<MoveOutcome> {
        let source = self.require_active(req.batch_id)?;

        if self.rooms.get(req.to_room_id)?.is_none() {
            return Err(DomainError::validation(format!(
                "unknown room: {}",
                req.to_room_id
            )));
        }
        if req.grid_position.is_some() && req.grid_map_id.is_none() {
            return Err(DomainError::validation(
                "grid position requires a grid map",
            ));
        }
        if let (Some(grid_map_id), Some(position)) = (req.grid_map_id, req.grid_position.as_deref())
        {
            self.ensure_slot_free(grid_map_id, position, source.id)?;
        }

        match req.quantity {
            Some(0) => Err(DomainError::validation("cannot move zero units")),
            Some(q) if q > source.quantity => Err(DomainError::validation(format!(
                "insufficient quantity: batch {} holds {}, requested {}",
                source.id, source.quantity, q
            ))),
            Some(q) if q < source.quantity => self.split_move(&req, &source, q),
            _ => self.full_move(&req, &source),
        }
    }

    fn split_move(&self, req: &MoveRequest, source: &Batch, quantity: u32) -> DomainResult<MoveOutcome> {
        let remainder = self.batches.update(
            source.id,
            BatchPatch {
                quantity: Some(source.quantity - quantity),
                ..BatchPatch::default()
            },
        )?;

        let moved = self.batches.create(NewBatch {
            name: source.name.clone(),
            quantity,
            stage: source.stage,
            genetic_id: source.genetic_id,
            current_room_id: Some(req.to_room_id),
            grid_map_id: req.grid_map_id,
            grid_position: req.grid_position.clone(),
            parent_batch_id: Some(source.lineage_parent()),
            tracking_code: None,
            start_date: source.start_date,
            notes: req.notes.clone(),
        })?;

        self.ledger.append(NewMovement {
            batch_id: moved.id,
            from_room_id: req.from_room_id,
            to_room_id: Some(req.to_room_id),
            notes: req.notes.clone(),
            created_by: req.actor,
        })?;

        tracing::info!(
            source_id = %source.id,
            moved_id = %moved.id,
            quantity,
            remaining = remainder.quantity,
            "batch split-moved"
        );

        Ok(MoveOutcome {
            moved,
            remainder: Some(remainder),
        })
    }

    fn full_move(&self, req: &MoveRequest, source: &Batch) -> DomainResult<MoveOutcome> {
        let moved = self.batches.update(
            source.id,
            BatchPatch {
                current_room_id: Some(Some(req.to_room_id)),
                grid_map_id: Some(req.grid_map_id),
                grid_position: Some(req.grid_position.clone()),
                notes: req.notes.clone().map(Some),
                ..BatchPatch::default()
            },
        )?;

        self.ledger.append(NewMovement {
            batch_id: source.id,
            from_room_id: req.from_room_id,
            to_room_id: Some(req.to_room_id),
            notes: req.notes.clone(),
            created_by: req.actor,
        })?;

        tracing::info!(batch_id = %source.id, to_room = %req.to_room_id, "batch moved");

        Ok(MoveOutcome {
            moved,
            remainder: None,
        })
    }

    /// Advance a batch's lifecycle stage.
    ///
    /// Always appends a ledger entry with `from == to == current room`; a
    /// same-room record doubles as the stage-change audit trail.
    pub fn update_stage(
        &self,
        batch_id: BatchId,
        new_stage: Stage,
        actor: ActorId,
    ) -> DomainResult<Batch> {
        let batch = self.require_active(batch_id)?;

        if !batch.stage.can_transition_to(new_stage) {
            return Err(DomainError::validation(format!(
                "stage transition not allowed: {} -> {}",
                batch.stage, new_stage
            )));
        }

        let updated = self.batches.update(
            batch_id,
            BatchPatch {
                stage: Some(new_stage),
                ..BatchPatch::default()
            },
        )?;

        self.ledger.append(NewMovement {
            batch_id,
            from_room_id: batch.current_room_id,
            to_room_id: batch.current_room_id,
            notes: Some(format!("stage {} -> {}", batch.stage, new_stage)),
            created_by: actor,
        })?;

        tracing::info!(batch_id = %batch_id, from = %batch.stage, to = %new_stage, "stage updated");
        Ok(updated)
    }

    /// Discard a batch and log its departure.
    ///
    /// The ledger entry records where the batch left from with no
    /// destination (`to == None`); metrics classify such departures by the
    /// discard reason. Idempotent: a second call returns the
    /// already-discarded record and appends nothing.
    pub fn discard(&self, batch_id: BatchId, reason: &str, actor: ActorId) -> DomainResult<Batch> {
        let batch = self.batches.get(batch_id)?.ok_or(DomainError::NotFound)?;
        if batch.is_discarded() {
            return Ok(batch);
        }

        // Capture the room before soft delete nulls it.
        let from_room_id = batch.current_room_id;
        let discarded = self.batches.soft_delete(batch_id, reason)?;

        self.ledger.append(NewMovement {
            batch_id,
            from_room_id,
            to_room_id: None,
            notes: Some(reason.to_string()),
            created_by: actor,
        })?;

        Ok(discarded)
    }

    /// Discard many batches through [`LifecycleEngine::discard`], in chunks
    /// of [`DISCARD_CHUNK_SIZE`]. Chunks commit independently; the report
    /// lists exactly which ids were discarded.
    pub fn bulk_discard(&self, ids: &[BatchId], reason: &str, actor: ActorId) -> BulkDiscardReport {
        let mut report = BulkDiscardReport::default();

        for (chunk_index, chunk) in ids.chunks(DISCARD_CHUNK_SIZE).enumerate() {
            tracing::debug!(chunk_index, size = chunk.len(), "discarding chunk");
            for &id in chunk {
                match self.discard(id, reason, actor) {
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

    /// Consolidate several batches into one new batch.
    ///
    /// The merged batch takes the caller's fields verbatim — quantity is not
    /// summed from the sources, a mismatch is only warned about. Source
    /// discards happen row by row after the create; failures are reported in
    /// the outcome and never rolled back.
    pub fn merge_batches(
        &self,
        source_ids: &[BatchId],
        spec: MergeSpec,
    ) -> DomainResult<MergeOutcome> {
        if source_ids.is_empty() {
            return Err(DomainError::validation("merge requires at least one source"));
        }

        let mut source_total: u32 = 0;
        for &id in source_ids {
            let source = self.require_active(id)?;
            source_total = source_total.saturating_add(source.quantity);
        }

        if source_total != spec.quantity {
            tracing::warn!(
                supplied = spec.quantity,
                source_total,
                "merge quantity differs from sum of sources"
            );
        }

        let actor = spec.actor;
        let merged = self.batches.create(NewBatch {
            name: spec.name,
            quantity: spec.quantity,
            stage: spec.stage,
            genetic_id: spec.genetic_id,
            current_room_id: spec.room_id,
            grid_map_id: None,
            grid_position: None,
            parent_batch_id: None,
            tracking_code: None,
            start_date: spec.start_date,
            notes: spec.notes,
        })?;

        let merged_ref = merged
            .tracking_code
            .clone()
            .unwrap_or_else(|| merged.id.to_string());
        let reason = format!("merged into {merged_ref}");

        let mut discarded = Vec::new();
        let mut failed = Vec::new();
        for &id in source_ids {
            match self.discard(id, &reason, actor) {
                Ok(_) => discarded.push(id),
                Err(err) => {
                    tracing::warn!(batch_id = %id, %err, "merge source discard failed");
                    failed.push((id, err));
                }
            }
        }

        tracing::info!(
            merged_id = %merged.id,
            sources = source_ids.len(),
            failed = failed.len(),
            "batches merged"
        );

        Ok(MergeOutcome {
            merged,
            discarded,
            failed,
        })
    }

    /// Move requested quantities per genetic from one room to another,
    /// consuming eligible batches oldest-first.
    ///
    /// A batch that fits entirely within the remaining request is moved
    /// whole; the batch that only partially covers the remainder is split.
    /// Short supply is not an error: the outcome reports what actually
    /// moved and the caller inspects it.
    pub fn transplant(
        &self,
        from_room_id: RoomId,
        to_room_id: RoomId,
        requests: &[TransplantRequest],
        actor: ActorId,
    ) -> DomainResult<TransplantOutcome> {
        let mut outcome = TransplantOutcome::default();

        for req in requests {
            let mut remaining = req.quantity;
            let mut batch_ids = Vec::new();

            let eligible = self
                .batches
                .active_in_room_by_genetic(from_room_id, req.genetic_id)?;

            for batch in eligible {
                if remaining == 0 {
                    break;
                }
                // An empty batch has nothing to contribute and a zero-unit
                // move is a validation failure.
                if batch.quantity == 0 {
                    continue;
                }
                let take = remaining.min(batch.quantity);
                let moved = self.move_batch(MoveRequest {
                    batch_id: batch.id,
                    from_room_id: Some(from_room_id),
                    to_room_id,
                    notes: None,
                    quantity: Some(take),
                    grid_map_id: None,
                    grid_position: None,
                    actor,
                })?;
                batch_ids.push(moved.moved.id);
                remaining -= take;
            }

            let moved_total = req.quantity - remaining;
            if moved_total < req.quantity {
                tracing::warn!(
                    genetic_id = %req.genetic_id,
                    requested = req.quantity,
                    moved = moved_total,
                    "transplant short on supply"
                );
            }

            outcome.transfers.push(GeneticTransfer {
                genetic_id: req.genetic_id,
                requested: req.quantity,
                moved: moved_total,
                batch_ids,
            });
        }

        Ok(outcome)
    }

    /// Convert an active batch into a finished-goods value and hard-delete
    /// its row — the single exception to soft deletion. Once the finished
    /// lot exists the row has no further audit value in this subsystem.
    pub fn finalize(
        &self,
        batch_id: BatchId,
        final_weight_grams: f64,
        notes: Option<String>,
    ) -> DomainResult<FinishedLot> {
        let batch = self.require_active(batch_id)?;

        if !final_weight_grams.is_finite() || final_weight_grams <= 0.0 {
            return Err(DomainError::validation(
                "final weight must be a positive number of grams",
            ));
        }

        let lot = FinishedLot {
            batch_id: batch.id,
            name: batch.name.clone(),
            genetic_id: batch.genetic_id,
            tracking_code: batch.tracking_code.clone(),
            quantity: batch.quantity,
            final_weight_grams,
            notes,
            finished_at: Utc::now(),
        };

        self.batches.hard_delete(batch_id)?;
        tracing::info!(batch_id = %batch_id, final_weight_grams, "batch finalized");
        Ok(lot)
    }

    /// Delete a room that holds no active batches. Its grid maps go with
    /// it; ledger records referencing the room survive with the reference
    /// nulled.
    pub fn delete_room(&self, room_id: RoomId) -> DomainResult<()> {
        if self.rooms.get(room_id)?.is_none() {
            return Err(DomainError::NotFound);
        }
        if !self.batches.active_in_room(room_id)?.is_empty() {
            return Err(DomainError::conflict(format!(
                "room {room_id} still holds active batches"
            )));
        }

        for grid_map in self.grid_maps.for_room(room_id)? {
            self.grid_maps.delete(grid_map.id)?;
        }
        self.rooms.delete(room_id)?;
        self.ledger.detach_room(room_id)?;

        tracing::info!(room_id = %room_id, "room deleted");
        Ok(())
    }

    fn require_active(&self, batch_id: BatchId) -> DomainResult<Batch> {
        let batch = self.batches.get(batch_id)?.ok_or(DomainError::NotFound)?;
        if batch.is_discarded() {
            return Err(DomainError::conflict(format!(
                "batch {batch_id} is discarded"
            )));
        }
        Ok(batch)
    }

    /// Grid uniqueness at the destination: the target slot must parse, sit
    /// inside the grid, and not be held by another active batch.
    fn ensure_slot_free(
        &self,
        grid_map_id: GridMapId,
        position: &str,
        moving_batch_id: BatchId,
    ) -> DomainResult<()> {
        let grid = self
            .grid_maps
            .get(grid_map_id)?
            .ok_or_else(|| DomainError::validation(format!("unknown grid map: {grid_map_id}")))?;

        let target: GridPosition = position.parse()?;
        if target.row > grid.rows || target.column > grid.columns {
            return Err(DomainError::validation(format!(
                "position {target} is outside the {}x{} grid",
                grid.rows, grid.columns
            )));
        }

        let taken = self
            .batches
            .active_on_grid(grid_map_id)?
            .into_iter()
            .any(|b| b.id != moving_batch_id && b.grid_position.as_deref() == Some(position));
        if taken {
            return Err(DomainError::validation(format!(
                "position {target} is already occupied"
            )));
        }
        Ok(())
    }
}
