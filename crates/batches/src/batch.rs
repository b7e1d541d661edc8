use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{BatchId, GeneticId, GridMapId, RoomId};
use verdant_store::Record;

use crate::stage::Stage;

/// Canonical batch record.
///
/// `parent_batch_id` is lineage grouping only, never ownership: children
/// reference parents by id, parents know nothing about children, and the
/// references form a forest. Once `discarded_at` is set the record is
/// read-only for active workflows but remains fully readable for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub name: String,
    pub quantity: u32,
    pub stage: Stage,
    pub genetic_id: GeneticId,
    pub current_room_id: Option<RoomId>,
    pub grid_map_id: Option<GridMapId>,
    /// Slot address within the grid map, e.g. `"C4"`.
    pub grid_position: Option<String>,
    pub parent_batch_id: Option<BatchId>,
    /// Genetic-scoped sequential code, unique per genetic, e.g. `"OGK-003"`.
    pub tracking_code: Option<String>,
    pub start_date: DateTime<Utc>,
    pub discarded_at: Option<DateTime<Utc>>,
    pub discard_reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_discarded(&self) -> bool {
        self.discarded_at.is_some()
    }

    /// A quantity-1 batch carrying a tracking code occupies exactly one
    /// grid slot and is relocated rather than re-split.
    pub fn is_individualized(&self) -> bool {
        self.quantity == 1 && self.tracking_code.is_some()
    }

    /// Lineage root propagated to children on split: the batch's own parent
    /// when it has one, otherwise the batch itself.
    pub fn lineage_parent(&self) -> BatchId {
        self.parent_batch_id.unwrap_or(self.id)
    }
}

impl Record for Batch {
    type Id = BatchId;

    fn id(&self) -> BatchId {
        self.id
    }
}

/// Fields supplied when creating a batch; id and `created_at` are assigned
/// by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBatch {
    pub name: String,
    pub quantity: u32,
    pub stage: Stage,
    pub genetic_id: GeneticId,
    pub current_room_id: Option<RoomId>,
    pub grid_map_id: Option<GridMapId>,
    pub grid_position: Option<String>,
    pub parent_batch_id: Option<BatchId>,
    pub tracking_code: Option<String>,
    pub start_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Partial update for an active batch.
///
/// Carries only mutable fields; discard markers and lineage are absent on
/// purpose, so a patch can never resurrect a discarded record or rewrite a
/// batch's ancestry. `None` leaves a field untouched; the nested option
/// distinguishes "set to null" from "leave alone".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPatch {
    pub name: Option<String>,
    pub quantity: Option<u32>,
    pub stage: Option<Stage>,
    pub current_room_id: Option<Option<RoomId>>,
    pub grid_map_id: Option<Option<GridMapId>>,
    pub grid_position: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub tracking_code: Option<String>,
}

impl BatchPatch {
    pub(crate) fn apply_to(self, batch: &mut Batch) {
        if let Some(name) = self.name {
            batch.name = name;
        }
        if let Some(quantity) = self.quantity {
            batch.quantity = quantity;
        }
        if let Some(stage) = self.stage {
            batch.stage = stage;
        }
        if let Some(room) = self.current_room_id {
            batch.current_room_id = room;
        }
        if let Some(grid_map) = self.grid_map_id {
            batch.grid_map_id = grid_map;
        }
        if let Some(position) = self.grid_position {
            batch.grid_position = position;
        }
        if let Some(notes) = self.notes {
            batch.notes = notes;
        }
        if let Some(code) = self.tracking_code {
            batch.tracking_code = Some(code);
        }
    }
}
