//! Collision-free slot allocation and split-to-grid distribution.

use std::collections::HashSet;

use verdant_core::{BatchId, DomainError, DomainResult, GridMapId};

use verdant_batches::{Batch, BatchPatch, BatchStore, NewBatch, TrackingCodeGenerator};

use crate::grid_map::{GridMap, GridMapStore};
use crate::position::{GridCursor, GridPosition};

/// Discard reason stamped on a source batch whose units were distributed to
/// grid slots. Metrics treat this reason as an internal outcome, not a
/// grower-caused failure.
pub const DISTRIBUTED_DISCARD_REASON: &str = "distributed";

/// Result of one distribution. Partial success is an outcome, not an error:
/// items already placed stay placed and the shortfall is reported.
#[derive(Debug, Clone, Default)]
pub struct DistributeOutcome {
    /// Batches now occupying grid slots: fresh singletons, or the source
    /// itself when it was relocated in place.
    pub placed: Vec<Batch>,
    /// Units that did not fit on the grid.
    pub unplaced: u32,
    /// The source was already individualized and was moved rather than split.
    pub relocated: bool,
}

impl DistributeOutcome {
    pub fn fully_placed(&self) -> bool {
        self.unplaced == 0
    }
}

/// Computes collision-free slot positions within a grid map and performs
/// split-to-grid distribution.
///
/// Occupancy is read once per call and extended in memory as slots are
/// taken. Concurrent distributions against the same grid can therefore
/// double-book a slot; within a single (bulk) call the shared occupancy set
/// makes double-booking impossible.
#[derive(Clone)]
pub struct GridAllocator {
    batches: BatchStore,
    tracking: TrackingCodeGenerator,
    grid_maps: GridMapStore,
}

impl GridAllocator {
    pub fn new(
        batches: BatchStore,
        tracking: TrackingCodeGenerator,
        grid_maps: GridMapStore,
    ) -> Self {
        Self {
            batches,
            tracking,
            grid_maps,
        }
    }

    /// Distribute `quantity` units of one source batch onto a grid.
    ///
    /// An already-individualized source (quantity 1 with a tracking code) is
    /// relocated in place. Anything else is split into coded singleton
    /// batches, one per free slot, and the source is discarded with reason
    /// [`DISTRIBUTED_DISCARD_REASON`] once at least one unit was placed.
    pub fn distribute(
        &self,
        source_id: BatchId,
        grid_map_id: GridMapId,
        start: GridPosition,
        quantity: u32,
    ) -> DomainResult<DistributeOutcome> {
        let grid = self.require_grid(grid_map_id)?;
        let source = self.require_active_source(source_id)?;

        if quantity == 0 {
            return Err(DomainError::validation("cannot distribute zero units"));
        }
        if quantity > source.quantity {
            return Err(DomainError::validation(format!(
                "insufficient quantity: batch {} holds {}, requested {}",
                source.id, source.quantity, quantity
            )));
        }

        let mut occupied = self.seed_occupancy(&grid, &[source_id])?;
        let mut cursor = GridCursor::at(start);
        self.distribute_into(&source, &grid, &mut occupied, &mut cursor, quantity)
    }

    /// Distribute several source batches onto one grid within a single call.
    ///
    /// One occupancy set is pre-seeded from the grid's active placements and
    /// shared across all sources, so a slot allocated to one source is never
    /// reused for another. Sources are processed in the given order; a
    /// failure on a later source leaves earlier distributions committed.
    pub fn bulk_distribute(
        &self,
        source_ids: &[BatchId],
        grid_map_id: GridMapId,
        start: GridPosition,
    ) -> DomainResult<Vec<(BatchId, DistributeOutcome)>> {
        let grid = self.require_grid(grid_map_id)?;
        let mut occupied = self.seed_occupancy(&grid, source_ids)?;
        let mut cursor = GridCursor::at(start);

        let mut outcomes = Vec::with_capacity(source_ids.len());
        for &source_id in source_ids {
            let source = self.require_active_source(source_id)?;
            let outcome = self.distribute_into(
                &source,
                &grid,
                &mut occupied,
                &mut cursor,
                source.quantity,
            )?;
            outcomes.push((source_id, outcome));
        }
        Ok(outcomes)
    }

    fn require_grid(&self, grid_map_id: GridMapId) -> DomainResult<GridMap> {
        self.grid_maps
            .get(grid_map_id)?
            .ok_or_else(|| DomainError::validation(format!("unknown grid map: {grid_map_id}")))
    }

    fn require_active_source(&self, source_id: BatchId) -> DomainResult<Batch> {
        let source = self.batches.get(source_id)?.ok_or(DomainError::NotFound)?;
        if source.is_discarded() {
            return Err(DomainError::conflict(format!(
                "batch {source_id} is discarded"
            )));
        }
        Ok(source)
    }

    /// Slots currently held by active batches on the grid, minus the sources
    /// being (re)placed in this call.
    fn seed_occupancy(
        &self,
        grid: &GridMap,
        excluded: &[BatchId],
    ) -> DomainResult<HashSet<GridPosition>> {
        let active = self.batches.active_on_grid(grid.id)?;
        Ok(active
            .iter()
            .filter(|b| !excluded.contains(&b.id))
            .filter_map(|b| b.grid_position.as_deref())
            .filter_map(|p| p.parse().ok())
            .collect())
    }

    fn distribute_into(
        &self,
        source: &Batch,
        grid: &GridMap,
        occupied: &mut HashSet<GridPosition>,
        cursor: &mut GridCursor,
        quantity: u32,
    ) -> DomainResult<DistributeOutcome> {
        if source.is_individualized() {
            return self.relocate(source, grid, occupied, cursor);
        }

        let mut placed = Vec::new();
        for _ in 0..quantity {
            let Some(slot) = cursor.next_free(occupied, grid.rows, grid.columns) else {
                break;
            };
            let code = self.tracking.next_code(source.genetic_id)?;
            let singleton = self.batches.create(NewBatch {
                name: code.clone(),
                quantity: 1,
                stage: source.stage,
                genetic_id: source.genetic_id,
                current_room_id: Some(grid.room_id),
                grid_map_id: Some(grid.id),
                grid_position: Some(slot.to_string()),
                parent_batch_id: Some(source.lineage_parent()),
                tracking_code: Some(code),
                start_date: source.start_date,
                notes: None,
            })?;
            occupied.insert(slot);
            placed.push(singleton);
        }

        let unplaced = quantity - placed.len() as u32;

        if placed.is_empty() {
            // Nothing left the source, so the source survives untouched.
            tracing::warn!(
                batch_id = %source.id,
                grid_map_id = %grid.id,
                unplaced,
                "grid full, nothing distributed"
            );
            return Ok(DistributeOutcome {
                placed,
                unplaced,
                relocated: false,
            });
        }

        self.batches.update(
            source.id,
            BatchPatch {
                quantity: Some(0),
                ..BatchPatch::default()
            },
        )?;
        self.batches
            .soft_delete(source.id, DISTRIBUTED_DISCARD_REASON)?;

        if unplaced > 0 {
            tracing::warn!(
                batch_id = %source.id,
                grid_map_id = %grid.id,
                placed = placed.len(),
                unplaced,
                "grid distribution fell short"
            );
        }

        Ok(DistributeOutcome {
            placed,
            unplaced,
            relocated: false,
        })
    }

    /// Move an already-individualized unit onto the grid without creating a
    /// new record.
    fn relocate(
        &self,
        source: &Batch,
        grid: &GridMap,
        occupied: &mut HashSet<GridPosition>,
        cursor: &mut GridCursor,
    ) -> DomainResult<DistributeOutcome> {
        let Some(slot) = cursor.next_free(occupied, grid.rows, grid.columns) else {
            return Ok(DistributeOutcome {
                placed: Vec::new(),
                unplaced: 1,
                relocated: false,
            });
        };

        // Placement fields only; the unit keeps its room assignment.
        let updated = self.batches.update(
            source.id,
            BatchPatch {
                grid_map_id: Some(Some(grid.id)),
                grid_position: Some(Some(slot.to_string())),
                ..BatchPatch::default()
            },
        )?;
        occupied.insert(slot);

        Ok(DistributeOutcome {
            placed: vec![updated],
            unplaced: 0,
            relocated: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use proptest::prelude::*;

    use verdant_batches::{Genetic, GeneticStore, NewGenetic, Stage};
    use verdant_core::{GeneticId, RoomId};
    use verdant_store::{Collection, InMemoryCollection};

    use crate::room::Room;

    use super::*;

    struct Fixture {
        allocator: GridAllocator,
        batches: BatchStore,
        genetic_id: GeneticId,
        room_id: RoomId,
        grid_maps: GridMapStore,
    }

    fn fixture() -> Fixture {
        let batch_rows: Arc<InMemoryCollection<Batch>> = Arc::new(InMemoryCollection::new());
        let genetic_rows: Arc<InMemoryCollection<Genetic>> = Arc::new(InMemoryCollection::new());
        let room_rows: Arc<InMemoryCollection<Room>> = Arc::new(InMemoryCollection::new());
        let grid_rows: Arc<InMemoryCollection<GridMap>> = Arc::new(InMemoryCollection::new());

        let genetic = GeneticStore::new(genetic_rows.clone())
            .create(NewGenetic {
                name: "OG Kush".to_string(),
                nomenclature: Some("OGK".to_string()),
            })
            .unwrap();

        let room = Room {
            id: RoomId::new(),
            name: "veg 1".to_string(),
            stage_tag: Stage::Vegetation,
            rows: None,
            columns: None,
            operational_days: None,
            start_date: Utc::now(),
            order_index: 0,
        };
        room_rows.insert(room.clone()).unwrap();

        let batches = BatchStore::new(batch_rows.clone(), genetic_rows.clone());
        let tracking = TrackingCodeGenerator::new(batch_rows, genetic_rows);
        let grid_maps = GridMapStore::new(grid_rows, room_rows);

        Fixture {
            allocator: GridAllocator::new(batches.clone(), tracking, grid_maps.clone()),
            batches,
            genetic_id: genetic.id,
            room_id: room.id,
            grid_maps,
        }
    }

    fn make_grid(f: &Fixture, rows: u32, columns: u32) -> GridMap {
        f.grid_maps
            .create(crate::grid_map::NewGridMap {
                room_id: f.room_id,
                name: "table".to_string(),
                rows,
                columns,
            })
            .unwrap()
    }

    fn make_batch(f: &Fixture, quantity: u32, tracking_code: Option<&str>) -> Batch {
        f.batches
            .create(NewBatch {
                name: "source".to_string(),
                quantity,
                stage: Stage::Vegetation,
                genetic_id: f.genetic_id,
                current_room_id: Some(f.room_id),
                grid_map_id: None,
                grid_position: None,
                parent_batch_id: None,
                tracking_code: tracking_code.map(str::to_string),
                start_date: Utc::now(),
                notes: None,
            })
            .unwrap()
    }

    fn a1() -> GridPosition {
        GridPosition::new(1, 1)
    }

    #[test]
    fn overflowing_a_2x2_grid_places_four_and_reports_one() {
        let f = fixture();
        let grid = make_grid(&f, 2, 2);
        let source = make_batch(&f, 5, None);

        let outcome = f.allocator.distribute(source.id, grid.id, a1(), 5).unwrap();

        let positions: Vec<_> = outcome
            .placed
            .iter()
            .map(|b| b.grid_position.clone().unwrap())
            .collect();
        assert_eq!(positions, vec!["A1", "A2", "B1", "B2"]);
        assert_eq!(outcome.unplaced, 1);
        assert!(!outcome.relocated);

        let discarded = f.batches.get(source.id).unwrap().unwrap();
        assert!(discarded.is_discarded());
        assert_eq!(
            discarded.discard_reason.as_deref(),
            Some(DISTRIBUTED_DISCARD_REASON)
        );
        assert_eq!(discarded.quantity, 0);
    }

    #[test]
    fn singletons_get_sequential_codes_and_lineage() {
        let f = fixture();
        let grid = make_grid(&f, 3, 3);
        let source = make_batch(&f, 3, None);

        let outcome = f.allocator.distribute(source.id, grid.id, a1(), 3).unwrap();

        let codes: Vec<_> = outcome
            .placed
            .iter()
            .map(|b| b.tracking_code.clone().unwrap())
            .collect();
        assert_eq!(codes, vec!["OGK-001", "OGK-002", "OGK-003"]);
        for unit in &outcome.placed {
            assert_eq!(unit.quantity, 1);
            assert_eq!(unit.parent_batch_id, Some(source.id));
            assert_eq!(unit.current_room_id, Some(f.room_id));
        }
    }

    #[test]
    fn grandchildren_keep_the_original_lineage_root() {
        let f = fixture();
        let grid = make_grid(&f, 4, 4);
        let root = make_batch(&f, 4, None);
        let child = f
            .batches
            .create(NewBatch {
                name: "child".to_string(),
                quantity: 2,
                stage: Stage::Vegetation,
                genetic_id: f.genetic_id,
                current_room_id: Some(f.room_id),
                grid_map_id: None,
                grid_position: None,
                parent_batch_id: Some(root.id),
                tracking_code: None,
                start_date: Utc::now(),
                notes: None,
            })
            .unwrap();

        let outcome = f.allocator.distribute(child.id, grid.id, a1(), 2).unwrap();
        for unit in &outcome.placed {
            assert_eq!(unit.parent_batch_id, Some(root.id));
        }
    }

    #[test]
    fn individualized_source_is_relocated_not_split() {
        let f = fixture();
        let grid = make_grid(&f, 2, 2);
        let source = make_batch(&f, 1, Some("OGK-001"));

        let before = f.batches.active_on_grid(grid.id).unwrap().len();
        let outcome = f.allocator.distribute(source.id, grid.id, a1(), 1).unwrap();

        assert!(outcome.relocated);
        assert_eq!(outcome.placed.len(), 1);
        assert_eq!(outcome.placed[0].id, source.id);
        assert_eq!(outcome.placed[0].grid_position.as_deref(), Some("A1"));
        assert_eq!(f.batches.active_on_grid(grid.id).unwrap().len(), before + 1);

        let reread = f.batches.get(source.id).unwrap().unwrap();
        assert!(!reread.is_discarded());
    }

    #[test]
    fn uncoded_singleton_source_is_treated_as_splittable() {
        let f = fixture();
        let grid = make_grid(&f, 2, 2);
        let source = make_batch(&f, 1, None);

        let outcome = f.allocator.distribute(source.id, grid.id, a1(), 1).unwrap();

        assert!(!outcome.relocated);
        assert_eq!(outcome.placed.len(), 1);
        assert_ne!(outcome.placed[0].id, source.id);
        assert!(outcome.placed[0].tracking_code.is_some());
        assert!(f.batches.get(source.id).unwrap().unwrap().is_discarded());
    }

    #[test]
    fn full_grid_leaves_the_source_untouched() {
        let f = fixture();
        let grid = make_grid(&f, 1, 2);
        let filler = make_batch(&f, 2, None);
        f.allocator.distribute(filler.id, grid.id, a1(), 2).unwrap();

        let source = make_batch(&f, 3, None);
        let outcome = f.allocator.distribute(source.id, grid.id, a1(), 3).unwrap();

        assert!(outcome.placed.is_empty());
        assert_eq!(outcome.unplaced, 3);
        let survivor = f.batches.get(source.id).unwrap().unwrap();
        assert!(!survivor.is_discarded());
        assert_eq!(survivor.quantity, 3);
    }

    #[test]
    fn occupancy_is_seeded_from_active_placements() {
        let f = fixture();
        let grid = make_grid(&f, 2, 2);
        let first = make_batch(&f, 1, None);
        f.allocator.distribute(first.id, grid.id, a1(), 1).unwrap();

        let second = make_batch(&f, 1, None);
        let outcome = f.allocator.distribute(second.id, grid.id, a1(), 1).unwrap();
        assert_eq!(outcome.placed[0].grid_position.as_deref(), Some("A2"));
    }

    #[test]
    fn discarded_placements_free_their_slots() {
        let f = fixture();
        let grid = make_grid(&f, 2, 2);
        let first = make_batch(&f, 1, None);
        let placed = f.allocator.distribute(first.id, grid.id, a1(), 1).unwrap();
        f.batches
            .soft_delete(placed.placed[0].id, "eliminated")
            .unwrap();

        let second = make_batch(&f, 1, None);
        let outcome = f.allocator.distribute(second.id, grid.id, a1(), 1).unwrap();
        assert_eq!(outcome.placed[0].grid_position.as_deref(), Some("A1"));
    }

    #[test]
    fn insufficient_quantity_is_a_validation_failure() {
        let f = fixture();
        let grid = make_grid(&f, 2, 2);
        let source = make_batch(&f, 2, None);

        let err = f
            .allocator
            .distribute(source.id, grid.id, a1(), 3)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn bulk_distribution_never_double_books_a_slot() {
        let f = fixture();
        let grid = make_grid(&f, 2, 3);
        let first = make_batch(&f, 3, None);
        let second = make_batch(&f, 2, None);

        let outcomes = f
            .allocator
            .bulk_distribute(&[first.id, second.id], grid.id, a1())
            .unwrap();

        let mut positions: Vec<String> = outcomes
            .iter()
            .flat_map(|(_, o)| o.placed.iter())
            .map(|b| b.grid_position.clone().unwrap())
            .collect();
        assert_eq!(positions.len(), 5);
        positions.sort();
        positions.dedup();
        assert_eq!(positions.len(), 5, "duplicate slot assigned");
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Active placements on a grid always hold pairwise-distinct,
        /// in-bounds positions, whatever got distributed onto it.
        #[test]
        fn placements_stay_unique_and_in_bounds(
            rows in 1u32..5,
            columns in 1u32..5,
            quantities in prop::collection::vec(1u32..8, 1..4),
        ) {
            let f = fixture();
            let grid = make_grid(&f, rows, columns);

            for quantity in quantities {
                let source = make_batch(&f, quantity, None);
                f.allocator
                    .distribute(source.id, grid.id, a1(), quantity)
                    .unwrap();
            }

            let active = f.batches.active_on_grid(grid.id).unwrap();
            let mut seen = std::collections::HashSet::new();
            for batch in &active {
                let pos: GridPosition = batch.grid_position.as_deref().unwrap().parse().unwrap();
                prop_assert!(pos.row <= rows && pos.column <= columns);
                prop_assert!(seen.insert(pos), "slot {} double-booked", pos);
            }
        }
    }
}
