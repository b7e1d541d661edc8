use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{ActorId, BatchId, MovementId, RoomId};
use verdant_store::{Collection, Record, StoreResult};

/// One audit entry: a batch left `from_room_id` for `to_room_id`.
///
/// A record with `from == to` is a stage-change entry, not a relocation.
/// `created_by` is an opaque actor id; resolving it to a display name is an
/// external profile-lookup collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub id: MovementId,
    pub batch_id: BatchId,
    pub from_room_id: Option<RoomId>,
    pub to_room_id: Option<RoomId>,
    pub notes: Option<String>,
    pub created_by: ActorId,
    pub moved_at: DateTime<Utc>,
}

impl Record for MovementRecord {
    type Id = MovementId;

    fn id(&self) -> MovementId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    pub batch_id: BatchId,
    pub from_room_id: Option<RoomId>,
    pub to_room_id: Option<RoomId>,
    pub notes: Option<String>,
    pub created_by: ActorId,
}

/// Append-only movement ledger.
#[derive(Clone)]
pub struct MovementLedger {
    movements: Arc<dyn Collection<MovementRecord>>,
}

impl MovementLedger {
    pub fn new(movements: Arc<dyn Collection<MovementRecord>>) -> Self {
        Self { movements }
    }

    /// Insert-only. Assigns id and `moved_at`.
    pub fn append(&self, new: NewMovement) -> StoreResult<MovementRecord> {
        let record = MovementRecord {
            id: MovementId::new(),
            batch_id: new.batch_id,
            from_room_id: new.from_room_id,
            to_room_id: new.to_room_id,
            notes: new.notes,
            created_by: new.created_by,
            moved_at: Utc::now(),
        };
        let stored = self.movements.insert(record)?;
        tracing::debug!(movement_id = %stored.id, batch_id = %stored.batch_id, "movement appended");
        Ok(stored)
    }

    /// Every record that touches the room, newest first.
    pub fn for_room(&self, room_id: RoomId) -> StoreResult<Vec<MovementRecord>> {
        let mut records = self
            .movements
            .select(&|m| m.from_room_id == Some(room_id) || m.to_room_id == Some(room_id))?;
        records.sort_by(|a, b| {
            b.moved_at
                .cmp(&a.moved_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(records)
    }

    /// A batch's history, oldest first.
    pub fn for_batch(&self, batch_id: BatchId) -> StoreResult<Vec<MovementRecord>> {
        let mut records = self.movements.select(&|m| m.batch_id == batch_id)?;
        records.sort_by(|a, b| {
            a.moved_at
                .cmp(&b.moved_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(records)
    }

    /// Records whose `from_room_id` matches; metrics classify these.
    pub fn departures_from(&self, room_id: RoomId) -> StoreResult<Vec<MovementRecord>> {
        self.movements.select(&|m| m.from_room_id == Some(room_id))
    }

    /// Null out references to a deleted room. The records themselves
    /// survive; this is the only mutation the ledger ever performs.
    pub fn detach_room(&self, room_id: RoomId) -> StoreResult<usize> {
        let touching = self
            .movements
            .select(&|m| m.from_room_id == Some(room_id) || m.to_room_id == Some(room_id))?;

        let mut detached = 0;
        for mut record in touching {
            if record.from_room_id == Some(room_id) {
                record.from_room_id = None;
            }
            if record.to_room_id == Some(room_id) {
                record.to_room_id = None;
            }
            self.movements.replace(record)?;
            detached += 1;
        }

        if detached > 0 {
            tracing::info!(room_id = %room_id, detached, "room references nulled in ledger");
        }
        Ok(detached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_store::InMemoryCollection;

    fn ledger() -> MovementLedger {
        MovementLedger::new(Arc::new(InMemoryCollection::new()))
    }

    fn movement(from: Option<RoomId>, to: Option<RoomId>) -> NewMovement {
        NewMovement {
            batch_id: BatchId::new(),
            from_room_id: from,
            to_room_id: to,
            notes: None,
            created_by: ActorId::new(),
        }
    }

    #[test]
    fn for_room_matches_either_side_newest_first() {
        let ledger = ledger();
        let room = RoomId::new();
        let other = RoomId::new();

        let outbound = ledger.append(movement(Some(room), Some(other))).unwrap();
        let inbound = ledger.append(movement(Some(other), Some(room))).unwrap();
        ledger.append(movement(Some(other), None)).unwrap();

        let records = ledger.for_room(room).unwrap();
        assert_eq!(records.len(), 2);
        // UUIDv7 ids break ties between same-millisecond appends.
        assert_eq!(records[0].id, inbound.id);
        assert_eq!(records[1].id, outbound.id);
    }

    #[test]
    fn for_batch_returns_history_oldest_first() {
        let ledger = ledger();
        let batch_id = BatchId::new();
        let mut new = movement(None, Some(RoomId::new()));
        new.batch_id = batch_id;
        let first = ledger.append(new.clone()).unwrap();
        let second = ledger.append(new).unwrap();

        let records = ledger.for_batch(batch_id).unwrap();
        assert_eq!(records[0].id, first.id);
        assert_eq!(records[1].id, second.id);
    }

    #[test]
    fn detach_room_nulls_references_but_keeps_records() {
        let ledger = ledger();
        let doomed = RoomId::new();
        let other = RoomId::new();

        let a = ledger.append(movement(Some(doomed), Some(other))).unwrap();
        let b = ledger.append(movement(Some(other), Some(doomed))).unwrap();
        ledger.append(movement(Some(other), None)).unwrap();

        assert_eq!(ledger.detach_room(doomed).unwrap(), 2);

        assert!(ledger.for_room(doomed).unwrap().is_empty());
        let survivors = ledger.for_room(other).unwrap();
        assert_eq!(survivors.len(), 3);
        let a_after = survivors.iter().find(|r| r.id == a.id).unwrap();
        assert_eq!(a_after.from_room_id, None);
        assert_eq!(a_after.to_room_id, Some(other));
        let b_after = survivors.iter().find(|r| r.id == b.id).unwrap();
        assert_eq!(b_after.to_room_id, None);
    }
}
