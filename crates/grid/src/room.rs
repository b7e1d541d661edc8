use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{DomainError, DomainResult, RoomId};
use verdant_store::{Collection, Record};

use verdant_batches::Stage;

/// A physical location. Owns zero or more grid maps and is the "current
/// location" referenced by `Batch::current_room_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Which lifecycle stage this room hosts.
    pub stage_tag: Stage,
    /// Default grid dimensions for maps created in this room.
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub operational_days: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub order_index: i32,
}

impl Record for Room {
    type Id = RoomId;

    fn id(&self) -> RoomId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub stage_tag: Stage,
    pub rows: Option<u32>,
    pub columns: Option<u32>,
    pub operational_days: Option<u32>,
    pub start_date: DateTime<Utc>,
    pub order_index: i32,
}

/// Store for rooms.
#[derive(Clone)]
pub struct RoomStore {
    rooms: Arc<dyn Collection<Room>>,
}

impl RoomStore {
    pub fn new(rooms: Arc<dyn Collection<Room>>) -> Self {
        Self { rooms }
    }

    pub fn create(&self, new: NewRoom) -> DomainResult<Room> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("room name cannot be empty"));
        }
        let room = Room {
            id: RoomId::new(),
            name: new.name,
            stage_tag: new.stage_tag,
            rows: new.rows,
            columns: new.columns,
            operational_days: new.operational_days,
            start_date: new.start_date,
            order_index: new.order_index,
        };
        Ok(self.rooms.insert(room)?)
    }

    pub fn get(&self, id: RoomId) -> DomainResult<Option<Room>> {
        Ok(self.rooms.get(id)?)
    }

    /// All rooms in display order.
    pub fn list(&self) -> DomainResult<Vec<Room>> {
        let mut rooms = self.rooms.select(&|_| true)?;
        rooms.sort_by_key(|r| r.order_index);
        Ok(rooms)
    }

    /// Row deletion only. Ledger detachment and grid-map cleanup are the
    /// lifecycle engine's job.
    pub fn delete(&self, id: RoomId) -> DomainResult<()> {
        Ok(self.rooms.delete(id)?)
    }
}
