use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use verdant_core::{DomainError, DomainResult, GridMapId, RoomId};
use verdant_store::{Collection, Record};

use crate::room::Room;

/// A bounded 2D slot grid within a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridMap {
    pub id: GridMapId,
    pub room_id: RoomId,
    pub name: String,
    pub rows: u32,
    pub columns: u32,
    pub created_at: DateTime<Utc>,
}

impl Record for GridMap {
    type Id = GridMapId;

    fn id(&self) -> GridMapId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGridMap {
    pub room_id: RoomId,
    pub name: String,
    pub rows: u32,
    pub columns: u32,
}

/// Store for grid maps.
#[derive(Clone)]
pub struct GridMapStore {
    grid_maps: Arc<dyn Collection<GridMap>>,
    rooms: Arc<dyn Collection<Room>>,
}

impl GridMapStore {
    pub fn new(
        grid_maps: Arc<dyn Collection<GridMap>>,
        rooms: Arc<dyn Collection<Room>>,
    ) -> Self {
        Self { grid_maps, rooms }
    }

    pub fn create(&self, new: NewGridMap) -> DomainResult<GridMap> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("grid map name cannot be empty"));
        }
        if new.rows == 0 || new.columns == 0 {
            return Err(DomainError::validation(
                "grid dimensions must be at least 1x1",
            ));
        }
        if self.rooms.get(new.room_id)?.is_none() {
            return Err(DomainError::validation(format!(
                "unknown room: {}",
                new.room_id
            )));
        }

        let grid_map = GridMap {
            id: GridMapId::new(),
            room_id: new.room_id,
            name: new.name,
            rows: new.rows,
            columns: new.columns,
            created_at: Utc::now(),
        };
        Ok(self.grid_maps.insert(grid_map)?)
    }

    pub fn get(&self, id: GridMapId) -> DomainResult<Option<GridMap>> {
        Ok(self.grid_maps.get(id)?)
    }

    /// Grid maps owned by a room, oldest first.
    pub fn for_room(&self, room_id: RoomId) -> DomainResult<Vec<GridMap>> {
        let mut maps = self.grid_maps.select(&|g| g.room_id == room_id)?;
        maps.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(maps)
    }

    pub fn delete(&self, id: GridMapId) -> DomainResult<()> {
        Ok(self.grid_maps.delete(id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_batches::Stage;
    use verdant_store::InMemoryCollection;

    fn fixture() -> (GridMapStore, RoomId) {
        let rooms: Arc<InMemoryCollection<Room>> = Arc::new(InMemoryCollection::new());
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
        rooms.insert(room.clone()).unwrap();
        let store = GridMapStore::new(Arc::new(InMemoryCollection::new()), rooms);
        (store, room.id)
    }

    #[test]
    fn create_validates_dimensions() {
        let (store, room_id) = fixture();
        let err = store
            .create(NewGridMap {
                room_id,
                name: "table".to_string(),
                rows: 0,
                columns: 4,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_requires_an_existing_room() {
        let (store, _) = fixture();
        let err = store
            .create(NewGridMap {
                room_id: RoomId::new(),
                name: "table".to_string(),
                rows: 2,
                columns: 2,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn for_room_lists_oldest_first() {
        let (store, room_id) = fixture();
        let a = store
            .create(NewGridMap {
                room_id,
                name: "table a".to_string(),
                rows: 2,
                columns: 2,
            })
            .unwrap();
        let b = store
            .create(NewGridMap {
                room_id,
                name: "table b".to_string(),
                rows: 2,
                columns: 2,
            })
            .unwrap();

        let ids: Vec<_> = store.for_room(room_id).unwrap().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}
