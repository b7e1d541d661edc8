//! `verdant-grid` — rooms, bounded 2D slot grids, and collision-free
//! placement.
//!
//! A grid map gives individual cultivation units distinct addresses like
//! `"C4"`: a bijective base-26 row label plus a 1-based column number. The
//! allocator scans row-major for free slots and performs split-to-grid
//! distribution of batches.

pub mod allocator;
pub mod grid_map;
pub mod position;
pub mod room;

pub use allocator::{DistributeOutcome, GridAllocator, DISTRIBUTED_DISCARD_REASON};
pub use grid_map::{GridMap, GridMapStore, NewGridMap};
pub use position::{parse_row_label, row_label, GridCursor, GridPosition};
pub use room::{NewRoom, Room, RoomStore};
