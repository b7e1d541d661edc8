//! `verdant-ledger` — append-only audit trail of room and stage
//! transitions.
//!
//! Movement records are never updated or deleted once written, with one
//! sanctioned exception: when a room is deleted, records referencing it
//! keep existing but have that reference nulled. History must outlive the
//! location.

pub mod movement;

pub use movement::{MovementLedger, MovementRecord, NewMovement};
