//! `verdant-batches` — canonical batch records and their store.
//!
//! A batch is a trackable quantity of cultivation units sharing a genetic
//! and a lifecycle stage. Batches are soft-deleted (discarded) rather than
//! removed, so the full history stays readable for audit and metrics.

pub mod batch;
pub mod genetic;
pub mod stage;
pub mod store;
pub mod tracking;

pub use batch::{Batch, BatchPatch, NewBatch};
pub use genetic::{Genetic, GeneticStore, NewGenetic};
pub use stage::Stage;
pub use store::{BatchStore, BulkDiscardReport, DISCARD_CHUNK_SIZE};
pub use tracking::TrackingCodeGenerator;
