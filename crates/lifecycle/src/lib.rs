//! `verdant-lifecycle` — workflow orchestration over batches, grids and
//! the movement ledger.
//!
//! The engine composes the stores through their traits and contains no IO
//! of its own. Every multi-step workflow here is non-atomic: the backing
//! store offers per-row writes only, so a failure partway through leaves a
//! partial but inspectable state and is surfaced without compensation.

pub mod engine;

pub use engine::{
    FinishedLot, GeneticTransfer, LifecycleEngine, MergeOutcome, MergeSpec, MoveOutcome,
    MoveRequest, TransplantOutcome, TransplantRequest,
};
