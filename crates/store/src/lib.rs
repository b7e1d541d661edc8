//! `verdant-store` — generic row-store abstraction.
//!
//! The backing store is assumed to support only per-row atomic insert and
//! update. There is no multi-row transaction capability; every multi-step
//! workflow built on top of this seam is non-atomic by construction.

pub mod collection;
pub mod in_memory;

pub use collection::{Collection, Record, StoreError, StoreResult};
pub use in_memory::InMemoryCollection;
