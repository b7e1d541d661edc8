//! `verdant-metrics` — derived audit analytics.
//!
//! Read-only: folds the movement ledger's history and the batch store's
//! active state into per-genetic success statistics for a room. Nothing
//! here writes anywhere.

pub mod aggregator;

pub use aggregator::{is_internal_reason, GeneticStats, MetricsAggregator};
