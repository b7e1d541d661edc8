use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use verdant_core::{DomainResult, GeneticId, RoomId};

use verdant_batches::{BatchStore, GeneticStore};
use verdant_ledger::MovementLedger;

/// Discard reasons produced by internal workflows (distribution,
/// individualization) rather than grower decisions. Matching is
/// case-insensitive substring search, so both English and Spanish wordings
/// ("distributed"/"distribuido", "individualization"/"individualizacion")
/// hit.
const INTERNAL_REASON_PATTERNS: [&str; 2] = ["distribu", "individualizac"];

/// Whether a discard reason marks a system outcome that is excluded from
/// success/failure classification.
pub fn is_internal_reason(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    INTERNAL_REASON_PATTERNS.iter().any(|p| lower.contains(p))
}

/// Per-genetic outcome statistics for one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticStats {
    pub genetic_id: GeneticId,
    pub genetic_name: String,
    /// Historical departures that went to another room alive.
    pub success: u32,
    /// Historical departures ending in a grower-caused discard.
    pub failure: u32,
    /// Batches of this genetic currently active in the room.
    pub active: u32,
    pub total: u32,
    /// `success / (success + failure)` as a percentage; 0 when there is no
    /// classified history.
    pub success_rate: f64,
    /// `(success + active) / total` as a percentage.
    pub global_success_rate: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    success: u32,
    failure: u32,
    active: u32,
}

/// Computes per-genetic success/failure statistics from the batch store's
/// active state and the movement ledger's history.
#[derive(Clone)]
pub struct MetricsAggregator {
    batches: BatchStore,
    ledger: MovementLedger,
    genetics: GeneticStore,
}

impl MetricsAggregator {
    pub fn new(batches: BatchStore, ledger: MovementLedger, genetics: GeneticStore) -> Self {
        Self {
            batches,
            ledger,
            genetics,
        }
    }

    /// Statistics for every genetic seen in the room, sorted descending by
    /// total count.
    ///
    /// Classification of a historical departure record:
    /// - destination room set: the batch left alive (success);
    /// - no destination and the batch was discarded for a grower-supplied
    ///   reason: failure;
    /// - no destination but the discard reason is internal
    ///   ([`is_internal_reason`]): excluded entirely;
    /// - anything else (batch still active elsewhere, or hard-deleted by
    ///   finalization): not classifiable, skipped.
    pub fn room_stats(&self, room_id: RoomId) -> DomainResult<Vec<GeneticStats>> {
        let mut tallies: HashMap<GeneticId, Tally> = HashMap::new();

        for batch in self.batches.active_in_room(room_id)? {
            tallies.entry(batch.genetic_id).or_default().active += 1;
        }

        for record in self.ledger.departures_from(room_id)? {
            let Some(batch) = self.batches.get(record.batch_id)? else {
                continue;
            };

            if record.to_room_id.is_some() {
                tallies.entry(batch.genetic_id).or_default().success += 1;
                continue;
            }

            if batch.is_discarded() {
                let internal = batch
                    .discard_reason
                    .as_deref()
                    .is_some_and(is_internal_reason);
                if !internal {
                    tallies.entry(batch.genetic_id).or_default().failure += 1;
                }
            }
        }

        let mut stats = Vec::with_capacity(tallies.len());
        for (genetic_id, tally) in tallies {
            let genetic_name = self
                .genetics
                .get(genetic_id)?
                .map(|g| g.name)
                .unwrap_or_else(|| genetic_id.to_string());

            let classified = tally.success + tally.failure;
            let success_rate = if classified > 0 {
                f64::from(tally.success) / f64::from(classified) * 100.0
            } else {
                0.0
            };

            let total = classified + tally.active;
            let global_success_rate = if total > 0 {
                f64::from(tally.success + tally.active) / f64::from(total) * 100.0
            } else {
                0.0
            };

            stats.push(GeneticStats {
                genetic_id,
                genetic_name,
                success: tally.success,
                failure: tally.failure,
                active: tally.active,
                total,
                success_rate,
                global_success_rate,
            });
        }

        stats.sort_by(|a, b| {
            b.total
                .cmp(&a.total)
                .then_with(|| a.genetic_name.cmp(&b.genetic_name))
        });
        Ok(stats)
    }
}
