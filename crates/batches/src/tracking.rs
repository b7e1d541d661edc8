use std::sync::Arc;

use verdant_core::{DomainError, DomainResult, GeneticId};
use verdant_store::Collection;

use crate::batch::Batch;
use crate::genetic::Genetic;

/// Prefix used when a genetic carries no nomenclature of its own.
pub const DEFAULT_PREFIX: &str = "GEN";

/// Genetic-scoped sequential tracking codes for individualized units.
///
/// `next_code` is count-then-write: it counts the codes already assigned
/// for the genetic and formats `count + 1`. There is no atomic sequence or
/// lock behind it, so two concurrent callers asking for a code on the same
/// genetic can observe the same count and collide. Known correctness risk;
/// callers that need stronger guarantees must serialize externally.
#[derive(Clone)]
pub struct TrackingCodeGenerator {
    batches: Arc<dyn Collection<Batch>>,
    genetics: Arc<dyn Collection<Genetic>>,
}

impl TrackingCodeGenerator {
    pub fn new(
        batches: Arc<dyn Collection<Batch>>,
        genetics: Arc<dyn Collection<Genetic>>,
    ) -> Self {
        Self { batches, genetics }
    }

    /// Next code for the genetic, formatted `{prefix}-{seq:03}`.
    ///
    /// Discarded batches keep their codes and stay in the count, so a code
    /// is never reissued after its holder is discarded.
    pub fn next_code(&self, genetic_id: GeneticId) -> DomainResult<String> {
        let genetic = self
            .genetics
            .get(genetic_id)?
            .ok_or_else(|| DomainError::validation(format!("unknown genetic: {genetic_id}")))?;

        let coded = self
            .batches
            .count(&|b| b.genetic_id == genetic_id && b.tracking_code.is_some())?;
        let seq = coded + 1;

        let prefix = genetic.nomenclature.as_deref().unwrap_or(DEFAULT_PREFIX);
        Ok(format!("{prefix}-{seq:03}"))
    }
}
