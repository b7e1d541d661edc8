use std::sync::Arc;

use serde::{Deserialize, Serialize};

use verdant_core::{DomainError, DomainResult, GeneticId};
use verdant_store::{Collection, Record};

/// A cultivar. The nomenclature prefix drives tracking-code formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genetic {
    pub id: GeneticId,
    pub name: String,
    /// Tracking-code prefix, e.g. `"OGK"`. Falls back to `"GEN"` when absent.
    pub nomenclature: Option<String>,
}

impl Record for Genetic {
    type Id = GeneticId;

    fn id(&self) -> GeneticId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGenetic {
    pub name: String,
    pub nomenclature: Option<String>,
}

/// Store for genetics.
#[derive(Clone)]
pub struct GeneticStore {
    genetics: Arc<dyn Collection<Genetic>>,
}

impl GeneticStore {
    pub fn new(genetics: Arc<dyn Collection<Genetic>>) -> Self {
        Self { genetics }
    }

    pub fn create(&self, new: NewGenetic) -> DomainResult<Genetic> {
        if new.name.trim().is_empty() {
            return Err(DomainError::validation("genetic name cannot be empty"));
        }
        let genetic = Genetic {
            id: GeneticId::new(),
            name: new.name,
            nomenclature: new.nomenclature,
        };
        Ok(self.genetics.insert(genetic)?)
    }

    pub fn get(&self, id: GeneticId) -> DomainResult<Option<Genetic>> {
        Ok(self.genetics.get(id)?)
    }

    pub fn list(&self) -> DomainResult<Vec<Genetic>> {
        let mut all = self.genetics.select(&|_| true)?;
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }
}
