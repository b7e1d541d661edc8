//! Lifecycle stages and the allowed-transition table.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Germination,
    Clones,
    Vegetation,
    Flowering,
    Drying,
    Curing,
    Mother,
    LivingSoil,
}

impl Stage {
    /// Whether `self -> next` is an allowed stage transition.
    ///
    /// The main line runs germination -> clones/vegetation -> flowering ->
    /// drying -> curing. `Mother` and `LivingSoil` are stable side-states:
    /// batches enter them at creation and never transition in or out.
    pub fn can_transition_to(self, next: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, next),
            (Germination, Clones)
                | (Germination, Vegetation)
                | (Clones, Vegetation)
                | (Vegetation, Flowering)
                | (Flowering, Drying)
                | (Drying, Curing)
        )
    }

    /// Stable side-states sit outside the main germination-to-curing line.
    pub fn is_side_state(self) -> bool {
        matches!(self, Stage::Mother | Stage::LivingSoil)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Germination => "germination",
            Stage::Clones => "clones",
            Stage::Vegetation => "vegetation",
            Stage::Flowering => "flowering",
            Stage::Drying => "drying",
            Stage::Curing => "curing",
            Stage::Mother => "mother",
            Stage::LivingSoil => "living_soil",
        }
    }
}

impl core::fmt::Display for Stage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 8] = [
        Stage::Germination,
        Stage::Clones,
        Stage::Vegetation,
        Stage::Flowering,
        Stage::Drying,
        Stage::Curing,
        Stage::Mother,
        Stage::LivingSoil,
    ];

    #[test]
    fn main_line_transitions_are_allowed() {
        assert!(Stage::Germination.can_transition_to(Stage::Clones));
        assert!(Stage::Germination.can_transition_to(Stage::Vegetation));
        assert!(Stage::Clones.can_transition_to(Stage::Vegetation));
        assert!(Stage::Vegetation.can_transition_to(Stage::Flowering));
        assert!(Stage::Flowering.can_transition_to(Stage::Drying));
        assert!(Stage::Drying.can_transition_to(Stage::Curing));
    }

    #[test]
    fn transitions_never_run_backwards() {
        assert!(!Stage::Curing.can_transition_to(Stage::Drying));
        assert!(!Stage::Flowering.can_transition_to(Stage::Vegetation));
        assert!(!Stage::Vegetation.can_transition_to(Stage::Germination));
    }

    #[test]
    fn side_states_are_isolated() {
        for stage in ALL {
            assert!(!stage.can_transition_to(Stage::Mother));
            assert!(!stage.can_transition_to(Stage::LivingSoil));
            assert!(!Stage::Mother.can_transition_to(stage));
            assert!(!Stage::LivingSoil.can_transition_to(stage));
        }
    }

    #[test]
    fn no_stage_transitions_to_itself() {
        for stage in ALL {
            assert!(!stage.can_transition_to(stage));
        }
    }

    #[test]
    fn serializes_as_snake_case() {
        for stage in ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
            let back: Stage = serde_json::from_str(&json).unwrap();
            assert_eq!(back, stage);
        }
    }
}
