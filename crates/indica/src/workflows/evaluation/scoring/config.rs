use serde::{Deserialize, Serialize};

/// Dials for the scoring engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// When set, an evaluation without any criteria never completes.
    #[serde(default)]
    pub require_criteria: bool,
}
