mod config;
mod policy;
mod rules;

pub use config::ScoringConfig;
pub use rules::round_half_up;

pub(crate) use rules::mean_total;

use super::domain::{Evaluation, EvaluationStatus};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Stateless engine deriving `total_score` and completion from the criteria list.
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Recompute derived fields, stamping completion with the current time.
    pub fn recompute(&self, evaluation: Evaluation) -> Evaluation {
        self.recompute_at(evaluation, Utc::now())
    }

    /// Recompute derived fields using `now` as the completion timestamp.
    ///
    /// Only `total_score`, `status` and `completed_at` are touched. When no
    /// scored criterion carries weight the previous total is kept.
    pub fn recompute_at(&self, mut evaluation: Evaluation, now: DateTime<Utc>) -> Evaluation {
        let sums = rules::weighted_sums(&evaluation.criteria_scores);
        if sums.skipped > 0 {
            warn!(
                evaluation_id = %evaluation.id.0,
                skipped = sums.skipped,
                "criteria with non-representable score or weight left out of total"
            );
        }

        if let Some(total) = sums.average() {
            evaluation.total_score = total;
        }

        if policy::completion_due(&evaluation, &self.config) {
            evaluation.status = EvaluationStatus::Completed;
            evaluation.completed_at = Some(now);
            debug!(
                evaluation_id = %evaluation.id.0,
                total_score = evaluation.total_score,
                contributing = sums.contributing,
                "evaluation completed"
            );
        }

        evaluation
    }
}
