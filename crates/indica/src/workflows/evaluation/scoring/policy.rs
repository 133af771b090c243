use super::super::domain::{CriterionScore, Evaluation};
use super::config::ScoringConfig;

/// Whether the evaluation should move into `completed` on this pass.
///
/// Completion is monotonic: an already completed evaluation is never
/// re-stamped and never regresses.
pub(crate) fn completion_due(evaluation: &Evaluation, config: &ScoringConfig) -> bool {
    if evaluation.is_completed() {
        return false;
    }

    if evaluation.criteria_scores.is_empty() && config.require_criteria {
        return false;
    }

    evaluation
        .criteria_scores
        .iter()
        .all(CriterionScore::is_scored)
}
