use std::collections::BTreeSet;

use super::domain::{CriterionDefinition, CriterionId, CriterionScore};

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

/// Boundary errors for criterion scores written by evaluators or importers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("score {score} for criterion {criteria_id:?} must be within [0, 10]")]
    ScoreOutOfRange { criteria_id: CriterionId, score: f64 },
    #[error("weight {weight} for criterion {criteria_id:?} must be a positive number")]
    NonPositiveWeight {
        criteria_id: CriterionId,
        weight: f64,
    },
    #[error("criterion identifier must not be blank")]
    MissingCriterionId,
    #[error("criterion {0:?} appears more than once")]
    DuplicateCriterion(CriterionId),
}

pub fn validate_score(criteria_id: &CriterionId, score: Option<f64>) -> Result<(), ValidationError> {
    match score {
        Some(value) if !value.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&value) => {
            Err(ValidationError::ScoreOutOfRange {
                criteria_id: criteria_id.clone(),
                score: value,
            })
        }
        _ => Ok(()),
    }
}

pub fn validate_weight(criteria_id: &CriterionId, weight: f64) -> Result<(), ValidationError> {
    if weight.is_finite() && weight > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::NonPositiveWeight {
            criteria_id: criteria_id.clone(),
            weight,
        })
    }
}

fn validate_id(criteria_id: &CriterionId) -> Result<(), ValidationError> {
    if criteria_id.0.trim().is_empty() {
        Err(ValidationError::MissingCriterionId)
    } else {
        Ok(())
    }
}

pub fn validate_criterion(criterion: &CriterionScore) -> Result<(), ValidationError> {
    validate_id(&criterion.criteria_id)?;
    validate_weight(&criterion.criteria_id, criterion.weight)?;
    validate_score(&criterion.criteria_id, criterion.score)
}

/// Validate a full criteria list, including identifier uniqueness.
pub fn validate_criteria(criteria: &[CriterionScore]) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for criterion in criteria {
        validate_criterion(criterion)?;
        if !seen.insert(&criterion.criteria_id) {
            return Err(ValidationError::DuplicateCriterion(
                criterion.criteria_id.clone(),
            ));
        }
    }
    Ok(())
}

/// Validate a notice's criteria before they seed an evaluation.
pub fn validate_definitions(definitions: &[CriterionDefinition]) -> Result<(), ValidationError> {
    let seeded: Vec<CriterionScore> = definitions.iter().map(CriterionScore::from).collect();
    validate_criteria(&seeded)
}
