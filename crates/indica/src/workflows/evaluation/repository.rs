use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    ApplicationId, CriterionDefinition, Evaluation, EvaluationId, EvaluatorId,
};

/// Storage abstraction for evaluations.
///
/// `insert` must reject a second evaluation for the same application and
/// evaluator with [`RepositoryError::Conflict`]. `update` is a compare-and-swap
/// on [`Evaluation::version`]: it fails with `Conflict` when the stored record
/// moved on since it was read, and otherwise stores the record with the
/// version bumped and returns it.
pub trait EvaluationRepository: Send + Sync {
    fn insert(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError>;
    fn update(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError>;
    fn fetch(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError>;
    fn for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Evaluation>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Source of the notice's evaluation criteria for a given application.
pub trait CriteriaCatalog: Send + Sync {
    fn criteria_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<CriterionDefinition>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("no notice criteria registered for application {0:?}")]
    UnknownApplication(ApplicationId),
    #[error("criteria catalog unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, dashboard feed, ...).
pub trait AlertPublisher: Send + Sync {
    fn publish(&self, alert: EvaluationAlert) -> Result<(), AlertError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationAlert {
    pub template: String,
    pub evaluation_id: EvaluationId,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

/// Public projection of an evaluation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub evaluation_id: EvaluationId,
    pub application_id: ApplicationId,
    pub evaluator_id: EvaluatorId,
    pub status: &'static str,
    pub total_score: f64,
    pub scored: usize,
    pub criteria: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Evaluation> for EvaluationView {
    fn from(evaluation: &Evaluation) -> Self {
        Self {
            evaluation_id: evaluation.id.clone(),
            application_id: evaluation.application_id.clone(),
            evaluator_id: evaluation.evaluator_id.clone(),
            status: evaluation.status.label(),
            total_score: evaluation.total_score,
            scored: evaluation.scored_count(),
            criteria: evaluation.criteria_scores.len(),
            completed_at: evaluation.completed_at,
        }
    }
}

/// Aggregate of every evaluator's pass over one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationScoreSummary {
    pub application_id: ApplicationId,
    pub evaluations: usize,
    pub completed: usize,
    /// Mean of completed totals; `None` until one evaluation completes.
    pub average_total: Option<f64>,
}
