use std::collections::BTreeMap;
use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{
    ApplicationId, CriterionId, Evaluation, EvaluationId, EvaluationStatus, EvaluatorId,
};
use super::import::{ImportSummary, ScoreSheet, ScoreSheetImportError};
use super::repository::{
    AlertPublisher, ApplicationScoreSummary, CatalogError, CriteriaCatalog, EvaluationAlert,
    EvaluationRepository, RepositoryError,
};
use super::scoring::{mean_total, ScoringConfig, ScoringEngine};
use super::validation::{self, ValidationError};

/// Write path for evaluations: seeding, score writes, recompute, persistence.
pub struct EvaluationService<R, C, A> {
    repository: Arc<R>,
    catalog: Arc<C>,
    alerts: Arc<A>,
    engine: Arc<ScoringEngine>,
}

static EVALUATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_evaluation_id() -> EvaluationId {
    let id = EVALUATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    EvaluationId(format!("eval-{id:06}"))
}

/// Evaluator input for a single criterion. `None` comments keep the stored text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreUpdate {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub comments: Option<String>,
}

/// Attempts at a read-modify-write before a version conflict is surfaced.
const MAX_WRITE_ATTEMPTS: usize = 5;

impl<R, C, A> EvaluationService<R, C, A>
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    pub fn new(repository: Arc<R>, catalog: Arc<C>, alerts: Arc<A>, config: ScoringConfig) -> Self {
        Self {
            repository,
            catalog,
            alerts,
            engine: Arc::new(ScoringEngine::new(config)),
        }
    }

    /// Assign an evaluator to an application, seeding criteria from its notice.
    ///
    /// The repository rejects a second evaluation by the same evaluator; the
    /// lookup below only avoids a catalog round-trip in the common case.
    pub fn assign(
        &self,
        application_id: ApplicationId,
        evaluator_id: EvaluatorId,
    ) -> Result<Evaluation, EvaluationServiceError> {
        let existing = self.repository.for_application(&application_id)?;
        if existing
            .iter()
            .any(|evaluation| evaluation.evaluator_id == evaluator_id)
        {
            return Err(RepositoryError::Conflict.into());
        }

        let criteria = self.catalog.criteria_for(&application_id)?;
        validation::validate_definitions(&criteria)?;

        let evaluation = Evaluation::seeded(
            next_evaluation_id(),
            application_id,
            evaluator_id,
            &criteria,
            Utc::now(),
        );

        let stored = self.repository.insert(evaluation)?;
        info!(
            evaluation_id = %stored.id.0,
            application_id = %stored.application_id.0,
            criteria = stored.criteria_scores.len(),
            "evaluator assigned"
        );
        Ok(stored)
    }

    /// Write one criterion's score and comment, then recompute and persist.
    pub fn record_score(
        &self,
        evaluation_id: &EvaluationId,
        criteria_id: &CriterionId,
        update: ScoreUpdate,
    ) -> Result<Evaluation, EvaluationServiceError> {
        validation::validate_score(criteria_id, update.score)?;

        self.save_scored(evaluation_id, |evaluation| {
            let criterion = evaluation.criterion_mut(criteria_id).ok_or_else(|| {
                EvaluationServiceError::UnknownCriterion {
                    evaluation_id: evaluation_id.clone(),
                    criteria_id: criteria_id.clone(),
                }
            })?;

            criterion.score = update.score;
            if let Some(comments) = &update.comments {
                criterion.comments = comments.clone();
            }
            Ok(())
        })
    }

    /// Replace the evaluator's overall comment.
    pub fn update_comments(
        &self,
        evaluation_id: &EvaluationId,
        comments: String,
    ) -> Result<Evaluation, EvaluationServiceError> {
        self.save_scored(evaluation_id, |evaluation| {
            evaluation.comments = comments.clone();
            Ok(())
        })
    }

    /// Explicitly reopen a completed evaluation so it can be rescored.
    pub fn reopen(&self, evaluation_id: &EvaluationId) -> Result<Evaluation, EvaluationServiceError> {
        let current = self.load(evaluation_id)?;
        if !current.is_completed() {
            return Ok(current);
        }

        let (evaluation, _) = self.write(evaluation_id, |mut evaluation| {
            if evaluation.is_completed() {
                evaluation.status = if evaluation.scored_count() > 0 {
                    EvaluationStatus::InProgress
                } else {
                    EvaluationStatus::Pending
                };
                evaluation.completed_at = None;
                evaluation.updated_at = Utc::now();
            }
            Ok(evaluation)
        })?;

        info!(
            evaluation_id = %evaluation.id.0,
            status = evaluation.status.label(),
            "evaluation reopened"
        );
        Ok(evaluation)
    }

    /// Apply a CSV score sheet to a stored evaluation.
    pub fn import_scores<Rd: Read>(
        &self,
        evaluation_id: &EvaluationId,
        reader: Rd,
    ) -> Result<(Evaluation, ImportSummary), EvaluationServiceError> {
        let sheet = ScoreSheet::parse(reader)?;
        let mut summary = ImportSummary::default();
        let evaluation = self.save_scored(evaluation_id, |evaluation| {
            summary = sheet.apply(evaluation)?;
            Ok(())
        })?;
        Ok((evaluation, summary))
    }

    pub fn get(&self, evaluation_id: &EvaluationId) -> Result<Evaluation, EvaluationServiceError> {
        self.load(evaluation_id)
    }

    /// Summarize all evaluations of one application.
    pub fn application_summary(
        &self,
        application_id: &ApplicationId,
    ) -> Result<ApplicationScoreSummary, EvaluationServiceError> {
        let evaluations = self.repository.for_application(application_id)?;
        let completed: Vec<f64> = evaluations
            .iter()
            .filter(|evaluation| evaluation.is_completed())
            .map(|evaluation| evaluation.total_score)
            .collect();

        Ok(ApplicationScoreSummary {
            application_id: application_id.clone(),
            evaluations: evaluations.len(),
            completed: completed.len(),
            average_total: mean_total(&completed),
        })
    }

    /// Mutate, apply caller-side status rules, run the engine and persist.
    fn save_scored<F>(
        &self,
        evaluation_id: &EvaluationId,
        mut mutate: F,
    ) -> Result<Evaluation, EvaluationServiceError>
    where
        F: FnMut(&mut Evaluation) -> Result<(), EvaluationServiceError>,
    {
        let (evaluation, was_completed) = self.write(evaluation_id, |mut evaluation| {
            mutate(&mut evaluation)?;
            let now = Utc::now();
            let mut evaluation = apply_scoring(&self.engine, evaluation, now);
            evaluation.updated_at = now;
            Ok(evaluation)
        })?;

        if !was_completed && evaluation.is_completed() {
            info!(
                evaluation_id = %evaluation.id.0,
                total_score = evaluation.total_score,
                "evaluation completed"
            );
            if let Err(error) = self.alerts.publish(completion_alert(&evaluation)) {
                warn!(
                    evaluation_id = %evaluation.id.0,
                    %error,
                    "completion alert not delivered"
                );
            }
        }

        Ok(evaluation)
    }

    /// Read-modify-write against the stored version, re-reading on conflict.
    ///
    /// Returns the stored evaluation and whether it was completed when read.
    fn write<F>(
        &self,
        evaluation_id: &EvaluationId,
        mut apply: F,
    ) -> Result<(Evaluation, bool), EvaluationServiceError>
    where
        F: FnMut(Evaluation) -> Result<Evaluation, EvaluationServiceError>,
    {
        let mut attempt = 1;
        loop {
            let current = self.load(evaluation_id)?;
            let was_completed = current.is_completed();
            let next = apply(current)?;

            match self.repository.update(next) {
                Ok(stored) => return Ok((stored, was_completed)),
                Err(RepositoryError::Conflict) if attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(
                        evaluation_id = %evaluation_id.0,
                        attempt,
                        "concurrent write detected, retrying"
                    );
                    attempt += 1;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn load(&self, evaluation_id: &EvaluationId) -> Result<Evaluation, EvaluationServiceError> {
        let evaluation = self
            .repository
            .fetch(evaluation_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(evaluation)
    }
}

/// Move `pending` to `in_progress` once anything is scored, then recompute.
pub fn apply_scoring(
    engine: &ScoringEngine,
    mut evaluation: Evaluation,
    now: DateTime<Utc>,
) -> Evaluation {
    if evaluation.status == EvaluationStatus::Pending && evaluation.scored_count() > 0 {
        evaluation.status = EvaluationStatus::InProgress;
    }
    engine.recompute_at(evaluation, now)
}

fn completion_alert(evaluation: &Evaluation) -> EvaluationAlert {
    let mut details = BTreeMap::new();
    details.insert("evaluator_id".to_string(), evaluation.evaluator_id.0.clone());
    details.insert(
        "total_score".to_string(),
        format!("{:.2}", evaluation.total_score),
    );

    EvaluationAlert {
        template: "evaluation_completed".to_string(),
        evaluation_id: evaluation.id.clone(),
        application_id: evaluation.application_id.clone(),
        details,
    }
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("criterion {criteria_id:?} is not part of evaluation {evaluation_id:?}")]
    UnknownCriterion {
        evaluation_id: EvaluationId,
        criteria_id: CriterionId,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Import(#[from] ScoreSheetImportError),
}
