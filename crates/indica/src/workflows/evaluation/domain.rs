use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for a single evaluator's scoring pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

/// Opaque reference to the application being scored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Opaque reference to the evaluator authoring an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluatorId(pub String);

/// Key of a notice's evaluation criterion, unique within one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CriterionId(pub String);

/// One weighted criterion as published by a notice's evaluation criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionDefinition {
    pub criteria_id: CriterionId,
    pub name: String,
    pub weight: f64,
}

/// A single scored (or not yet scored) criterion within an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criteria_id: CriterionId,
    /// Denormalized display name copied from the notice.
    pub name: String,
    /// `None` means the evaluator has not scored this criterion yet.
    #[serde(default)]
    pub score: Option<f64>,
    pub weight: f64,
    #[serde(default)]
    pub comments: String,
}

impl CriterionScore {
    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }
}

impl From<&CriterionDefinition> for CriterionScore {
    fn from(definition: &CriterionDefinition) -> Self {
        Self {
            criteria_id: definition.criteria_id.clone(),
            name: definition.name.clone(),
            score: None,
            weight: definition.weight,
            comments: String::new(),
        }
    }
}

/// Lifecycle of an evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl EvaluationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EvaluationStatus::Pending => "pending",
            EvaluationStatus::InProgress => "in_progress",
            EvaluationStatus::Completed => "completed",
        }
    }
}

/// One evaluator's scoring pass over one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: EvaluationId,
    pub application_id: ApplicationId,
    pub evaluator_id: EvaluatorId,
    #[serde(default)]
    pub criteria_scores: Vec<CriterionScore>,
    #[serde(default)]
    pub total_score: f64,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub status: EvaluationStatus,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Storage revision the record was read at; bumped by every update.
    #[serde(default)]
    pub version: u64,
}

impl Evaluation {
    /// Fresh pending evaluation seeded from a notice's criteria.
    pub fn seeded(
        id: EvaluationId,
        application_id: ApplicationId,
        evaluator_id: EvaluatorId,
        criteria: &[CriterionDefinition],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            application_id,
            evaluator_id,
            criteria_scores: criteria.iter().map(CriterionScore::from).collect(),
            total_score: 0.0,
            comments: String::new(),
            status: EvaluationStatus::Pending,
            completed_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    pub fn criterion_mut(&mut self, criteria_id: &CriterionId) -> Option<&mut CriterionScore> {
        self.criteria_scores
            .iter_mut()
            .find(|criterion| &criterion.criteria_id == criteria_id)
    }

    pub fn scored_count(&self) -> usize {
        self.criteria_scores
            .iter()
            .filter(|criterion| criterion.is_scored())
            .count()
    }

    pub fn is_completed(&self) -> bool {
        self.status == EvaluationStatus::Completed
    }
}
