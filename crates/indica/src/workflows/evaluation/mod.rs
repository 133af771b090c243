//! Evaluator scoring of grant applications submitted to public notices.
//!
//! An evaluation carries one weighted score per notice criterion. Every write
//! goes through [`EvaluationService`], which applies the caller-side status
//! rules and then lets [`ScoringEngine`] derive the total and completion.

pub mod domain;
pub mod import;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, CriterionDefinition, CriterionId, CriterionScore, Evaluation, EvaluationId,
    EvaluationStatus, EvaluatorId,
};
pub use import::{ImportSummary, ScoreSheet, ScoreSheetImportError, ScoreSheetImporter};
pub use repository::{
    AlertError, AlertPublisher, ApplicationScoreSummary, CatalogError, CriteriaCatalog,
    EvaluationAlert, EvaluationRepository, EvaluationView, RepositoryError,
};
pub use router::evaluation_router;
pub use scoring::{ScoringConfig, ScoringEngine};
pub use service::{apply_scoring, EvaluationService, EvaluationServiceError, ScoreUpdate};
pub use validation::ValidationError;
