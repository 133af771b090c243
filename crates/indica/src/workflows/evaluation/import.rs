use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use super::domain::{CriterionId, Evaluation};
use super::scoring::ScoringEngine;
use super::service::apply_scoring;
use super::validation::{self, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ScoreSheetImportError {
    #[error("failed to read score sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid score sheet CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("score sheet rejected: {0}")]
    Validation(#[from] ValidationError),
}

/// Counts of rows applied to and ignored by an evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub applied: usize,
    pub ignored: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct ScoreSheetRow {
    #[serde(rename = "Criteria ID")]
    criteria_id: String,
    #[serde(rename = "Score", default)]
    score: Option<f64>,
    #[serde(rename = "Comments", default)]
    comments: Option<String>,
}

/// Parsed score sheet, ready to be applied to one or more reads of an
/// evaluation.
///
/// Rows are matched to existing criteria by id; rows naming criteria the
/// evaluation does not carry are ignored, as is any repeat of a criterion
/// already applied. Weights always come from the notice, so a `Weight`
/// column in the export is not read. A single invalid row rejects the whole
/// sheet.
#[derive(Debug, Clone)]
pub struct ScoreSheet {
    rows: Vec<ScoreSheetRow>,
}

impl ScoreSheet {
    pub fn parse<R: Read>(reader: R) -> Result<Self, ScoreSheetImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let rows = csv_reader
            .deserialize::<ScoreSheetRow>()
            .collect::<Result<Vec<_>, csv::Error>>()?;
        Ok(Self { rows })
    }

    /// Apply the rows without recomputing; the caller owns the write path.
    pub fn apply(&self, evaluation: &mut Evaluation) -> Result<ImportSummary, ScoreSheetImportError> {
        let mut staged = evaluation.clone();
        let mut applied: HashSet<CriterionId> = HashSet::new();
        let mut summary = ImportSummary::default();

        for row in &self.rows {
            let criteria_id = CriterionId(row.criteria_id.clone());
            if applied.contains(&criteria_id) {
                summary.ignored += 1;
                continue;
            }

            let Some(criterion) = staged.criterion_mut(&criteria_id) else {
                debug!(criteria_id = %criteria_id.0, "score sheet row has no matching criterion");
                summary.ignored += 1;
                continue;
            };

            validation::validate_score(&criteria_id, row.score)?;
            criterion.score = row.score;
            if let Some(comments) = &row.comments {
                criterion.comments = comments.clone();
            }

            applied.insert(criteria_id);
            summary.applied += 1;
        }

        *evaluation = staged;
        Ok(summary)
    }
}

/// File and reader entry points for offline score sheet imports.
pub struct ScoreSheetImporter;

impl ScoreSheetImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        evaluation: Evaluation,
        engine: &ScoringEngine,
    ) -> Result<(Evaluation, ImportSummary), ScoreSheetImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, evaluation, engine)
    }

    /// Apply the sheet and recompute the evaluation's derived fields.
    pub fn from_reader<R: Read>(
        reader: R,
        mut evaluation: Evaluation,
        engine: &ScoringEngine,
    ) -> Result<(Evaluation, ImportSummary), ScoreSheetImportError> {
        let summary = Self::apply_reader(&mut evaluation, reader)?;
        Ok((apply_scoring(engine, evaluation, Utc::now()), summary))
    }

    pub fn apply_reader<R: Read>(
        evaluation: &mut Evaluation,
        reader: R,
    ) -> Result<ImportSummary, ScoreSheetImportError> {
        ScoreSheet::parse(reader)?.apply(evaluation)
    }
}
