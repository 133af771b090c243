use super::common::*;
use std::io::Cursor;

use crate::workflows::evaluation::domain::EvaluationStatus;
use crate::workflows::evaluation::{
    ScoreSheet, ScoreSheetImportError, ScoreSheetImporter, ScoringEngine, ValidationError,
};

fn seeded() -> crate::workflows::evaluation::Evaluation {
    evaluation_with(vec![
        criterion("relevance", None, 3.0),
        criterion("feasibility", None, 2.0),
    ])
}

#[test]
fn sheet_scores_and_completes_matching_criteria() {
    let csv = "Criteria ID,Name,Score,Weight,Comments\n\
relevance,Cultural relevance,8,,Good fit\n\
feasibility,Budget feasibility,6,,\n";

    let (evaluation, summary) =
        ScoreSheetImporter::from_reader(Cursor::new(csv), seeded(), &ScoringEngine::default())
            .expect("sheet applies");

    assert_eq!(summary.applied, 2);
    assert_eq!(summary.ignored, 0);
    assert_eq!(evaluation.total_score, 7.2);
    assert_eq!(evaluation.status, EvaluationStatus::Completed);
    assert_eq!(evaluation.criteria_scores[0].comments, "Good fit");
}

#[test]
fn unknown_and_repeated_rows_are_ignored() {
    let csv = "Criteria ID,Score\nrelevance,5\ninnovation,9\nrelevance,1\n";

    let (evaluation, summary) =
        ScoreSheetImporter::from_reader(Cursor::new(csv), seeded(), &ScoringEngine::default())
            .expect("sheet applies");

    assert_eq!(summary.applied, 1);
    assert_eq!(summary.ignored, 2);
    assert_eq!(evaluation.criteria_scores.len(), 2);
    assert_eq!(evaluation.criteria_scores[0].score, Some(5.0));
    assert_eq!(evaluation.status, EvaluationStatus::InProgress);
}

#[test]
fn blank_score_leaves_criterion_unscored() {
    let csv = "Criteria ID,Score,Weight\nrelevance, ,4\n";

    let (evaluation, _) =
        ScoreSheetImporter::from_reader(Cursor::new(csv), seeded(), &ScoringEngine::default())
            .expect("sheet applies");

    assert!(evaluation.criteria_scores[0].score.is_none());
    assert_eq!(evaluation.criteria_scores[0].weight, 3.0);
    assert_eq!(evaluation.status, EvaluationStatus::Pending);
    assert_eq!(evaluation.total_score, 0.0);
}

#[test]
fn invalid_row_rejects_whole_sheet() {
    let csv = "Criteria ID,Score\nrelevance,8\nfeasibility,14\n";
    let mut evaluation = seeded();

    match ScoreSheetImporter::apply_reader(&mut evaluation, Cursor::new(csv)) {
        Err(ScoreSheetImportError::Validation(ValidationError::ScoreOutOfRange {
            score, ..
        })) => assert_eq!(score, 14.0),
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(evaluation.criteria_scores[0].score.is_none());
}

#[test]
fn malformed_numbers_surface_as_csv_errors() {
    let csv = "Criteria ID,Score\nrelevance,eight\n";
    let mut evaluation = seeded();

    let result = ScoreSheetImporter::apply_reader(&mut evaluation, Cursor::new(csv));

    assert!(matches!(result, Err(ScoreSheetImportError::Csv(_))));
}

#[test]
fn sheet_weights_never_override_notice_weights() {
    let csv = "Criteria ID,Score,Weight\nrelevance,8,100\nfeasibility,6,0\n";

    let (evaluation, summary) =
        ScoreSheetImporter::from_reader(Cursor::new(csv), seeded(), &ScoringEngine::default())
            .expect("sheet applies");

    assert_eq!(summary.applied, 2);
    assert_eq!(evaluation.criteria_scores[0].weight, 3.0);
    assert_eq!(evaluation.criteria_scores[1].weight, 2.0);
    // (8 * 3 + 6 * 2) / 5 with the notice weights
    assert_eq!(evaluation.total_score, 7.2);
}

#[test]
fn parsed_sheet_can_be_reapplied_to_a_fresh_read() {
    let sheet = ScoreSheet::parse(Cursor::new("Criteria ID,Score\nrelevance,9\n"))
        .expect("sheet parses");

    let mut first = seeded();
    let mut second = seeded();
    sheet.apply(&mut first).expect("first apply");
    let summary = sheet.apply(&mut second).expect("second apply");

    assert_eq!(summary.applied, 1);
    assert_eq!(first, second);
}
