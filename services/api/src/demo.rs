use crate::infra::{
    default_notice_criteria, InMemoryAlertPublisher, InMemoryCriteriaCatalog,
    InMemoryEvaluationRepository,
};
use chrono::Utc;
use clap::Args;
use indica::error::AppError;
use indica::workflows::evaluation::{
    apply_scoring, ApplicationId, CriterionId, Evaluation, EvaluationService,
    EvaluationServiceError, EvaluatorId, ScoreSheetImporter, ScoreUpdate, ScoringConfig,
    ScoringEngine,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Evaluation document (JSON) to recompute
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Optional CSV score sheet applied before recomputing
    #[arg(long)]
    pub(crate) sheet: Option<PathBuf>,
    /// Keep evaluations without criteria pending instead of completing them
    #[arg(long)]
    pub(crate) require_criteria: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional CSV score sheet for the second evaluator
    #[arg(long)]
    pub(crate) sheet: Option<PathBuf>,
    /// Keep evaluations without criteria pending instead of completing them
    #[arg(long)]
    pub(crate) require_criteria: bool,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        input,
        sheet,
        require_criteria,
    } = args;

    let engine = ScoringEngine::new(ScoringConfig { require_criteria });
    let evaluation: Evaluation = serde_json::from_reader(BufReader::new(File::open(input)?))?;

    let evaluation = match sheet {
        Some(path) => {
            let (evaluation, summary) = ScoreSheetImporter::from_path(path, evaluation, &engine)?;
            eprintln!(
                "score sheet: {} rows applied, {} ignored",
                summary.applied, summary.ignored
            );
            evaluation
        }
        None => apply_scoring(&engine, evaluation, Utc::now()),
    };

    println!("{}", serde_json::to_string_pretty(&evaluation)?);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        sheet,
        require_criteria,
    } = args;

    let repository = Arc::new(InMemoryEvaluationRepository::default());
    let alerts = Arc::new(InMemoryAlertPublisher::default());
    let catalog = Arc::new(InMemoryCriteriaCatalog::default());
    let application = ApplicationId("app-2025-017".to_string());
    catalog
        .register(application.clone(), default_notice_criteria())
        .map_err(EvaluationServiceError::from)?;
    let service = EvaluationService::new(
        repository,
        catalog,
        alerts.clone(),
        ScoringConfig { require_criteria },
    );

    println!("INDICA evaluation demo");
    println!("\nApplication {}", application.0);

    let first = service.assign(application.clone(), EvaluatorId("evaluator-ana".to_string()))?;
    println!(
        "- Assigned {} to {} ({} criteria, status {})",
        first.evaluator_id.0,
        first.id.0,
        first.criteria_scores.len(),
        first.status.label()
    );

    let scores = [
        ("relevance", 8.5, "Strong local heritage angle"),
        ("feasibility", 7.0, "Budget is tight but realistic"),
        ("reach", 6.0, "Limited outreach plan"),
    ];
    let mut current = first;
    for (criteria_id, score, comments) in scores {
        current = service.record_score(
            &current.id,
            &CriterionId(criteria_id.to_string()),
            ScoreUpdate {
                score: Some(score),
                comments: Some(comments.to_string()),
            },
        )?;
        println!(
            "  - {criteria_id} = {score:.1} -> total {:.2} ({})",
            current.total_score,
            current.status.label()
        );
    }

    let second = service.assign(application.clone(), EvaluatorId("evaluator-rui".to_string()))?;
    let second = match sheet {
        Some(path) => {
            let (evaluation, summary) = service.import_scores(&second.id, File::open(path)?)?;
            println!(
                "- Score sheet for {}: {} rows applied, {} ignored",
                evaluation.evaluator_id.0, summary.applied, summary.ignored
            );
            evaluation
        }
        None => {
            let sheet = "Criteria ID,Score,Comments\n\
relevance,9,Excellent fit with the notice\n\
feasibility,6.5,\n\
reach,7,\n";
            let (evaluation, summary) = service.import_scores(&second.id, sheet.as_bytes())?;
            println!(
                "- Built-in score sheet for {}: {} rows applied",
                evaluation.evaluator_id.0, summary.applied
            );
            evaluation
        }
    };
    println!(
        "  Total {:.2} ({})",
        second.total_score,
        second.status.label()
    );

    let reopened = service.reopen(&second.id)?;
    println!("- Reopened {} -> {}", reopened.id.0, reopened.status.label());
    let rescored = service.record_score(
        &reopened.id,
        &CriterionId("reach".to_string()),
        ScoreUpdate {
            score: Some(8.0),
            comments: None,
        },
    )?;
    println!(
        "  Rescored reach -> total {:.2} ({})",
        rescored.total_score,
        rescored.status.label()
    );

    let summary = service.application_summary(&application)?;
    println!(
        "\nSummary: {} evaluations, {} completed, average {}",
        summary.evaluations,
        summary.completed,
        summary
            .average_total
            .map(|value| format!("{value:.2}"))
            .unwrap_or_else(|| "n/a".to_string())
    );

    let events = alerts.events();
    if events.is_empty() {
        println!("Alerts: none dispatched");
    } else {
        println!("Alerts:");
        for alert in events {
            let total = alert
                .details
                .get("total_score")
                .map(String::as_str)
                .unwrap_or("-");
            println!(
                "  - template={} -> {} (total {total})",
                alert.template, alert.evaluation_id.0
            );
        }
    }

    Ok(())
}
