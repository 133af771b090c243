use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;

use super::domain::{ApplicationId, CriterionId, Evaluation, EvaluationId, EvaluatorId};
use super::repository::{AlertPublisher, CriteriaCatalog, EvaluationRepository, EvaluationView};
use super::service::{EvaluationService, EvaluationServiceError, ScoreUpdate};

type SharedService<R, C, A> = Arc<EvaluationService<R, C, A>>;

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) application_id: ApplicationId,
    pub(crate) evaluator_id: EvaluatorId,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentsRequest {
    #[serde(default)]
    pub(crate) comments: String,
}

/// Router exposing the evaluation write path.
pub fn evaluation_router<R, C, A>(service: SharedService<R, C, A>) -> Router
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    Router::new()
        .route("/api/v1/evaluations", post(assign_handler::<R, C, A>))
        .route(
            "/api/v1/evaluations/:evaluation_id",
            get(evaluation_handler::<R, C, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/criteria/:criteria_id",
            put(score_handler::<R, C, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/comments",
            put(comments_handler::<R, C, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/reopen",
            post(reopen_handler::<R, C, A>),
        )
        .route(
            "/api/v1/evaluations/:evaluation_id/sheet",
            post(sheet_handler::<R, C, A>),
        )
        .route(
            "/api/v1/applications/:application_id/score",
            get(summary_handler::<R, C, A>),
        )
        .with_state(service)
}

pub(crate) async fn assign_handler<R, C, A>(
    State(service): State<SharedService<R, C, A>>,
    axum::Json(request): axum::Json<AssignRequest>,
) -> Response
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    match service.assign(request.application_id, request.evaluator_id) {
        Ok(evaluation) => (
            StatusCode::CREATED,
            axum::Json(EvaluationView::from(&evaluation)),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn evaluation_handler<R, C, A>(
    State(service): State<SharedService<R, C, A>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    match service.get(&EvaluationId(evaluation_id)) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_handler<R, C, A>(
    State(service): State<SharedService<R, C, A>>,
    Path((evaluation_id, criteria_id)): Path<(String, String)>,
    axum::Json(update): axum::Json<ScoreUpdate>,
) -> Response
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    let result = service.record_score(
        &EvaluationId(evaluation_id),
        &CriterionId(criteria_id),
        update,
    );
    view_response(result)
}

pub(crate) async fn comments_handler<R, C, A>(
    State(service): State<SharedService<R, C, A>>,
    Path(evaluation_id): Path<String>,
    axum::Json(request): axum::Json<CommentsRequest>,
) -> Response
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    view_response(service.update_comments(&EvaluationId(evaluation_id), request.comments))
}

pub(crate) async fn reopen_handler<R, C, A>(
    State(service): State<SharedService<R, C, A>>,
    Path(evaluation_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    view_response(service.reopen(&EvaluationId(evaluation_id)))
}

pub(crate) async fn sheet_handler<R, C, A>(
    State(service): State<SharedService<R, C, A>>,
    Path(evaluation_id): Path<String>,
    body: String,
) -> Response
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    match service.import_scores(&EvaluationId(evaluation_id), body.as_bytes()) {
        Ok((evaluation, summary)) => {
            let payload = json!({
                "evaluation": EvaluationView::from(&evaluation),
                "applied": summary.applied,
                "ignored": summary.ignored,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn summary_handler<R, C, A>(
    State(service): State<SharedService<R, C, A>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    match service.application_summary(&ApplicationId(application_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

fn view_response(result: Result<Evaluation, EvaluationServiceError>) -> Response {
    match result {
        Ok(evaluation) => {
            (StatusCode::OK, axum::Json(EvaluationView::from(&evaluation))).into_response()
        }
        Err(error) => error_response(error),
    }
}

fn error_response(error: EvaluationServiceError) -> Response {
    AppError::from(error).into_response()
}
