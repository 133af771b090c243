use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use indica::workflows::evaluation::{
    evaluation_router, AlertPublisher, CriteriaCatalog, Evaluation, EvaluationRepository,
    EvaluationService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_evaluation_routes<R, C, A>(
    service: Arc<EvaluationService<R, C, A>>,
) -> axum::Router
where
    R: EvaluationRepository + 'static,
    C: CriteriaCatalog + 'static,
    A: AlertPublisher + 'static,
{
    evaluation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/evaluations/recompute",
            axum::routing::post(recompute_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Run the scoring engine over a caller-supplied evaluation without storing it.
pub(crate) async fn recompute_endpoint(
    Extension(state): Extension<AppState>,
    Json(evaluation): Json<Evaluation>,
) -> Json<Evaluation> {
    Json(state.engine.recompute(evaluation))
}
