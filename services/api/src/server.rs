use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAlertPublisher, InMemoryCriteriaCatalog, InMemoryEvaluationRepository,
};
use crate::routes::with_evaluation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use indica::config::AppConfig;
use indica::error::AppError;
use indica::telemetry;
use indica::workflows::evaluation::{EvaluationService, ScoringEngine};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if args.require_criteria {
        config.scoring.require_criteria = true;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: Arc::new(ScoringEngine::new(config.scoring)),
    };

    let service = Arc::new(EvaluationService::new(
        Arc::new(InMemoryEvaluationRepository::default()),
        Arc::new(InMemoryCriteriaCatalog::default()),
        Arc::new(InMemoryAlertPublisher::default()),
        config.scoring,
    ));

    let app = with_evaluation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        require_criteria = config.scoring.require_criteria,
        "evaluation scoring service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
