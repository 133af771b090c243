use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::evaluation::domain::{
    ApplicationId, CriterionDefinition, CriterionId, CriterionScore, Evaluation, EvaluationId,
    EvaluationStatus, EvaluatorId,
};
use crate::workflows::evaluation::repository::{
    AlertError, AlertPublisher, CatalogError, CriteriaCatalog, EvaluationAlert,
    EvaluationRepository, RepositoryError,
};
use crate::workflows::evaluation::{evaluation_router, EvaluationService, ScoringConfig};

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn criterion(id: &str, score: Option<f64>, weight: f64) -> CriterionScore {
    CriterionScore {
        criteria_id: CriterionId(id.to_string()),
        name: format!("Criterion {id}"),
        score,
        weight,
        comments: String::new(),
    }
}

pub(super) fn evaluation_with(criteria: Vec<CriterionScore>) -> Evaluation {
    Evaluation {
        id: EvaluationId("eval-test".to_string()),
        application_id: ApplicationId("app-001".to_string()),
        evaluator_id: EvaluatorId("evaluator-ana".to_string()),
        criteria_scores: criteria,
        total_score: 0.0,
        comments: String::new(),
        status: EvaluationStatus::Pending,
        completed_at: None,
        created_at: fixed_now(),
        updated_at: fixed_now(),
        version: 0,
    }
}

/// Criteria of the sample cultural notice used across tests.
pub(super) fn notice_criteria() -> Vec<CriterionDefinition> {
    vec![
        CriterionDefinition {
            criteria_id: CriterionId("relevance".to_string()),
            name: "Cultural relevance".to_string(),
            weight: 3.0,
        },
        CriterionDefinition {
            criteria_id: CriterionId("feasibility".to_string()),
            name: "Budget feasibility".to_string(),
            weight: 2.0,
        },
    ]
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<EvaluationId, Evaluation>>>,
}

impl EvaluationRepository for MemoryRepository {
    fn insert(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let duplicate = guard.values().any(|stored| {
            stored.id == evaluation.id
                || (stored.application_id == evaluation.application_id
                    && stored.evaluator_id == evaluation.evaluator_id)
        });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(evaluation.id.clone(), evaluation.clone());
        Ok(evaluation)
    }

    fn update(&self, mut evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard.get(&evaluation.id).ok_or(RepositoryError::NotFound)?;
        if stored.version != evaluation.version {
            return Err(RepositoryError::Conflict);
        }
        evaluation.version += 1;
        guard.insert(evaluation.id.clone(), evaluation.clone());
        Ok(evaluation)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Evaluation>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|evaluation| &evaluation.application_id == application_id)
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
pub(super) struct MemoryCatalog {
    criteria: HashMap<ApplicationId, Vec<CriterionDefinition>>,
}

impl MemoryCatalog {
    pub(super) fn with(application: &str, criteria: Vec<CriterionDefinition>) -> Self {
        let mut map = HashMap::new();
        map.insert(ApplicationId(application.to_string()), criteria);
        Self { criteria: map }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::with("app-001", notice_criteria())
    }
}

impl CriteriaCatalog for MemoryCatalog {
    fn criteria_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<CriterionDefinition>, CatalogError> {
        self.criteria
            .get(application_id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownApplication(application_id.clone()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<EvaluationAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<EvaluationAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: EvaluationAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl EvaluationRepository for UnavailableRepository {
    fn insert(&self, _evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn for_application(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Vec<Evaluation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Repository that lets another writer land between a read and the next
/// update, `interleaved` times in total.
pub(super) struct ContendedRepository {
    pub(super) inner: MemoryRepository,
    interleaved: Mutex<usize>,
    competing_write: fn(&mut Evaluation),
}

impl ContendedRepository {
    pub(super) fn new(interleaved: usize, competing_write: fn(&mut Evaluation)) -> Self {
        Self {
            inner: MemoryRepository::default(),
            interleaved: Mutex::new(interleaved),
            competing_write,
        }
    }
}

impl EvaluationRepository for ContendedRepository {
    fn insert(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        self.inner.insert(evaluation)
    }

    fn update(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut remaining = self.interleaved.lock().expect("contention mutex poisoned");
        if *remaining > 0 {
            *remaining -= 1;
            let mut competing = self
                .inner
                .fetch(&evaluation.id)?
                .ok_or(RepositoryError::NotFound)?;
            (self.competing_write)(&mut competing);
            self.inner.update(competing)?;
        }
        drop(remaining);
        self.inner.update(evaluation)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Evaluation>, RepositoryError> {
        self.inner.for_application(application_id)
    }
}

/// Alert transport that is always down.
#[derive(Default, Clone)]
pub(super) struct OfflineAlerts;

impl AlertPublisher for OfflineAlerts {
    fn publish(&self, _alert: EvaluationAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) type TestService = EvaluationService<MemoryRepository, MemoryCatalog, MemoryAlerts>;

pub(super) fn build_service() -> (TestService, Arc<MemoryRepository>, Arc<MemoryAlerts>) {
    build_service_with(ScoringConfig::default())
}

pub(super) fn build_service_with(
    config: ScoringConfig,
) -> (TestService, Arc<MemoryRepository>, Arc<MemoryAlerts>) {
    let repository = Arc::new(MemoryRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = EvaluationService::new(
        repository.clone(),
        Arc::new(MemoryCatalog::default()),
        alerts.clone(),
        config,
    );
    (service, repository, alerts)
}

pub(super) fn evaluation_router_with_service(service: TestService) -> axum::Router {
    evaluation_router(Arc::new(service))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
