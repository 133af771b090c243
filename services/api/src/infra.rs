use indica::workflows::evaluation::{
    AlertError, AlertPublisher, ApplicationId, CatalogError, CriteriaCatalog, CriterionDefinition,
    CriterionId, Evaluation, EvaluationAlert, EvaluationId, EvaluationRepository,
    RepositoryError, ScoringEngine,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<ScoringEngine>,
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("evaluation store lock poisoned".to_string())
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryEvaluationRepository {
    records: Arc<Mutex<HashMap<EvaluationId, Evaluation>>>,
}

impl InMemoryEvaluationRepository {
    fn guard(&self) -> Result<MutexGuard<'_, HashMap<EvaluationId, Evaluation>>, RepositoryError> {
        self.records.lock().map_err(poisoned)
    }
}

impl EvaluationRepository for InMemoryEvaluationRepository {
    fn insert(&self, evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.guard()?;
        let taken = guard.values().any(|stored| {
            stored.id == evaluation.id
                || (stored.application_id == evaluation.application_id
                    && stored.evaluator_id == evaluation.evaluator_id)
        });
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(evaluation.id.clone(), evaluation.clone());
        Ok(evaluation)
    }

    fn update(&self, mut evaluation: Evaluation) -> Result<Evaluation, RepositoryError> {
        let mut guard = self.guard()?;
        let stored = guard
            .get_mut(&evaluation.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != evaluation.version {
            return Err(RepositoryError::Conflict);
        }
        evaluation.version += 1;
        *stored = evaluation.clone();
        Ok(evaluation)
    }

    fn fetch(&self, id: &EvaluationId) -> Result<Option<Evaluation>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Evaluation>, RepositoryError> {
        let guard = self.guard()?;
        let mut evaluations: Vec<Evaluation> = guard
            .values()
            .filter(|evaluation| &evaluation.application_id == application_id)
            .cloned()
            .collect();
        evaluations.sort_by(|left, right| left.id.0.cmp(&right.id.0));
        Ok(evaluations)
    }
}

/// Notice criteria keyed by application; unregistered applications fall
/// back to the default notice when one is configured.
#[derive(Clone)]
pub(crate) struct InMemoryCriteriaCatalog {
    notices: Arc<Mutex<HashMap<ApplicationId, Vec<CriterionDefinition>>>>,
    fallback: Option<Vec<CriterionDefinition>>,
}

impl Default for InMemoryCriteriaCatalog {
    fn default() -> Self {
        Self {
            notices: Arc::new(Mutex::new(HashMap::new())),
            fallback: Some(default_notice_criteria()),
        }
    }
}

impl InMemoryCriteriaCatalog {
    pub(crate) fn register(
        &self,
        application_id: ApplicationId,
        criteria: Vec<CriterionDefinition>,
    ) -> Result<(), CatalogError> {
        let mut guard = self
            .notices
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        guard.insert(application_id, criteria);
        Ok(())
    }
}

impl CriteriaCatalog for InMemoryCriteriaCatalog {
    fn criteria_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<CriterionDefinition>, CatalogError> {
        let guard = self
            .notices
            .lock()
            .map_err(|_| CatalogError::Unavailable("catalog lock poisoned".to_string()))?;
        guard
            .get(application_id)
            .cloned()
            .or_else(|| self.fallback.clone())
            .ok_or_else(|| CatalogError::UnknownApplication(application_id.clone()))
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<EvaluationAlert>>>,
}

impl AlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: EvaluationAlert) -> Result<(), AlertError> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| AlertError::Transport("alert queue lock poisoned".to_string()))?;
        guard.push(alert);
        Ok(())
    }
}

impl InMemoryAlertPublisher {
    pub(crate) fn events(&self) -> Vec<EvaluationAlert> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Criteria of the standard cultural funding notice.
pub(crate) fn default_notice_criteria() -> Vec<CriterionDefinition> {
    [
        ("relevance", "Cultural relevance", 3.0),
        ("feasibility", "Budget feasibility", 2.0),
        ("reach", "Community reach", 1.0),
    ]
    .into_iter()
    .map(|(id, name, weight)| CriterionDefinition {
        criteria_id: CriterionId(id.to_string()),
        name: name.to_string(),
        weight,
    })
    .collect()
}
