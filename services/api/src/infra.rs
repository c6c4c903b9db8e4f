use async_trait::async_trait;
use chrono::Utc;
use formpulse::capture::{
    AnalyticsEvent, AnalyticsSink, Customer, CustomerId, CustomerStore, Form, FormId, FormStore,
    StoreError, Submission, SubmissionId, SubmissionStore, WorkspaceId,
};
use formpulse::pipeline::{HandlerFailure, PipelineEvent, PipelineHandler};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryFormStore {
    forms: Arc<Mutex<HashMap<FormId, Form>>>,
}

impl InMemoryFormStore {
    pub(crate) fn seed(&self, form: Form) {
        let mut guard = self.forms.lock().expect("form mutex poisoned");
        guard.insert(form.id.clone(), form);
    }
}

#[async_trait]
impl FormStore for InMemoryFormStore {
    async fn find(&self, id: &FormId) -> Result<Option<Form>, StoreError> {
        let guard = self.forms.lock().expect("form mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionStore {
    submissions: Arc<Mutex<HashMap<SubmissionId, Submission>>>,
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn insert(&self, submission: Submission) -> Result<Submission, StoreError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        guard.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }

    async fn find(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError> {
        let guard = self.submissions.lock().expect("submission mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn update(&self, submission: Submission) -> Result<Submission, StoreError> {
        let mut guard = self.submissions.lock().expect("submission mutex poisoned");
        if !guard.contains_key(&submission.id) {
            return Err(StoreError::NotFound);
        }
        guard.insert(submission.id.clone(), submission.clone());
        Ok(submission)
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCustomerStore {
    customers: Arc<Mutex<HashMap<(WorkspaceId, String), Customer>>>,
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn find_or_create(
        &self,
        workspace_id: &WorkspaceId,
        email: &str,
        data: BTreeMap<String, serde_json::Value>,
    ) -> Result<Customer, StoreError> {
        let mut guard = self.customers.lock().expect("customer mutex poisoned");
        let key = (workspace_id.clone(), email.to_string());
        if let Some(existing) = guard.get(&key) {
            return Ok(existing.clone());
        }

        let customer = Customer {
            id: CustomerId::generate(),
            workspace_id: workspace_id.clone(),
            email: email.to_string(),
            data,
            created_at: Utc::now(),
        };
        guard.insert(key, customer.clone());
        Ok(customer)
    }
}

/// Pipeline that writes every delivery to the log. Stands in for outbound
/// webhook adapters until real integrations are registered.
pub(crate) struct LoggingPipeline {
    name: String,
}

impl LoggingPipeline {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl PipelineHandler for LoggingPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(
        &self,
        event: PipelineEvent,
        form: &Form,
        submission: &Submission,
    ) -> Result<(), HandlerFailure> {
        info!(
            pipeline = %self.name,
            event = event.label(),
            form = %form.id,
            submission = %submission.id,
            finished = submission.finished,
            "pipeline event delivered"
        );
        Ok(())
    }
}

/// Pipeline that remembers its deliveries, used by the CLI demo to show the
/// dispatch outcome.
#[derive(Default)]
pub(crate) struct RecordingPipeline {
    deliveries: Mutex<Vec<(PipelineEvent, SubmissionId)>>,
}

impl RecordingPipeline {
    pub(crate) fn deliveries(&self) -> Vec<(PipelineEvent, SubmissionId)> {
        self.deliveries
            .lock()
            .expect("delivery mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl PipelineHandler for RecordingPipeline {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(
        &self,
        event: PipelineEvent,
        _form: &Form,
        submission: &Submission,
    ) -> Result<(), HandlerFailure> {
        self.deliveries
            .lock()
            .expect("delivery mutex poisoned")
            .push((event, submission.id.clone()));
        Ok(())
    }
}

/// Analytics sink that logs tracked events instead of shipping them to a
/// product analytics vendor.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TracingAnalytics;

#[async_trait]
impl AnalyticsSink for TracingAnalytics {
    async fn capture(&self, event: AnalyticsEvent) {
        info!(
            event = event.name,
            workspace = %event.workspace_id,
            form = %event.form_id,
            "analytics event"
        );
    }
}
