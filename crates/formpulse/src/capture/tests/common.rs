//! Shared fixtures for capture service and router tests: in-memory stores
//! and instrumented pipeline handlers.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::capture::domain::{
    Customer, CustomerId, Form, FormId, FormType, Submission, SubmissionId, WorkspaceId,
};
use crate::capture::service::{CaptureOptions, NoopAnalytics, SubmissionService};
use crate::capture::store::{CustomerStore, FormStore, StoreError, SubmissionStore};
use crate::pipeline::{
    HandlerFailure, PipelineDispatcher, PipelineEvent, PipelineHandler, PipelineSubscription,
};
use crate::schema::FormSchema;

#[derive(Default, Clone)]
pub(super) struct MemoryForms {
    forms: Arc<Mutex<HashMap<FormId, Form>>>,
}

impl MemoryForms {
    pub(super) fn seed(&self, form: Form) {
        let mut guard = self.forms.lock().expect("form mutex poisoned");
        guard.insert(form.id.clone(), form);
    }
}

#[async_trait]
impl FormStore for MemoryForms {
    async fn find(&self, id: &FormId) -> Result<Option<Form>, StoreError> {
        let guard = self.forms.lock().expect("form mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemorySubmissions {
    submissions: Arc<Mutex<HashMap<SubmissionId, Submission>>>,
}

#[async_trait]
impl SubmissionStore for MemorySubmissions {
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
pub(super) struct MemoryCustomers {
    customers: Arc<Mutex<HashMap<(WorkspaceId, String), Customer>>>,
}

#[async_trait]
impl CustomerStore for MemoryCustomers {
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

/// Handler that records every delivery it receives.
#[derive(Default)]
pub(super) struct RecordingHandler {
    deliveries: Mutex<Vec<(PipelineEvent, SubmissionId)>>,
}

impl RecordingHandler {
    pub(super) fn deliveries(&self) -> Vec<(PipelineEvent, SubmissionId)> {
        self.deliveries
            .lock()
            .expect("delivery mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl PipelineHandler for RecordingHandler {
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

/// Handler that always fails.
pub(super) struct FailingHandler;

#[async_trait]
impl PipelineHandler for FailingHandler {
    fn name(&self) -> &str {
        "failing"
    }

    async fn deliver(
        &self,
        _event: PipelineEvent,
        _form: &Form,
        _submission: &Submission,
    ) -> Result<(), HandlerFailure> {
        Err(HandlerFailure::Failed("webhook endpoint returned 500".to_string()))
    }
}

pub(super) fn feedback_form(id: &str, workspace: &str) -> Form {
    Form {
        id: FormId::from(id),
        workspace_id: WorkspaceId::from(workspace),
        label: "Feedback Box".to_string(),
        form_type: FormType::Feedback,
        schema: Some(FormSchema::feedback()),
        created_at: Utc::now(),
    }
}

pub(super) struct Harness {
    pub(super) forms: Arc<MemoryForms>,
    pub(super) recorder: Arc<RecordingHandler>,
    pub(super) service: Arc<SubmissionService<MemoryForms, MemorySubmissions, MemoryCustomers>>,
}

/// Service over in-memory stores with a workspace-wide recording pipeline,
/// plus any extra handlers registered ahead of it.
pub(super) fn harness(
    options: CaptureOptions,
    extra_handlers: Vec<Arc<dyn PipelineHandler>>,
) -> Harness {
    let forms = Arc::new(MemoryForms::default());
    forms.seed(feedback_form("form-1", "workspace-1"));

    let submissions = Arc::new(MemorySubmissions::default());
    let customers = Arc::new(MemoryCustomers::default());
    let recorder = Arc::new(RecordingHandler::default());

    let mut dispatcher = PipelineDispatcher::new(Duration::from_millis(100));
    for handler in extra_handlers {
        dispatcher.register(
            PipelineSubscription::workspace_all(WorkspaceId::from("workspace-1")),
            handler,
        );
    }
    dispatcher.register(
        PipelineSubscription::workspace_all(WorkspaceId::from("workspace-1")),
        recorder.clone(),
    );

    let service = Arc::new(SubmissionService::with_options(
        forms.clone(),
        submissions,
        customers,
        Arc::new(dispatcher),
        Arc::new(NoopAnalytics),
        options,
    ));

    Harness {
        forms,
        recorder,
        service,
    }
}
