//! Submission merge service: the sole writer to submissions and customers
//! on the capture path.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::pipeline::{PipelineDispatcher, PipelineEvent};
use crate::schema::{ValidationEngine, ValidationError};

use super::domain::{
    CustomerId, CustomerPayload, Form, FormId, Submission, SubmissionId, SubmissionMeta,
    SubmissionPayload,
};
use super::store::{CustomerStore, FormStore, StoreError, SubmissionStore};

/// Behavior switches for the capture path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureOptions {
    /// Re-check incoming data values against the form's schema rules.
    /// Off by default: clients validate before upserting, and partial
    /// payloads must not trip `required` rules for pages not yet reached.
    pub revalidate: bool,
}

/// Fire-and-forget product analytics seam. Tracking never delays or fails
/// the capture response; the service spawns these calls and moves on.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn capture(&self, event: AnalyticsEvent);
}

/// A single tracked product event.
#[derive(Debug, Clone)]
pub struct AnalyticsEvent {
    pub name: &'static str,
    pub workspace_id: crate::capture::domain::WorkspaceId,
    pub form_id: FormId,
}

/// Sink that drops every event; useful for tests and the renderer demo.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

#[async_trait]
impl AnalyticsSink for NoopAnalytics {
    async fn capture(&self, _event: AnalyticsEvent) {}
}

/// Reconciles incoming submission payloads against stored state, links
/// customers, and fans lifecycle events out through the dispatcher.
///
/// Ordering per request: customer resolution, then submission upsert, then
/// awaited pipeline dispatch, then spawned analytics. The HTTP response
/// reflects pipeline completion, not analytics completion.
pub struct SubmissionService<F, S, C> {
    forms: Arc<F>,
    submissions: Arc<S>,
    customers: Arc<C>,
    dispatcher: Arc<PipelineDispatcher>,
    analytics: Arc<dyn AnalyticsSink>,
    engine: ValidationEngine,
    options: CaptureOptions,
}

impl<F, S, C> SubmissionService<F, S, C>
where
    F: FormStore + 'static,
    S: SubmissionStore + 'static,
    C: CustomerStore + 'static,
{
    pub fn new(
        forms: Arc<F>,
        submissions: Arc<S>,
        customers: Arc<C>,
        dispatcher: Arc<PipelineDispatcher>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self::with_options(
            forms,
            submissions,
            customers,
            dispatcher,
            analytics,
            CaptureOptions::default(),
        )
    }

    pub fn with_options(
        forms: Arc<F>,
        submissions: Arc<S>,
        customers: Arc<C>,
        dispatcher: Arc<PipelineDispatcher>,
        analytics: Arc<dyn AnalyticsSink>,
        options: CaptureOptions,
    ) -> Self {
        Self {
            forms,
            submissions,
            customers,
            dispatcher,
            analytics,
            engine: ValidationEngine::new(),
            options,
        }
    }

    /// Create a new submission for `form_id`, possibly partial.
    pub async fn create_submission(
        &self,
        form_id: &FormId,
        payload: SubmissionPayload,
        meta: SubmissionMeta,
    ) -> Result<Submission, CaptureError> {
        let form = self.require_form(form_id).await?;

        let data = payload.data.unwrap_or_default();
        if self.options.revalidate {
            self.check_against_schema(&form, &data)?;
        }

        // Customer resolution happens before the upsert so the stored
        // submission can reference the resolved id.
        let customer_id = self.link_customer(&form, payload.customer.as_ref()).await?;

        let now = Utc::now();
        let finished = payload.finished.unwrap_or(false);
        let submission = Submission {
            id: SubmissionId::generate(),
            form_id: form.id.clone(),
            data,
            finished,
            customer_id,
            meta,
            created_at: now,
            updated_at: now,
        };

        let stored = self.submissions.insert(submission).await?;

        // The finished event belongs to the update path; a create only ever
        // announces itself, even when the payload already sets the flag.
        self.dispatcher
            .dispatch(&[PipelineEvent::SubmissionCreated], &form, &stored)
            .await;
        self.track(&form, "submission received");

        Ok(stored)
    }

    /// Merge a payload into an existing submission.
    ///
    /// Data merges shallowly: incoming keys win, stored keys survive when
    /// absent from the payload. `finished` is monotonic; a payload can set
    /// it but never clear it.
    pub async fn update_submission(
        &self,
        form_id: &FormId,
        submission_id: &SubmissionId,
        payload: SubmissionPayload,
        meta: SubmissionMeta,
    ) -> Result<Submission, CaptureError> {
        let form = self.require_form(form_id).await?;

        let mut submission = self
            .submissions
            .find(submission_id)
            .await?
            .ok_or_else(|| CaptureError::SubmissionNotFound(submission_id.clone()))?;

        let has_data = payload.data.is_some();
        if let Some(data) = payload.data {
            if self.options.revalidate {
                self.check_against_schema(&form, &data)?;
            }
            submission.data.extend(data);
        }

        let finishing = payload.finished.unwrap_or(false);
        if finishing {
            submission.finished = true;
        }

        if let Some(customer_id) = self.link_customer(&form, payload.customer.as_ref()).await? {
            submission.customer_id = Some(customer_id);
        }

        submission.meta = meta;
        submission.updated_at = Utc::now();

        let stored = self.submissions.update(submission).await?;

        let mut events = Vec::new();
        if has_data {
            events.push(PipelineEvent::SubmissionUpdated);
        }
        if finishing {
            events.push(PipelineEvent::SubmissionFinished);
        }
        if !events.is_empty() {
            self.dispatcher.dispatch(&events, &form, &stored).await;
        }
        self.track(
            &form,
            if finishing {
                "submission finished"
            } else {
                "submission updated"
            },
        );

        Ok(stored)
    }

    async fn require_form(&self, form_id: &FormId) -> Result<Form, CaptureError> {
        self.forms
            .find(form_id)
            .await?
            .ok_or_else(|| CaptureError::FormNotFound(form_id.clone()))
    }

    /// Resolve or create the workspace-scoped customer when the payload
    /// carries an email. The email is kept out of the free-form data block.
    async fn link_customer(
        &self,
        form: &Form,
        customer: Option<&CustomerPayload>,
    ) -> Result<Option<CustomerId>, CaptureError> {
        let Some(payload) = customer else {
            return Ok(None);
        };
        let Some(email) = payload.email.as_deref() else {
            return Ok(None);
        };

        let customer = self
            .customers
            .find_or_create(&form.workspace_id, email, payload.data.clone())
            .await?;
        Ok(Some(customer.id))
    }

    /// Check supplied values against the schema's declared rules. Only keys
    /// present in the payload are checked, so partial captures never trip
    /// `required` rules for untouched elements.
    fn check_against_schema(
        &self,
        form: &Form,
        data: &BTreeMap<String, String>,
    ) -> Result<(), CaptureError> {
        let Some(schema) = form.schema.as_ref() else {
            return Ok(());
        };

        for (name, value) in data {
            if let Some(element) = schema.input_element(name) {
                self.engine
                    .validate(element, Some(value), data)
                    .map_err(CaptureError::InvalidData)?;
            }
        }
        Ok(())
    }

    fn track(&self, form: &Form, name: &'static str) {
        let sink = Arc::clone(&self.analytics);
        let event = AnalyticsEvent {
            name,
            workspace_id: form.workspace_id.clone(),
            form_id: form.id.clone(),
        };
        tokio::spawn(async move {
            sink.capture(event).await;
        });
    }
}

/// Errors surfaced by the capture path.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Form not found")]
    FormNotFound(FormId),
    #[error("Submission not found")]
    SubmissionNotFound(SubmissionId),
    #[error("{0}")]
    InvalidData(ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
