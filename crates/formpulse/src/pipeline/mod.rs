//! Pipeline dispatch: fans submission lifecycle events out to registered
//! side-effect handlers (webhooks, notifications).
//!
//! The dispatcher is an explicit registry constructed at startup and handed
//! to the capture service; there is no ambient handler state. Failures are
//! isolated per handler and never reach the submitting client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::capture::domain::{Form, FormId, Submission, WorkspaceId};

/// Submission lifecycle events handlers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipelineEvent {
    SubmissionCreated,
    SubmissionUpdated,
    SubmissionFinished,
}

impl PipelineEvent {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineEvent::SubmissionCreated => "submissionCreated",
            PipelineEvent::SubmissionUpdated => "submissionUpdated",
            PipelineEvent::SubmissionFinished => "submissionFinished",
        }
    }
}

/// What a pipeline is attached to: a single form or a whole workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineScope {
    Form(FormId),
    Workspace(WorkspaceId),
}

/// A handler's registered interest: scope plus event tags.
#[derive(Debug, Clone)]
pub struct PipelineSubscription {
    pub scope: PipelineScope,
    pub events: Vec<PipelineEvent>,
}

impl PipelineSubscription {
    pub fn form(form_id: FormId, events: Vec<PipelineEvent>) -> Self {
        Self {
            scope: PipelineScope::Form(form_id),
            events,
        }
    }

    pub fn workspace(workspace_id: WorkspaceId, events: Vec<PipelineEvent>) -> Self {
        Self {
            scope: PipelineScope::Workspace(workspace_id),
            events,
        }
    }

    /// All three lifecycle events for one workspace.
    pub fn workspace_all(workspace_id: WorkspaceId) -> Self {
        Self::workspace(
            workspace_id,
            vec![
                PipelineEvent::SubmissionCreated,
                PipelineEvent::SubmissionUpdated,
                PipelineEvent::SubmissionFinished,
            ],
        )
    }

    pub fn matches(&self, form: &Form, event: PipelineEvent) -> bool {
        let scope_matches = match &self.scope {
            PipelineScope::Form(form_id) => *form_id == form.id,
            PipelineScope::Workspace(workspace_id) => *workspace_id == form.workspace_id,
        };
        scope_matches && self.events.contains(&event)
    }
}

/// A registered side-effect target. Handlers own their retry semantics; the
/// dispatcher reports failures and moves on.
#[async_trait]
pub trait PipelineHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn deliver(
        &self,
        event: PipelineEvent,
        form: &Form,
        submission: &Submission,
    ) -> Result<(), HandlerFailure>;
}

/// Why a single delivery did not complete.
#[derive(Debug, thiserror::Error)]
pub enum HandlerFailure {
    #[error("delivery failed: {0}")]
    Failed(String),
    #[error("delivery timed out")]
    TimedOut,
}

struct RegisteredPipeline {
    subscription: PipelineSubscription,
    handler: Arc<dyn PipelineHandler>,
}

/// Outcome of one dispatch call.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn fully_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One failed delivery within a dispatch call.
#[derive(Debug)]
pub struct DispatchFailure {
    pub pipeline: String,
    pub event: PipelineEvent,
    pub reason: String,
}

const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(5);

/// Explicit registry of pipelines, built at startup.
pub struct PipelineDispatcher {
    pipelines: Vec<RegisteredPipeline>,
    handler_timeout: Duration,
}

impl Default for PipelineDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLER_TIMEOUT)
    }
}

impl PipelineDispatcher {
    pub fn new(handler_timeout: Duration) -> Self {
        Self {
            pipelines: Vec::new(),
            handler_timeout,
        }
    }

    pub fn register(
        &mut self,
        subscription: PipelineSubscription,
        handler: Arc<dyn PipelineHandler>,
    ) {
        self.pipelines.push(RegisteredPipeline {
            subscription,
            handler,
        });
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Deliver each event to every matching pipeline, sequentially. A failed
    /// or timed-out handler is recorded and logged but never aborts the
    /// remaining deliveries.
    pub async fn dispatch(
        &self,
        events: &[PipelineEvent],
        form: &Form,
        submission: &Submission,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();

        for &event in events {
            for pipeline in &self.pipelines {
                if !pipeline.subscription.matches(form, event) {
                    continue;
                }

                let delivery = pipeline.handler.deliver(event, form, submission);
                let outcome = match tokio::time::timeout(self.handler_timeout, delivery).await {
                    Ok(result) => result,
                    Err(_) => Err(HandlerFailure::TimedOut),
                };

                match outcome {
                    Ok(()) => report.delivered += 1,
                    Err(failure) => {
                        warn!(
                            pipeline = pipeline.handler.name(),
                            event = event.label(),
                            submission = %submission.id,
                            %failure,
                            "pipeline delivery failed"
                        );
                        report.failures.push(DispatchFailure {
                            pipeline: pipeline.handler.name().to_string(),
                            event,
                            reason: failure.to_string(),
                        });
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::FormType;
    use chrono::Utc;

    fn form(id: &str, workspace: &str) -> Form {
        Form {
            id: FormId::from(id),
            workspace_id: WorkspaceId::from(workspace),
            label: "Feedback Box".to_string(),
            form_type: FormType::Feedback,
            schema: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn subscription_matches_by_form_scope() {
        let subscription = PipelineSubscription::form(
            FormId::from("f-1"),
            vec![PipelineEvent::SubmissionCreated],
        );

        assert!(subscription.matches(&form("f-1", "w-1"), PipelineEvent::SubmissionCreated));
        assert!(!subscription.matches(&form("f-2", "w-1"), PipelineEvent::SubmissionCreated));
        assert!(!subscription.matches(&form("f-1", "w-1"), PipelineEvent::SubmissionFinished));
    }

    #[test]
    fn subscription_matches_by_workspace_scope() {
        let subscription = PipelineSubscription::workspace_all(WorkspaceId::from("w-1"));

        assert!(subscription.matches(&form("f-1", "w-1"), PipelineEvent::SubmissionUpdated));
        assert!(subscription.matches(&form("f-2", "w-1"), PipelineEvent::SubmissionFinished));
        assert!(!subscription.matches(&form("f-1", "w-2"), PipelineEvent::SubmissionUpdated));
    }

    #[test]
    fn event_labels_use_wire_names() {
        assert_eq!(PipelineEvent::SubmissionCreated.label(), "submissionCreated");
        assert_eq!(
            serde_json::to_value(PipelineEvent::SubmissionFinished).expect("serializes"),
            serde_json::json!("submissionFinished")
        );
    }
}
