use crate::infra::{
    InMemoryCustomerStore, InMemoryFormStore, InMemorySubmissionStore, RecordingPipeline,
};
use chrono::Utc;
use clap::Args;
use formpulse::capture::{
    Form, FormId, FormType, NoopAnalytics, SubmissionMeta, SubmissionService, WorkspaceId,
};
use formpulse::error::AppError;
use formpulse::pipeline::{PipelineDispatcher, PipelineSubscription};
use formpulse::renderer::{Advance, FormRenderer};
use formpulse::schema::{FormSchema, ValidationEngine};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Feedback type entered on the first page.
    #[arg(long, default_value = "idea")]
    pub(crate) feedback_type: String,
    /// Message entered on the second page.
    #[arg(long, default_value = "The feedback box is great.")]
    pub(crate) message: String,
    /// Leave the form after the first page instead of finishing it.
    #[arg(long)]
    pub(crate) abandon: bool,
}

/// Drive the renderer through the canonical feedback form against a live
/// capture service, printing each upsert and the resulting pipeline events.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        feedback_type,
        message,
        abandon,
    } = args;

    let form_id = FormId::from("feedback-box");
    let workspace_id = WorkspaceId::from("demo-workspace");

    let forms = Arc::new(InMemoryFormStore::default());
    forms.seed(Form {
        id: form_id.clone(),
        workspace_id: workspace_id.clone(),
        label: "Feedback Box".to_string(),
        form_type: FormType::Feedback,
        schema: Some(FormSchema::feedback()),
        created_at: Utc::now(),
    });

    let recorder = Arc::new(RecordingPipeline::default());
    let mut dispatcher = PipelineDispatcher::default();
    dispatcher.register(
        PipelineSubscription::workspace_all(workspace_id),
        recorder.clone(),
    );

    let service = SubmissionService::new(
        forms,
        Arc::new(InMemorySubmissionStore::default()),
        Arc::new(InMemoryCustomerStore::default()),
        Arc::new(dispatcher),
        Arc::new(NoopAnalytics),
    );

    println!("Submission capture demo");

    let mut renderer = match FormRenderer::new(FormSchema::feedback(), ValidationEngine::new()) {
        Ok(renderer) => renderer,
        Err(err) => {
            println!("  Schema rejected: {err}");
            return Ok(());
        }
    };
    renderer.start();

    let meta = SubmissionMeta {
        user_agent: Some("formpulse-demo".to_string()),
    };

    // Page 1: pick a feedback type.
    let mut values = BTreeMap::new();
    values.insert("feedbackType".to_string(), feedback_type.clone());
    let upsert = match renderer.advance(values) {
        Ok(Advance::Advanced { upsert, .. }) => upsert,
        Ok(other) => {
            println!("  Page 1 did not advance: {other:?}");
            return Ok(());
        }
        Err(err) => {
            println!("  Renderer error: {err}");
            return Ok(());
        }
    };

    let created = service
        .create_submission(&form_id, upsert.payload, meta.clone())
        .await?;
    renderer.record_submission_id(created.id.clone());
    println!(
        "- Created submission {} (feedbackType = {feedback_type}, finished = {})",
        created.id, created.finished
    );

    if abandon {
        println!("- Respondent abandoned after page 1; partial answers remain captured");
        print_deliveries(&recorder);
        return Ok(());
    }

    // Page 2: write the message; the next page is the end screen, so the
    // renderer finishes the run here.
    let mut values = BTreeMap::new();
    values.insert("message".to_string(), message);
    let upsert = match renderer.advance(values) {
        Ok(Advance::Finished { upsert }) => upsert,
        Ok(other) => {
            println!("  Page 2 did not finish: {other:?}");
            return Ok(());
        }
        Err(err) => {
            println!("  Renderer error: {err}");
            return Ok(());
        }
    };

    let merged = service
        .update_submission(&form_id, &created.id, upsert.payload, meta)
        .await?;
    println!(
        "- Merged final page into submission {} (finished = {})",
        merged.id, merged.finished
    );
    println!("  Stored data:");
    for (key, value) in &merged.data {
        println!("    - {key}: {value}");
    }

    print_deliveries(&recorder);
    Ok(())
}

fn print_deliveries(recorder: &RecordingPipeline) {
    println!("  Pipeline deliveries:");
    for (event, submission_id) in recorder.deliveries() {
        println!("    - {} -> {submission_id}", event.label());
    }
}
