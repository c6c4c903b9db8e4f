use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryCustomerStore, InMemoryFormStore, InMemorySubmissionStore, LoggingPipeline,
    TracingAnalytics,
};
use crate::routes::with_capture_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use formpulse::capture::{
    CaptureOptions, Form, FormId, FormType, SubmissionService, WorkspaceId,
};
use formpulse::config::AppConfig;
use formpulse::error::AppError;
use formpulse::pipeline::{PipelineDispatcher, PipelineSubscription};
use formpulse::schema::FormSchema;
use formpulse::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

const DEMO_WORKSPACE: &str = "demo-workspace";
const DEMO_FORM: &str = "feedback-box";

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let forms = Arc::new(InMemoryFormStore::default());
    forms.seed(demo_feedback_form());

    let mut dispatcher = PipelineDispatcher::new(config.capture.pipeline_timeout());
    dispatcher.register(
        PipelineSubscription::workspace_all(WorkspaceId::from(DEMO_WORKSPACE)),
        Arc::new(LoggingPipeline::new("log-webhook")),
    );

    let service = Arc::new(SubmissionService::with_options(
        forms,
        Arc::new(InMemorySubmissionStore::default()),
        Arc::new(InMemoryCustomerStore::default()),
        Arc::new(dispatcher),
        Arc::new(TracingAnalytics),
        CaptureOptions {
            revalidate: config.capture.revalidate_submissions,
        },
    ));

    let app = with_capture_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        form = DEMO_FORM,
        workspace = DEMO_WORKSPACE,
        "capture service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// The canonical feedback form, seeded so a fresh instance is usable with
/// `curl` straight away.
fn demo_feedback_form() -> Form {
    Form {
        id: FormId::from(DEMO_FORM),
        workspace_id: WorkspaceId::from(DEMO_WORKSPACE),
        label: "Feedback Box".to_string(),
        form_type: FormType::Feedback,
        schema: Some(FormSchema::feedback()),
        created_at: Utc::now(),
    }
}
