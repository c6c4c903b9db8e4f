//! Public capture API: the CORS-open routes embedded forms talk to.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

use super::domain::{FormId, Submission, SubmissionId, SubmissionMeta, SubmissionPayload};
use super::service::{CaptureError, SubmissionService};
use super::store::{CustomerStore, FormStore, StoreError, SubmissionStore};

/// Router builder for the capture endpoints. Open to any origin: forms are
/// embedded on arbitrary third-party sites.
pub fn capture_router<F, S, C>(service: Arc<SubmissionService<F, S, C>>) -> Router
where
    F: FormStore + 'static,
    S: SubmissionStore + 'static,
    C: CustomerStore + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/capture/forms/:form_id/submissions",
            post(create_handler::<F, S, C>).fallback(unsupported_method),
        )
        .route(
            "/capture/forms/:form_id/submissions/:submission_id",
            put(update_handler::<F, S, C>).fallback(unsupported_method),
        )
        .layer(cors)
        .with_state(service)
}

pub(crate) async fn create_handler<F, S, C>(
    State(service): State<Arc<SubmissionService<F, S, C>>>,
    Path(form_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<SubmissionPayload>,
) -> Result<Json<Submission>, CaptureError>
where
    F: FormStore + 'static,
    S: SubmissionStore + 'static,
    C: CustomerStore + 'static,
{
    let submission = service
        .create_submission(&FormId(form_id), payload, submission_meta(&headers))
        .await?;
    Ok(Json(submission))
}

pub(crate) async fn update_handler<F, S, C>(
    State(service): State<Arc<SubmissionService<F, S, C>>>,
    Path((form_id, submission_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(payload): Json<SubmissionPayload>,
) -> Result<Json<Submission>, CaptureError>
where
    F: FormStore + 'static,
    S: SubmissionStore + 'static,
    C: CustomerStore + 'static,
{
    let submission = service
        .update_submission(
            &FormId(form_id),
            &SubmissionId(submission_id),
            payload,
            submission_meta(&headers),
        )
        .await?;
    Ok(Json(submission))
}

/// Explicit 405 for any verb the capture routes do not implement.
pub(crate) async fn unsupported_method(method: Method) -> Response {
    let body = Json(json!({
        "message": format!("The HTTP {method} method is not supported by this route.")
    }));
    (StatusCode::METHOD_NOT_ALLOWED, body).into_response()
}

fn submission_meta(headers: &HeaderMap) -> SubmissionMeta {
    SubmissionMeta {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        let status = match &self {
            CaptureError::FormNotFound(_) | CaptureError::SubmissionNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            CaptureError::InvalidData(_) => StatusCode::BAD_REQUEST,
            CaptureError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
            CaptureError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "message": self.to_string() }));
        (status, body).into_response()
    }
}
