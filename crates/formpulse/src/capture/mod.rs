//! Submission capture: domain entities, store seams, the merge service, and
//! the public HTTP routes.

pub mod domain;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use domain::{
    Customer, CustomerId, CustomerPayload, Form, FormId, FormType, Submission, SubmissionId,
    SubmissionMeta, SubmissionPayload, WorkspaceId,
};
pub use router::capture_router;
pub use service::{
    AnalyticsEvent, AnalyticsSink, CaptureError, CaptureOptions, NoopAnalytics, SubmissionService,
};
pub use store::{CustomerStore, FormStore, StoreError, SubmissionStore};
