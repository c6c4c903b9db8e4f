//! Data-access seams consumed by the capture service.
//!
//! Persistence semantics live behind these traits; the service only relies
//! on find-by-id, insert, whole-record update, and keyed find-or-create.
//! Every call is an async I/O boundary.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::domain::{Customer, Form, FormId, Submission, SubmissionId, WorkspaceId};

/// Read access to configured forms. Forms are authored by the dashboard,
/// which is a separate writer outside this crate.
#[async_trait]
pub trait FormStore: Send + Sync {
    async fn find(&self, id: &FormId) -> Result<Option<Form>, StoreError>;
}

/// Submission persistence. `update` replaces the stored record wholesale;
/// merge semantics belong to the service, not the store.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, submission: Submission) -> Result<Submission, StoreError>;
    async fn find(&self, id: &SubmissionId) -> Result<Option<Submission>, StoreError>;
    async fn update(&self, submission: Submission) -> Result<Submission, StoreError>;
}

/// Customer linkage keyed by `(workspace_id, email)`. Implementations must
/// be idempotent on that pair: the same email in the same workspace always
/// resolves to the same customer.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_or_create(
        &self,
        workspace_id: &WorkspaceId,
        email: &str,
        data: BTreeMap<String, serde_json::Value>,
    ) -> Result<Customer, StoreError>;
}

/// Failures surfaced by store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
