//! Entities and wire payloads for the submission capture path.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::FormSchema;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a [`Form`].
    FormId
);
string_id!(
    /// Identifier of a [`Submission`].
    SubmissionId
);
string_id!(
    /// Identifier of a [`Customer`].
    CustomerId
);
string_id!(
    /// Identifier of the workspace owning forms and customers.
    WorkspaceId
);

/// Product-level category of a form; immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormType {
    Feedback,
    Custom,
}

/// A configured form owned by a workspace. Custom forms carry no schema;
/// their content is rendered by the embedding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: FormId,
    pub workspace_id: WorkspaceId,
    pub label: String,
    #[serde(rename = "type")]
    pub form_type: FormType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<FormSchema>,
    pub created_at: DateTime<Utc>,
}

/// Request metadata captured alongside a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// One respondent's data for a form, possibly partial.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub form_id: FormId,
    /// Element name to collected value. Merged across requests, never
    /// replaced wholesale; see `SubmissionService`.
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(default)]
    pub meta: SubmissionMeta,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A workspace-scoped identity resolved from a submission's email. The
/// `(workspace_id, email)` pair is unique; linkage is find-or-create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub workspace_id: WorkspaceId,
    pub email: String,
    /// Free-form profile fields; the email itself is stripped before storage.
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Body of the capture API's POST and PUT routes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerPayload>,
}

impl SubmissionPayload {
    /// Payload carrying only data fields, the common partial-capture case.
    pub fn with_data(data: BTreeMap<String, String>) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

/// Customer block of a submission payload. Everything besides `email` is
/// kept as free-form profile data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(flatten)]
    pub data: BTreeMap<String, serde_json::Value>,
}
