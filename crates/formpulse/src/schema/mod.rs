//! Declarative form schema: pages, elements, and validation rule sets.
//!
//! The JSON shape here is a wire contract shared with dashboard-authored
//! schemas already in storage, so field names (`type`, `endScreen`,
//! `minLength`, ...) must not drift.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub mod validation;

pub use validation::{ValidationEngine, ValidationError};

/// A form's renderable content: an ordered sequence of pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    /// Always `"form"`; kept explicit for forward compatibility of the wire format.
    #[serde(rename = "type", default = "default_schema_kind")]
    pub kind: String,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
    pub pages: Vec<Page>,
}

fn default_schema_kind() -> String {
    "form".to_string()
}

impl FormSchema {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            kind: default_schema_kind(),
            config: serde_json::Map::new(),
            pages,
        }
    }

    /// The canonical three-page feedback box template created by the dashboard.
    pub fn feedback() -> Self {
        Self::new(vec![
            Page {
                id: "feedbackTypePage".to_string(),
                end_screen: false,
                elements: vec![Element::Radio(ChoiceElement {
                    name: "feedbackType".to_string(),
                    label: Some("What's on your mind?".to_string()),
                    options: vec![
                        ChoiceOption::new("Idea", "idea"),
                        ChoiceOption::new("Compliment", "compliment"),
                        ChoiceOption::new("Bug", "bug"),
                    ],
                    rules: RuleSet {
                        required: true,
                        ..RuleSet::default()
                    },
                })],
            },
            Page {
                id: "messagePage".to_string(),
                end_screen: false,
                elements: vec![Element::Textarea(InputElement {
                    name: "message".to_string(),
                    label: Some("What's your feedback?".to_string()),
                    help: None,
                    placeholder: None,
                    rules: RuleSet {
                        required: true,
                        ..RuleSet::default()
                    },
                })],
            },
            Page {
                id: "thankYouPage".to_string(),
                end_screen: true,
                elements: vec![Element::Html(HtmlElement {
                    name: "thankYou".to_string(),
                    html: None,
                })],
            },
        ])
    }

    /// Sanity-check a schema before rendering: pages must exist and element
    /// names must be unique across the whole schema (they are the data keys).
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.pages.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        let mut seen = BTreeSet::new();
        for element in self.elements() {
            if !seen.insert(element.name().to_string()) {
                return Err(SchemaError::DuplicateElementName(
                    element.name().to_string(),
                ));
            }
        }
        Ok(())
    }

    /// All elements across all pages, in page order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.pages.iter().flat_map(|page| page.elements.iter())
    }

    /// Look up an input element by its data key.
    pub fn input_element(&self, name: &str) -> Option<&Element> {
        self.elements()
            .find(|element| element.is_input() && element.name() == name)
    }
}

/// One renderable page of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    /// Terminal page: shown after completion, no further navigation.
    #[serde(
        default,
        rename = "endScreen",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub end_screen: bool,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl Page {
    /// Elements on this page that collect data (everything but `html`).
    pub fn input_elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter().filter(|element| element.is_input())
    }
}

/// Closed set of element kinds, dispatched by the `type` wire field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    Text(InputElement),
    Textarea(InputElement),
    Radio(ChoiceElement),
    Checkbox(ChoiceElement),
    Html(HtmlElement),
}

impl Element {
    /// The element's data key, unique within a schema.
    pub fn name(&self) -> &str {
        match self {
            Element::Text(inner) | Element::Textarea(inner) => &inner.name,
            Element::Radio(inner) | Element::Checkbox(inner) => &inner.name,
            Element::Html(inner) => &inner.name,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Element::Text(inner) | Element::Textarea(inner) => inner.label.as_deref(),
            Element::Radio(inner) | Element::Checkbox(inner) => inner.label.as_deref(),
            Element::Html(_) => None,
        }
    }

    /// Whether the element collects a value from the respondent.
    pub fn is_input(&self) -> bool {
        !matches!(self, Element::Html(_))
    }

    /// Declared validation rules; `html` elements carry none.
    pub fn rules(&self) -> Option<&RuleSet> {
        match self {
            Element::Text(inner) | Element::Textarea(inner) => Some(&inner.rules),
            Element::Radio(inner) | Element::Checkbox(inner) => Some(&inner.rules),
            Element::Html(_) => None,
        }
    }
}

/// Free-text input (`text`, `textarea`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputElement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(flatten)]
    pub rules: RuleSet,
}

/// Option-based input (`radio`, `checkbox`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceElement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub options: Vec<ChoiceOption>,
    #[serde(flatten)]
    pub rules: RuleSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Static markup block; never validated, never a data key on submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtmlElement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

/// Declared validation rules for a single element. Rules compose with AND
/// semantics; `custom` predicates live in the [`ValidationEngine`] registry
/// because closures have no wire representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Structural problems detected before a schema is rendered.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no pages")]
    EmptySchema,
    #[error("duplicate element name '{0}' in schema")]
    DuplicateElementName(String),
}
