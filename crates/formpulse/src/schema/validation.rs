//! Rule evaluation for schema elements.
//!
//! Pure and side-effect-free so the same engine can gate page advancement in
//! the renderer and re-check incoming payloads on the capture path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use regex::Regex;

use super::{Element, RuleSet};

/// Collected answers keyed by element name.
pub type Answers = BTreeMap<String, String>;

/// A registered cross-field predicate: receives the candidate value and the
/// sibling answers collected so far, returns `Err(reason)` on rejection.
pub type CustomRule = Arc<dyn Fn(&str, &Answers) -> Result<(), String> + Send + Sync>;

/// Applies an element's declared rule set plus any registered custom rules.
#[derive(Clone, Default)]
pub struct ValidationEngine {
    custom: HashMap<String, Vec<CustomRule>>,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom rule for the element with the given data key.
    pub fn with_rule<F>(mut self, element_name: impl Into<String>, rule: F) -> Self
    where
        F: Fn(&str, &Answers) -> Result<(), String> + Send + Sync + 'static,
    {
        self.custom
            .entry(element_name.into())
            .or_default()
            .push(Arc::new(rule));
        self
    }

    /// Validate a candidate value for an element. Rules compose with AND
    /// semantics; the first failing rule produces the error. Non-input
    /// elements always pass.
    pub fn validate(
        &self,
        element: &Element,
        value: Option<&str>,
        answers: &Answers,
    ) -> Result<(), ValidationError> {
        let Some(rules) = element.rules() else {
            return Ok(());
        };
        self.validate_rules(element.name(), rules, value, answers)
    }

    /// Rule evaluation against a bare rule set, for callers that hold data
    /// keys without the surrounding element (server-side re-validation).
    pub fn validate_rules(
        &self,
        name: &str,
        rules: &RuleSet,
        value: Option<&str>,
        answers: &Answers,
    ) -> Result<(), ValidationError> {
        // Any non-empty string satisfies `required`, whitespace included;
        // the client has always accepted untrimmed input.
        let supplied = value.filter(|v| !v.is_empty());

        if rules.required && supplied.is_none() {
            return Err(ValidationError::Required {
                field: name.to_string(),
            });
        }

        // Remaining rules only apply to values that were actually supplied.
        let Some(value) = supplied else {
            return Ok(());
        };

        let length = value.chars().count();
        if let Some(min) = rules.min_length {
            if length < min {
                return Err(ValidationError::TooShort {
                    field: name.to_string(),
                    min,
                    actual: length,
                });
            }
        }
        if let Some(max) = rules.max_length {
            if length > max {
                return Err(ValidationError::TooLong {
                    field: name.to_string(),
                    max,
                    actual: length,
                });
            }
        }

        if let Some(pattern) = rules.pattern.as_deref() {
            let regex = Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern {
                field: name.to_string(),
                source,
            })?;
            if !regex.is_match(value) {
                return Err(ValidationError::Pattern {
                    field: name.to_string(),
                });
            }
        }

        for rule in self.custom.get(name).into_iter().flatten() {
            rule(value, answers).map_err(|reason| ValidationError::Custom {
                field: name.to_string(),
                reason,
            })?;
        }

        Ok(())
    }
}

/// Why a value was rejected. Display strings mirror the messages the client
/// library has always shown, so they can surface directly next to an element.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("This field is required")]
    Required { field: String },
    #[error("Your answer must be at least {min} characters long")]
    TooShort {
        field: String,
        min: usize,
        actual: usize,
    },
    #[error("Your answer must not be longer than {max} characters")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },
    #[error("Your answer does not match the expected format")]
    Pattern { field: String },
    #[error("element '{field}' declares an invalid pattern")]
    InvalidPattern { field: String, source: regex::Error },
    #[error("{reason}")]
    Custom { field: String, reason: String },
}

impl ValidationError {
    /// The element name the error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::TooLong { field, .. }
            | ValidationError::Pattern { field }
            | ValidationError::InvalidPattern { field, .. }
            | ValidationError::Custom { field, .. } => field,
        }
    }
}
