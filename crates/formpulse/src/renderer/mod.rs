//! Schema-driven form renderer state machine.
//!
//! Walks a schema one page at a time, gates advancement on the validation
//! engine, and emits submission-upsert requests so partial answers are
//! captured even when the respondent abandons mid-form. The renderer does no
//! I/O itself; callers ship the emitted [`SubmissionUpsert`] values to the
//! capture API and report the created submission id back via
//! [`FormRenderer::record_submission_id`].

use std::collections::BTreeMap;

use crate::capture::domain::{SubmissionId, SubmissionPayload};
use crate::schema::validation::Answers;
use crate::schema::{FormSchema, SchemaError, ValidationEngine};

/// Where the renderer currently is in the page sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    Idle,
    ShowingPage(usize),
    Finished,
}

/// An upsert request emitted on a successful page transition. Carries only
/// the fields collected on that transition; the server owns the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionUpsert {
    /// `None` until the first create round-trip assigns an id.
    pub submission_id: Option<SubmissionId>,
    pub payload: SubmissionPayload,
}

/// Result of attempting to advance past the current page.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// Validation passed; the renderer moved to `page`.
    Advanced {
        page: usize,
        upsert: SubmissionUpsert,
    },
    /// At least one element failed validation; state and collected answers
    /// are unchanged, messages are keyed by element name.
    Rejected { errors: BTreeMap<String, String> },
    /// The run is complete; the emitted upsert marks the submission finished.
    Finished { upsert: SubmissionUpsert },
}

/// Misuse of the state machine, distinct from validation rejections.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RendererError {
    #[error("renderer has not been started")]
    NotStarted,
    #[error("submission already finished; start a new renderer to resubmit")]
    AlreadyFinished,
}

pub struct FormRenderer {
    schema: FormSchema,
    engine: ValidationEngine,
    state: RendererState,
    answers: Answers,
    errors: BTreeMap<String, String>,
    submission_id: Option<SubmissionId>,
}

impl FormRenderer {
    /// Build a renderer over a validated schema.
    pub fn new(schema: FormSchema, engine: ValidationEngine) -> Result<Self, SchemaError> {
        schema.validate()?;
        Ok(Self {
            schema,
            engine,
            state: RendererState::Idle,
            answers: Answers::new(),
            errors: BTreeMap::new(),
            submission_id: None,
        })
    }

    /// Begin the run at page 0. A no-op when already past `Idle`.
    pub fn start(&mut self) {
        if self.state == RendererState::Idle {
            self.state = RendererState::ShowingPage(0);
        }
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn current_page(&self) -> Option<&crate::schema::Page> {
        match self.state {
            RendererState::ShowingPage(index) => self.schema.pages.get(index),
            _ => None,
        }
    }

    /// Answers accepted so far across all pages.
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// Validation messages from the most recent rejected advance.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn submission_id(&self) -> Option<&SubmissionId> {
        self.submission_id.as_ref()
    }

    /// Record the id the capture API assigned on create, so later upserts
    /// become updates.
    pub fn record_submission_id(&mut self, id: SubmissionId) {
        self.submission_id = Some(id);
    }

    /// Attempt to advance past the current page with the values entered.
    ///
    /// Every input element on the page is validated; on any failure the
    /// renderer stays put and nothing is collected. On success the page's
    /// values join the running answers and an upsert request is emitted. When
    /// the following page is an end screen (or no page follows), the run
    /// transitions to `Finished` and the upsert carries `finished = true`.
    pub fn advance(&mut self, values: Answers) -> Result<Advance, RendererError> {
        let index = match self.state {
            RendererState::ShowingPage(index) => index,
            RendererState::Idle => return Err(RendererError::NotStarted),
            RendererState::Finished => return Err(RendererError::AlreadyFinished),
        };

        // Pages past the end cannot be reached through the transitions below.
        let page = &self.schema.pages[index];

        // Custom rules may inspect sibling answers from earlier pages as
        // well as the page being submitted.
        let mut visible = self.answers.clone();
        visible.extend(values.clone());

        let mut errors = BTreeMap::new();
        for element in page.input_elements() {
            let value = values.get(element.name()).map(String::as_str);
            if let Err(error) = self.engine.validate(element, value, &visible) {
                errors.insert(element.name().to_string(), error.to_string());
            }
        }

        if !errors.is_empty() {
            self.errors = errors.clone();
            return Ok(Advance::Rejected { errors });
        }
        self.errors.clear();

        // Only keys that belong to this page's input elements are collected;
        // stray keys in the caller's map are dropped.
        let mut page_data = BTreeMap::new();
        for element in page.input_elements() {
            if let Some(value) = values.get(element.name()) {
                page_data.insert(element.name().to_string(), value.clone());
            }
        }
        self.answers.extend(page_data.clone());

        let next = index + 1;
        let run_complete = match self.schema.pages.get(next) {
            Some(page) => page.end_screen,
            None => true,
        };

        if run_complete {
            self.state = RendererState::Finished;
            let upsert = SubmissionUpsert {
                submission_id: self.submission_id.clone(),
                payload: SubmissionPayload {
                    data: Some(page_data),
                    finished: Some(true),
                    customer: None,
                },
            };
            return Ok(Advance::Finished { upsert });
        }

        self.state = RendererState::ShowingPage(next);
        Ok(Advance::Advanced {
            page: next,
            upsert: SubmissionUpsert {
                submission_id: self.submission_id.clone(),
                payload: SubmissionPayload::with_data(page_data),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> Answers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn feedback_renderer() -> FormRenderer {
        let mut renderer = FormRenderer::new(FormSchema::feedback(), ValidationEngine::new())
            .expect("feedback schema is well formed");
        renderer.start();
        renderer
    }

    #[test]
    fn advance_before_start_is_rejected() {
        let mut renderer = FormRenderer::new(FormSchema::feedback(), ValidationEngine::new())
            .expect("schema valid");
        assert_eq!(
            renderer.advance(Answers::new()),
            Err(RendererError::NotStarted)
        );
    }

    #[test]
    fn failing_validation_keeps_page_and_answers() {
        let mut renderer = feedback_renderer();

        let errors = match renderer.advance(Answers::new()) {
            Ok(Advance::Rejected { errors }) => errors,
            other => panic!("expected rejection, got {other:?}"),
        };
        assert_eq!(errors.get("feedbackType").map(String::as_str), Some("This field is required"));
        assert_eq!(renderer.state(), RendererState::ShowingPage(0));
        assert!(renderer.answers().is_empty());
        assert!(!renderer.errors().is_empty());
    }

    #[test]
    fn successful_advance_emits_partial_upsert() {
        let mut renderer = feedback_renderer();

        let (page, upsert) = match renderer.advance(answers(&[("feedbackType", "idea")])) {
            Ok(Advance::Advanced { page, upsert }) => (page, upsert),
            other => panic!("expected advancement, got {other:?}"),
        };

        assert_eq!(page, 1);
        assert_eq!(upsert.submission_id, None, "no id before first create");
        let data = upsert.payload.data.expect("payload carries page data");
        assert_eq!(data.get("feedbackType").map(String::as_str), Some("idea"));
        assert_eq!(upsert.payload.finished, None);
        assert!(renderer.errors().is_empty());
    }

    #[test]
    fn reaching_end_screen_finishes_exactly_once() {
        let mut renderer = feedback_renderer();

        renderer
            .advance(answers(&[("feedbackType", "bug")]))
            .expect("first page passes");
        renderer.record_submission_id(SubmissionId::from("s-1"));

        let upsert = match renderer.advance(answers(&[("message", "great tool")])) {
            Ok(Advance::Finished { upsert }) => upsert,
            other => panic!("expected finish, got {other:?}"),
        };

        assert_eq!(upsert.submission_id, Some(SubmissionId::from("s-1")));
        assert_eq!(upsert.payload.finished, Some(true));
        let data = upsert.payload.data.expect("final page data");
        assert_eq!(data.get("message").map(String::as_str), Some("great tool"));
        assert!(!data.contains_key("feedbackType"), "only this page's fields");

        assert_eq!(renderer.state(), RendererState::Finished);
        assert_eq!(
            renderer.advance(Answers::new()),
            Err(RendererError::AlreadyFinished)
        );
    }

    #[test]
    fn stray_keys_are_not_collected() {
        let mut renderer = feedback_renderer();

        renderer
            .advance(answers(&[("feedbackType", "idea"), ("bogus", "x")]))
            .expect("advance runs");

        assert!(renderer.answers().contains_key("feedbackType"));
        assert!(!renderer.answers().contains_key("bogus"));
    }
}
