//! One user's pass through a form
//!
//! [`FormSession`] owns the value tree, the error map, the step runtime and
//! the uniqueness checker for a single form. State transitions live in
//! [`reducers`] as pure functions; the session applies their results and
//! forwards check requests to the checker.

mod errors;
pub mod reducers;
mod runtime;

pub use errors::{ErrorClass, ErrorMap, FieldError};
pub use reducers::{CheckAction, SessionState, SubmitBlock};
pub use runtime::StepRuntimeState;

use crate::error::{Result, WizardError};
use crate::forms::{FieldKey, FormSchema, FormValue, FormValueTree};
use crate::services::{RecordSubmissionService, UniquenessCheckService};
use crate::suggestions::generate_slug_suggestions;
use crate::uniqueness::{CheckStatus, Resolution, UniquenessChecker, Verdict};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Shown when the submission service fails for any reason
pub const SUBMIT_RETRY_MESSAGE: &str = "We couldn't submit your details. Please try again.";

/// Timing and sizing knobs of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub debounce: Duration,
    pub highlight_window: Duration,
    pub suggestion_limit: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            highlight_window: Duration::from_millis(1500),
            suggestion_limit: 6,
        }
    }
}

/// Result of [`FormSession::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { id: String },
    /// A step is incomplete or still carries errors; the session now shows it
    Blocked { step: usize, fields: Vec<FieldKey> },
    Failed { message: String },
}

pub struct FormSession {
    id: Uuid,
    schema: Arc<FormSchema>,
    state: SessionState,
    checker: UniquenessChecker,
    suggestions: HashMap<FieldKey, Vec<String>>,
    options: SessionOptions,
}

impl FormSession {
    /// Start a session on `schema`.
    ///
    /// Uniqueness timers and calls run on the tokio runtime that is current
    /// here; the session's synchronous methods can then be used from any
    /// thread.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new(
        schema: Arc<FormSchema>,
        check_service: Arc<dyn UniquenessCheckService>,
        options: SessionOptions,
    ) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(session = %id, form = %schema.name, "session started");
        Self {
            id,
            checker: UniquenessChecker::new(check_service, options.debounce),
            schema,
            state: SessionState::default(),
            suggestions: HashMap::new(),
            options,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn values(&self) -> &FormValueTree {
        &self.state.values
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.state.errors
    }

    pub fn current_step(&self) -> usize {
        self.state.runtime.current()
    }

    /// Stored value, or the kind's empty value when never set
    pub fn value(&self, key: &FieldKey) -> FormValue {
        match self.state.values.get(key) {
            Some(value) => value.clone(),
            None => self
                .schema
                .field(key)
                .map(|spec| spec.kind.empty_value())
                .unwrap_or_else(|| FormValue::text("")),
        }
    }

    pub fn set_field(&mut self, key: &FieldKey, value: FormValue) -> Result<()> {
        let (next, action) = reducers::set_field(&self.schema, &self.state, key, value)?;
        self.state = next;

        match action {
            CheckAction::Schedule(candidate) => {
                self.checker.schedule(key, &candidate);
            }
            CheckAction::Invalidate => {
                self.checker.invalidate(key);
            }
            CheckAction::Skip => {}
        }

        if self
            .schema
            .suggestion_plan()
            .is_some_and(|plan| plan.is_source(key))
        {
            self.regenerate_suggestions();
        }
        Ok(())
    }

    /// Same as [`Self::set_field`] with a dotted key such as `businessHours.open`
    pub fn set_field_by_name(&mut self, name: &str, value: FormValue) -> Result<()> {
        let key = FieldKey::parse(name)?;
        self.set_field(&key, value)
    }

    /// Focus left `key`: an identity field with an unresolved, well-formed
    /// value is checked right away instead of waiting out the debounce.
    pub fn blur(&mut self, key: &FieldKey) -> Result<()> {
        let spec = self
            .schema
            .field(key)
            .ok_or_else(|| WizardError::UnknownField(key.to_string()))?;
        if !spec.unique || self.state.errors.get(key).is_some_and(FieldError::is_local) {
            return Ok(());
        }

        let value = self.value(key);
        if value.is_empty() {
            return Ok(());
        }
        let status = self.checker.status(key);
        if status.pending {
            self.checker.fire(key);
        } else if !status.checking && !status.checked {
            let candidate = reducers::check_value(spec, &value);
            self.checker.check_now(key, &candidate);
        }
        Ok(())
    }

    pub fn go_next(&mut self) -> bool {
        let (next, advanced) = reducers::go_next(&self.schema, &self.state, Instant::now());
        self.state = next;
        tracing::info!(session = %self.id, step = self.current_step(), advanced, "go next");
        advanced
    }

    pub fn go_previous(&mut self) -> bool {
        self.state = reducers::go_previous(&self.schema, &self.state, Instant::now());
        tracing::info!(session = %self.id, step = self.current_step(), "go previous");
        true
    }

    /// Walk to `target` (clamped). `false` when a step on the way blocked.
    pub fn go_to(&mut self, target: usize) -> bool {
        let (next, reached) = reducers::go_to(&self.schema, &self.state, target, Instant::now());
        self.state = next;
        tracing::info!(session = %self.id, target, step = self.current_step(), reached, "go to");
        reached
    }

    pub fn completed(&self) -> Vec<bool> {
        reducers::completed(&self.schema, &self.state.values)
    }

    pub fn incomplete_highlight(&self, now: Instant) -> Vec<bool> {
        reducers::incomplete_highlight(&self.schema, &self.state, now, self.options.highlight_window)
    }

    pub fn highlight_intensity(&self, now: Instant) -> f32 {
        reducers::highlight_intensity(&self.state, now, self.options.highlight_window)
    }

    pub fn check_status(&self, key: &FieldKey) -> CheckStatus {
        self.checker.status(key)
    }

    /// `checking` flag of every identity field
    pub fn checking(&self) -> BTreeMap<FieldKey, bool> {
        self.schema
            .identity_fields()
            .map(|key| (key.clone(), self.checker.status(key).checking))
            .collect()
    }

    pub fn is_checking(&self) -> bool {
        self.checker.is_busy()
    }

    /// Apply every uniqueness answer that has already arrived. Returns how
    /// many were accepted.
    pub fn pump_checks(&mut self) -> usize {
        let resolutions = self.checker.drain();
        self.apply_resolutions(resolutions)
    }

    /// Wait for every armed or in-flight check and apply the answers
    pub async fn settle_checks(&mut self) -> usize {
        let resolutions = self.checker.settle().await;
        self.apply_resolutions(resolutions)
    }

    fn apply_resolutions(&mut self, resolutions: Vec<Resolution>) -> usize {
        let count = resolutions.len();
        for resolution in resolutions {
            self.state = reducers::apply_resolution(&self.schema, &self.state, &resolution);
            if let Verdict::Conflict { suggestions } = resolution.verdict {
                let is_target = self
                    .schema
                    .suggestion_plan()
                    .is_some_and(|plan| plan.target == resolution.field);
                match suggestions {
                    Some(offered) if is_target => {
                        self.suggestions.insert(resolution.field, offered);
                    }
                    None if is_target => self.regenerate_suggestions(),
                    _ => {}
                }
            }
        }
        count
    }

    pub fn suggestions_for(&self, key: &FieldKey) -> &[String] {
        self.suggestions.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Recompute slug suggestions from the current source values
    pub fn regenerate_suggestions(&mut self) {
        let Some(plan) = self.schema.suggestion_plan() else {
            return;
        };
        let primary = self.state.values.text(&plan.primary);
        let secondary: Vec<&str> = plan
            .secondary
            .iter()
            .map(|key| self.state.values.text(key))
            .collect();
        let generated = generate_slug_suggestions(primary, &secondary, self.options.suggestion_limit);
        self.suggestions.insert(plan.target.clone(), generated);
    }

    /// Flush pending checks, gate on every step, then hand the value tree to
    /// the submission service.
    pub async fn submit(&mut self, service: &dyn RecordSubmissionService) -> SubmitOutcome {
        self.checker.flush();
        self.settle_checks().await;

        let (gated, block) = reducers::gate_submission(&self.schema, &self.state, Instant::now());
        self.state = gated;
        if let Some(SubmitBlock { step, fields }) = block {
            tracing::info!(session = %self.id, step, failing = fields.len(), "submission blocked");
            return SubmitOutcome::Blocked { step, fields };
        }

        let payload = serde_json::json!({
            "form": self.schema.name,
            "sessionId": self.id.to_string(),
            "values": self.state.values.to_json(),
        });
        let span = tracing::info_span!("submit", session = %self.id, form = %self.schema.name);
        match service.submit(payload).instrument(span).await {
            Ok(receipt) => {
                tracing::info!(session = %self.id, id = %receipt.id, "form submitted");
                SubmitOutcome::Submitted { id: receipt.id }
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "submission failed");
                SubmitOutcome::Failed {
                    message: SUBMIT_RETRY_MESSAGE.to_string(),
                }
            }
        }
    }
}
