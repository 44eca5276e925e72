//! Pure state transitions
//!
//! Each reducer takes the schema and the current [`SessionState`] and returns
//! a new state; nothing is mutated in place. [`super::FormSession`] wires
//! these to the uniqueness checker and the submission service.

use super::errors::{ErrorMap, FieldError};
use super::runtime::StepRuntimeState;
use crate::error::{Result, WizardError};
use crate::forms::{FieldKey, FieldKind, FieldSpec, FormSchema, FormValue, FormValueTree};
use crate::uniqueness::{Resolution, Verdict};
use crate::validation::{blocks_navigation, conflict_message, Validator};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Everything a session owns besides its collaborators
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub values: FormValueTree,
    pub errors: ErrorMap,
    pub runtime: StepRuntimeState,
}

/// What the uniqueness checker should do after an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckAction {
    /// Not an identity field, or the value did not change
    Skip,
    /// Arm the debounce window for this value
    Schedule(String),
    /// Value is empty or malformed; earlier answers are stale
    Invalidate,
}

/// The step that stops a submission and the fields at fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitBlock {
    pub step: usize,
    pub fields: Vec<FieldKey>,
}

/// Value sent to the check service for an identity field
pub fn check_value(spec: &FieldSpec, value: &FormValue) -> String {
    let text = value.as_text().trim();
    match spec.kind {
        FieldKind::TaxId(_) => text.to_ascii_uppercase(),
        _ => text.to_string(),
    }
}

/// Apply an edit and re-run the synchronous validator for that field.
///
/// Error merge: a fresh format/required error always wins. Without one, a
/// stale local error is cleared, and a conflict survives only while the value
/// still equals the value it was reported for.
pub fn set_field(
    schema: &FormSchema,
    state: &SessionState,
    key: &FieldKey,
    value: FormValue,
) -> Result<(SessionState, CheckAction)> {
    let spec = schema
        .field(key)
        .ok_or_else(|| WizardError::UnknownField(key.to_string()))?;

    let unchanged = state.values.get(key) == Some(&value);
    let values = if unchanged {
        state.values.clone()
    } else {
        state.values.with_field(key, value.clone())?
    };

    let local = Validator::new(schema).validate_field(key, &value)?;
    let candidate = check_value(spec, &value);

    let action = if !spec.unique || unchanged {
        CheckAction::Skip
    } else if local.is_none() && !value.is_empty() {
        CheckAction::Schedule(candidate.clone())
    } else {
        CheckAction::Invalidate
    };

    let errors = match (local, state.errors.get(key)) {
        (Some(error), _) => state.errors.with(key, error),
        (None, Some(existing)) if existing.is_local() => state.errors.without(key),
        (None, Some(existing)) if existing.value != candidate => state.errors.without(key),
        _ => state.errors.clone(),
    };

    Ok((
        SessionState {
            values,
            errors,
            runtime: state.runtime.clone(),
        },
        action,
    ))
}

/// Merge an accepted uniqueness answer into the error map
pub fn apply_resolution(schema: &FormSchema, state: &SessionState, resolution: &Resolution) -> SessionState {
    let Some(spec) = schema.field(&resolution.field) else {
        return state.clone();
    };
    let key = &resolution.field;
    let message = conflict_message(spec);
    let current = state.errors.get(key);

    let errors = match &resolution.verdict {
        Verdict::Conflict { .. } => match current {
            Some(existing) if existing.is_local() => state.errors.clone(),
            _ => state
                .errors
                .with(key, FieldError::conflict(message, resolution.value.clone())),
        },
        Verdict::Available => match current {
            Some(existing) if existing.is_conflict() && existing.message == message => {
                state.errors.without(key)
            }
            _ => state.errors.clone(),
        },
        Verdict::Unreachable(_) => match current {
            Some(existing) if existing.is_conflict() => state.errors.without(key),
            _ => state.errors.clone(),
        },
    };

    SessionState {
        errors,
        ..state.clone()
    }
}

/// Write a step report into the error map
fn flag(errors: &ErrorMap, report: &BTreeMap<FieldKey, FieldError>) -> ErrorMap {
    report
        .iter()
        .fold(errors.clone(), |map, (key, error)| map.with(key, error.clone()))
}

/// Advance one step when the current step has no missing required values.
/// Failing fields are flagged either way. Returns `false` when blocked or
/// already on the last step.
pub fn go_next(schema: &FormSchema, state: &SessionState, now: Instant) -> (SessionState, bool) {
    let current = schema.clamp_step(state.runtime.current());
    let report = Validator::new(schema)
        .validate_step(current, &state.values)
        .unwrap_or_default();
    let errors = flag(&state.errors, &report);
    let blocked = blocks_navigation(&report);
    let advanced = !blocked && current < schema.last_step();

    let runtime = if advanced {
        state.runtime.at(current + 1)
    } else {
        state.runtime.at(current)
    }
    .highlighted_at(now);

    if blocked {
        tracing::info!(step = current, missing = report.len(), "navigation blocked");
    }

    (
        SessionState {
            values: state.values.clone(),
            errors,
            runtime,
        },
        advanced,
    )
}

/// Step back one step; on the first step this stays put
pub fn go_previous(schema: &FormSchema, state: &SessionState, now: Instant) -> SessionState {
    let current = schema.clamp_step(state.runtime.current());
    SessionState {
        runtime: state.runtime.at(current.saturating_sub(1)).highlighted_at(now),
        ..state.clone()
    }
}

/// Walk towards `target` one step at a time. Forward walks stop on the first
/// step that fails validation and leave the session there.
pub fn go_to(
    schema: &FormSchema,
    state: &SessionState,
    target: usize,
    now: Instant,
) -> (SessionState, bool) {
    let target = schema.clamp_step(target);
    let mut walked = state.clone();

    while walked.runtime.current() < target {
        let (next, advanced) = go_next(schema, &walked, now);
        walked = next;
        if !advanced {
            return (walked, false);
        }
    }
    while walked.runtime.current() > target {
        walked = go_previous(schema, &walked, now);
    }
    walked.runtime = walked.runtime.highlighted_at(now);
    (walked, true)
}

fn step_completed(schema: &FormSchema, values: &FormValueTree, index: usize) -> bool {
    schema
        .fields_required_in(index)
        .map(|required| required.iter().all(|key| !values.is_empty_at(key)))
        .unwrap_or(false)
}

/// Per-step completion: every required member holds a non-empty value.
/// Independent of the error map.
pub fn completed(schema: &FormSchema, values: &FormValueTree) -> Vec<bool> {
    (0..schema.step_count())
        .map(|index| step_completed(schema, values, index))
        .collect()
}

/// Visited, incomplete steps while the highlight window is open
pub fn incomplete_highlight(
    schema: &FormSchema,
    state: &SessionState,
    now: Instant,
    window: Duration,
) -> Vec<bool> {
    let active = state.runtime.highlight_progress(now, window).is_some();
    completed(schema, &state.values)
        .into_iter()
        .enumerate()
        .map(|(index, done)| active && !done && state.runtime.is_visited(index))
        .collect()
}

/// Highlight strength in `[0, 1]`, fading out over the window
pub fn highlight_intensity(state: &SessionState, now: Instant, window: Duration) -> f32 {
    state
        .runtime
        .highlight_progress(now, window)
        .map(|progress| 1.0 - simple_easing::cubic_out(progress))
        .unwrap_or(0.0)
}

/// Find the first step that prevents submission. On failure the returned
/// state is positioned on that step with its fields flagged.
pub fn gate_submission(
    schema: &FormSchema,
    state: &SessionState,
    now: Instant,
) -> (SessionState, Option<SubmitBlock>) {
    let validator = Validator::new(schema);
    for step in schema.steps() {
        let report = validator
            .validate_step(step.index, &state.values)
            .unwrap_or_default();
        let fields: Vec<FieldKey> = step
            .fields
            .iter()
            .filter(|key| report.contains_key(*key) || state.errors.contains(key))
            .cloned()
            .collect();
        if fields.is_empty() {
            continue;
        }

        let blocked = SessionState {
            values: state.values.clone(),
            errors: flag(&state.errors, &report),
            runtime: state.runtime.at(step.index).highlighted_at(now),
        };
        return (
            blocked,
            Some(SubmitBlock {
                step: step.index,
                fields,
            }),
        );
    }
    (state.clone(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::{FieldKind, FieldSpec};
    use crate::session::ErrorClass;
    use pretty_assertions::assert_eq;

    fn key(raw: &str) -> FieldKey {
        FieldKey::parse(raw).unwrap()
    }

    fn schema() -> FormSchema {
        let text = |k: &str| FieldSpec::new(key(k), k, FieldKind::Text);
        FormSchema::builder("test", "Test")
            .step(
                "Basics",
                "",
                vec![text("name").required(), text("city").required()],
            )
            .step(
                "Identity",
                "",
                vec![
                    FieldSpec::new(key("slug"), "Profile URL", FieldKind::Slug)
                        .required()
                        .unique(),
                    FieldSpec::new(key("email"), "Email", FieldKind::Email).unique(),
                ],
            )
            .step("Done", "", vec![text("notes")])
            .build()
            .unwrap()
    }

    fn edit(schema: &FormSchema, state: &SessionState, k: &str, v: &str) -> (SessionState, CheckAction) {
        set_field(schema, state, &key(k), FormValue::text(v)).unwrap()
    }

    fn resolve(field: &str, value: &str, verdict: Verdict) -> Resolution {
        Resolution {
            field: key(field),
            value: value.to_string(),
            generation: 1,
            verdict,
        }
    }

    mod set_field {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_required_error_applied_inline() {
            let schema = schema();
            let (state, action) = edit(&schema, &SessionState::default(), "name", "  ");
            assert_eq!(state.errors.get(&key("name")).unwrap().class, ErrorClass::Required);
            assert_eq!(action, CheckAction::Skip);
        }

        #[test]
        fn test_error_cleared_once_valid() {
            let schema = schema();
            let (state, _) = edit(&schema, &SessionState::default(), "email", "a@b");
            assert!(state.errors.contains(&key("email")));
            let (state, action) = edit(&schema, &state, "email", "a@b.com");
            assert!(!state.errors.contains(&key("email")));
            assert_eq!(action, CheckAction::Schedule("a@b.com".to_string()));
        }

        #[test]
        fn test_malformed_identity_invalidates() {
            let schema = schema();
            let (_, action) = edit(&schema, &SessionState::default(), "email", "a@b");
            assert_eq!(action, CheckAction::Invalidate);
        }

        #[test]
        fn test_unchanged_value_skips_check() {
            let schema = schema();
            let (state, _) = edit(&schema, &SessionState::default(), "slug", "acme");
            let (_, action) = edit(&schema, &state, "slug", "acme");
            assert_eq!(action, CheckAction::Skip);
        }

        #[test]
        fn test_structural_update() {
            let schema = schema();
            let before = SessionState::default();
            let (after, _) = edit(&schema, &before, "name", "Acme");
            assert!(!before.values.same_as(&after.values));
            assert_eq!(before.values.text(&key("name")), "");
        }

        #[test]
        fn test_unknown_field() {
            let schema = schema();
            let result = set_field(&schema, &SessionState::default(), &key("zzz"), FormValue::text("x"));
            assert!(matches!(result, Err(WizardError::UnknownField(_))));
        }
    }

    mod error_merge {
        use super::*;
        use pretty_assertions::assert_eq;

        fn conflicted(schema: &FormSchema) -> SessionState {
            let (state, _) = edit(schema, &SessionState::default(), "slug", "acme");
            apply_resolution(
                schema,
                &state,
                &resolve("slug", "acme", Verdict::Conflict { suggestions: None }),
            )
        }

        #[test]
        fn test_conflict_written() {
            let schema = schema();
            let state = conflicted(&schema);
            let error = state.errors.get(&key("slug")).unwrap();
            assert_eq!(error.class, ErrorClass::Conflict);
            assert_eq!(error.message, "Profile URL is already registered");
        }

        #[test]
        fn test_emptying_replaces_conflict_with_required() {
            let schema = schema();
            let state = conflicted(&schema);
            let (state, action) = edit(&schema, &state, "slug", "");
            assert_eq!(state.errors.get(&key("slug")).unwrap().class, ErrorClass::Required);
            assert_eq!(action, CheckAction::Invalidate);

            // Retyping the old value does not resurrect the conflict
            let (state, action) = edit(&schema, &state, "slug", "acme");
            assert!(!state.errors.contains(&key("slug")));
            assert_eq!(action, CheckAction::Schedule("acme".to_string()));
        }

        #[test]
        fn test_conflict_cleared_when_value_changes() {
            let schema = schema();
            let state = conflicted(&schema);
            let (state, _) = edit(&schema, &state, "slug", "acme-1");
            assert!(!state.errors.contains(&key("slug")));
        }

        #[test]
        fn test_format_error_replaces_conflict() {
            let schema = schema();
            let state = conflicted(&schema);
            let (state, _) = edit(&schema, &state, "slug", "Acme!");
            assert_eq!(state.errors.get(&key("slug")).unwrap().class, ErrorClass::Format);
        }

        #[test]
        fn test_available_clears_only_conflict_message() {
            let schema = schema();
            let state = conflicted(&schema);
            let cleared = apply_resolution(&schema, &state, &resolve("slug", "acme", Verdict::Available));
            assert!(!cleared.errors.contains(&key("slug")));

            let (formatted, _) = edit(&schema, &SessionState::default(), "slug", "Bad Slug");
            let kept = apply_resolution(&schema, &formatted, &resolve("slug", "bad", Verdict::Available));
            assert_eq!(kept.errors.get(&key("slug")).unwrap().class, ErrorClass::Format);
        }

        #[test]
        fn test_conflict_never_overwrites_local_error() {
            let schema = schema();
            let (formatted, _) = edit(&schema, &SessionState::default(), "slug", "Bad Slug");
            let state = apply_resolution(
                &schema,
                &formatted,
                &resolve("slug", "bad", Verdict::Conflict { suggestions: None }),
            );
            assert_eq!(state.errors.get(&key("slug")).unwrap().class, ErrorClass::Format);
        }

        #[test]
        fn test_unreachable_clears_conflict_without_new_error() {
            let schema = schema();
            let state = conflicted(&schema);
            let state = apply_resolution(
                &schema,
                &state,
                &resolve("slug", "acme", Verdict::Unreachable("timeout".into())),
            );
            assert!(!state.errors.contains(&key("slug")));

            let untouched = apply_resolution(
                &schema,
                &SessionState::default(),
                &resolve("email", "a@b.com", Verdict::Unreachable("timeout".into())),
            );
            assert!(untouched.errors.is_empty());
        }
    }

    mod navigation {
        use super::*;
        use pretty_assertions::assert_eq;

        fn filled_first(schema: &FormSchema) -> SessionState {
            let (state, _) = edit(schema, &SessionState::default(), "name", "Acme");
            edit(schema, &state, "city", "Pune").0
        }

        #[test]
        fn test_go_next_blocked_by_missing_required() {
            let schema = schema();
            let (state, _) = edit(&schema, &SessionState::default(), "name", "Acme");
            let (state, advanced) = go_next(&schema, &state, Instant::now());
            assert!(!advanced);
            assert_eq!(state.runtime.current(), 0);
            assert_eq!(state.errors.get(&key("city")).unwrap().class, ErrorClass::Required);
        }

        #[test]
        fn test_go_next_advances_and_visits() {
            let schema = schema();
            let (state, advanced) = go_next(&schema, &filled_first(&schema), Instant::now());
            assert!(advanced);
            assert_eq!(state.runtime.current(), 1);
            assert!(state.runtime.is_visited(1));
        }

        #[test]
        fn test_format_error_does_not_block() {
            let schema = schema();
            let state = filled_first(&schema);
            let (state, _) = go_next(&schema, &state, Instant::now());
            let (state, _) = edit(&schema, &state, "slug", "acme");
            let (state, _) = edit(&schema, &state, "email", "a@b");
            let (state, advanced) = go_next(&schema, &state, Instant::now());
            assert!(advanced);
            assert_eq!(state.runtime.current(), 2);
            assert!(state.errors.contains(&key("email")));
        }

        #[test]
        fn test_go_next_on_last_step() {
            let schema = schema();
            let mut state = SessionState::default();
            state.runtime = state.runtime.at(2);
            let (state, advanced) = go_next(&schema, &state, Instant::now());
            assert!(!advanced);
            assert_eq!(state.runtime.current(), 2);
        }

        #[test]
        fn test_go_previous_clamps_at_zero() {
            let schema = schema();
            let state = go_previous(&schema, &SessionState::default(), Instant::now());
            assert_eq!(state.runtime.current(), 0);
        }

        #[test]
        fn test_go_to_stops_at_first_failing_step() {
            let schema = schema();
            let (state, reached) = go_to(&schema, &filled_first(&schema), 2, Instant::now());
            assert!(!reached);
            assert_eq!(state.runtime.current(), 1);
            assert!(state.errors.contains(&key("slug")));
        }

        #[test]
        fn test_go_to_clamps_target() {
            let schema = schema();
            let state = filled_first(&schema);
            let (state, _) = edit(&schema, &state, "slug", "acme");
            let (state, reached) = go_to(&schema, &state, 99, Instant::now());
            assert!(reached);
            assert_eq!(state.runtime.current(), 2);
        }

        #[test]
        fn test_go_to_backwards_always_succeeds() {
            let schema = schema();
            let mut state = SessionState::default();
            state.runtime = state.runtime.at(2);
            let (state, reached) = go_to(&schema, &state, 0, Instant::now());
            assert!(reached);
            assert_eq!(state.runtime.current(), 0);
            assert!(state.runtime.is_visited(1));
        }

        #[test]
        fn test_visited_is_monotonic() {
            let schema = schema();
            let now = Instant::now();
            let mut state = filled_first(&schema);
            let mut seen = state.runtime.visited().clone();
            let moves: [&dyn Fn(&SessionState) -> SessionState; 5] = [
                &|s| go_next(&schema, s, now).0,
                &|s| go_to(&schema, s, 0, now).0,
                &|s| go_previous(&schema, s, now),
                &|s| go_to(&schema, s, 5, now).0,
                &|s| go_next(&schema, s, now).0,
            ];
            for step in moves {
                state = step(&state);
                assert!(seen.is_subset(state.runtime.visited()));
                seen = state.runtime.visited().clone();
            }
        }
    }

    mod derivations {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_completed_ignores_error_map() {
            let schema = schema();
            let (state, _) = edit(&schema, &SessionState::default(), "slug", "acme");
            let state = apply_resolution(
                &schema,
                &state,
                &resolve("slug", "acme", Verdict::Conflict { suggestions: None }),
            );
            assert_eq!(completed(&schema, &state.values), vec![false, true, true]);
        }

        #[test]
        fn test_highlight_expires() {
            let schema = schema();
            let start = Instant::now();
            let window = Duration::from_millis(1500);
            let (state, _) = go_next(&schema, &SessionState::default(), start);
            assert_eq!(
                incomplete_highlight(&schema, &state, start, window),
                vec![true, false, false]
            );
            assert_eq!(
                incomplete_highlight(&schema, &state, start + window, window),
                vec![false, false, false]
            );
        }

        #[test]
        fn test_highlight_intensity_fades() {
            let schema = schema();
            let start = Instant::now();
            let window = Duration::from_millis(1000);
            let (state, _) = go_next(&schema, &SessionState::default(), start);
            let early = highlight_intensity(&state, start, window);
            let late = highlight_intensity(&state, start + Duration::from_millis(900), window);
            assert!((early - 1.0).abs() < 1e-6);
            assert!(late < early);
            assert_eq!(highlight_intensity(&state, start + window, window), 0.0);
        }

        #[test]
        fn test_gate_submission_focuses_first_failing_step() {
            let schema = schema();
            let mut state = SessionState::default();
            state.runtime = state.runtime.at(2);
            let (state, block) = gate_submission(&schema, &state, Instant::now());
            let block = block.unwrap();
            assert_eq!(block.step, 0);
            assert_eq!(block.fields, vec![key("name"), key("city")]);
            assert_eq!(state.runtime.current(), 0);
        }

        #[test]
        fn test_gate_submission_blocks_on_conflict() {
            let schema = schema();
            let (state, _) = edit(&schema, &SessionState::default(), "name", "Acme");
            let (state, _) = edit(&schema, &state, "city", "Pune");
            let (state, _) = edit(&schema, &state, "slug", "acme");
            let state = apply_resolution(
                &schema,
                &state,
                &resolve("slug", "acme", Verdict::Conflict { suggestions: None }),
            );
            let (_, block) = gate_submission(&schema, &state, Instant::now());
            assert_eq!(
                block,
                Some(SubmitBlock {
                    step: 1,
                    fields: vec![key("slug")]
                })
            );
        }

        #[test]
        fn test_gate_submission_passes() {
            let schema = schema();
            let (state, _) = edit(&schema, &SessionState::default(), "name", "Acme");
            let (state, _) = edit(&schema, &state, "city", "Pune");
            let (state, _) = edit(&schema, &state, "slug", "acme");
            let (_, block) = gate_submission(&schema, &state, Instant::now());
            assert!(block.is_none());
        }
    }
}
