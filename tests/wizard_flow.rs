//! End-to-end behaviour of a form session against realistic collaborators

use async_trait::async_trait;
use onboarding_wizard::forms::{
    partner_registration, product_creation, FieldKey, FieldKind, FieldSpec, FormSchema, FormValue,
};
use onboarding_wizard::services::{CheckResponse, InMemoryDirectory, UniquenessCheckService};
use onboarding_wizard::session::{ErrorClass, SUBMIT_RETRY_MESSAGE};
use onboarding_wizard::suggestions::{generate_slug_suggestions, slug_candidates};
use onboarding_wizard::validation::Validator;
use onboarding_wizard::{FormSession, SessionOptions, SubmitOutcome};
use pretty_assertions::assert_eq;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(500);

fn key(raw: &str) -> FieldKey {
    FieldKey::parse(raw).unwrap()
}

fn options() -> SessionOptions {
    SessionOptions {
        debounce: DEBOUNCE,
        ..SessionOptions::default()
    }
}

/// Records every call and answers from a script, optionally after a delay
#[derive(Default)]
struct ScriptedChecks {
    calls: Mutex<Vec<(String, String)>>,
    answers: HashMap<String, (Duration, CheckResponse)>,
}

impl ScriptedChecks {
    fn answer(mut self, value: &str, delay: Duration, response: CheckResponse) -> Self {
        self.answers.insert(value.to_string(), (delay, response));
        self
    }

    fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UniquenessCheckService for ScriptedChecks {
    async fn check(&self, field: &str, value: &str) -> anyhow::Result<CheckResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((field.to_string(), value.to_string()));
        let (delay, response) = self
            .answers
            .get(value)
            .cloned()
            .unwrap_or((Duration::ZERO, CheckResponse::available()));
        tokio::time::sleep(delay).await;
        Ok(response)
    }
}

fn two_step_schema() -> Arc<FormSchema> {
    Arc::new(
        FormSchema::builder("signup", "Sign up")
            .step(
                "Basics",
                "",
                vec![
                    FieldSpec::new(key("name"), "Name", FieldKind::Text).required(),
                    FieldSpec::new(key("city"), "City", FieldKind::Text).required(),
                ],
            )
            .step(
                "Contact",
                "",
                vec![FieldSpec::new(key("email"), "Email", FieldKind::Email)
                    .required()
                    .unique()],
            )
            .build()
            .unwrap(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_next_blocked_until_city_filled() {
    let mut session = FormSession::new(
        two_step_schema(),
        Arc::new(InMemoryDirectory::new()),
        options(),
    );
    session.set_field(&key("name"), FormValue::text("Acme")).unwrap();

    assert!(!session.go_next());
    assert_eq!(session.current_step(), 0);
    assert_eq!(
        session.errors().get(&key("city")).unwrap().class,
        ErrorClass::Required
    );

    session.set_field(&key("city"), FormValue::text("Delhi")).unwrap();
    assert!(!session.errors().contains(&key("city")));
    assert!(session.go_next());
    assert_eq!(session.current_step(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_edits_inside_debounce_window_issue_one_check() {
    let checks = Arc::new(ScriptedChecks::default());
    let mut session = FormSession::new(two_step_schema(), checks.clone(), options());

    session.set_field(&key("email"), FormValue::text("a@b")).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    session.set_field(&key("email"), FormValue::text("a@b.com")).unwrap();
    session.settle_checks().await;

    assert_eq!(
        checks.calls(),
        vec![("email".to_string(), "a@b.com".to_string())]
    );
    assert!(session.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slug_conflict_shows_offered_suggestions() {
    let offered = vec!["acme-delhi".to_string(), "acme-retail".to_string()];
    let checks = ScriptedChecks::default().answer(
        "acme",
        Duration::ZERO,
        CheckResponse::taken(Some(offered.clone())),
    );
    let mut session = FormSession::new(partner_registration(), Arc::new(checks), options());

    session
        .set_field_by_name("profileSlug", FormValue::text("acme"))
        .unwrap();
    session.settle_checks().await;

    let slug = key("profileSlug");
    let error = session.errors().get(&slug).unwrap();
    assert_eq!(error.class, ErrorClass::Conflict);
    assert_eq!(error.message, "Profile URL is already registered");
    assert_eq!(session.suggestions_for(&slug), offered.as_slice());
}

#[test]
fn test_pan_prefix_lengths_report_exact_length() {
    let schema = partner_registration();
    let validator = Validator::new(&schema);
    let full = "ABCDE1234F";
    for len in 1..full.len() {
        let error = validator
            .validate_field(&key("panNumber"), &FormValue::text(&full[..len]))
            .unwrap()
            .unwrap();
        assert_eq!(error.message, "PAN must be exactly 10 characters", "length {len}");
    }
    assert!(validator
        .validate_field(&key("panNumber"), &FormValue::text(full))
        .unwrap()
        .is_none());
}

#[test]
fn test_format_validation_is_idempotent() {
    let schema = partner_registration();
    let validator = Validator::new(&schema);
    let samples = [
        ("email", "not-an-email"),
        ("phone", "12345"),
        ("gstNumber", "22ABCDE1234F1Z"),
        ("pincode", "012345"),
        ("profileSlug", "Acme Store"),
    ];
    for (field, raw) in samples {
        let value = FormValue::text(raw);
        let first = validator.validate_field(&key(field), &value).unwrap();
        let second = validator.validate_field(&key(field), &value).unwrap();
        assert!(first.is_some(), "{field}");
        assert_eq!(first, second);
    }
}

#[tokio::test(start_paused = true)]
async fn test_visited_set_only_grows() {
    let mut session = FormSession::new(
        two_step_schema(),
        Arc::new(InMemoryDirectory::new()),
        options(),
    );
    session.set_field(&key("name"), FormValue::text("Acme")).unwrap();
    session.set_field(&key("city"), FormValue::text("Pune")).unwrap();

    let mut seen = session.state().runtime.visited().clone();
    let moves: [fn(&mut FormSession); 5] = [
        |s| {
            s.go_next();
        },
        |s| {
            s.go_previous();
        },
        |s| {
            s.go_to(7);
        },
        |s| {
            s.go_previous();
        },
        |s| {
            s.go_previous();
        },
    ];
    for step in moves {
        step(&mut session);
        let visited = session.state().runtime.visited().clone();
        assert!(seen.is_subset(&visited));
        seen = visited;
    }
    assert_eq!(seen, BTreeSet::from([0, 1]));
}

#[tokio::test(start_paused = true)]
async fn test_late_answer_for_old_value_is_ignored() {
    let checks = ScriptedChecks::default()
        .answer("acme", Duration::from_secs(5), CheckResponse::taken(None))
        .answer("acme-store", Duration::from_millis(50), CheckResponse::available());
    let mut session = FormSession::new(partner_registration(), Arc::new(checks), options());
    let slug = key("profileSlug");

    session.set_field(&slug, FormValue::text("acme")).unwrap();
    session.blur(&slug).unwrap();
    session.set_field(&slug, FormValue::text("acme-store")).unwrap();
    session.settle_checks().await;
    assert!(session.check_status(&slug).checked);

    tokio::time::sleep(Duration::from_secs(10)).await;
    session.pump_checks();
    assert!(!session.errors().contains(&slug));
}

#[tokio::test(start_paused = true)]
async fn test_conflict_does_not_survive_emptying_and_retyping() {
    let checks = ScriptedChecks::default().answer(
        "a@b.com",
        Duration::from_secs(1),
        CheckResponse::taken(None),
    );
    let mut session = FormSession::new(two_step_schema(), Arc::new(checks), options());
    let email = key("email");

    session.set_field(&email, FormValue::text("a@b.com")).unwrap();
    session.settle_checks().await;
    assert!(session.errors().get(&email).unwrap().is_conflict());

    session.set_field(&email, FormValue::text("")).unwrap();
    assert_eq!(session.errors().get(&email).unwrap().class, ErrorClass::Required);

    session.set_field(&email, FormValue::text("a@b.com")).unwrap();
    assert!(!session.errors().contains(&email));
    assert!(session.check_status(&email).pending);

    session.settle_checks().await;
    assert!(session.errors().get(&email).unwrap().is_conflict());
}

#[tokio::test(start_paused = true)]
async fn test_completion_ignores_pending_checks() {
    let checks = ScriptedChecks::default().answer(
        "a@b.com",
        Duration::from_secs(30),
        CheckResponse::taken(None),
    );
    let mut session = FormSession::new(two_step_schema(), Arc::new(checks), options());
    session.set_field(&key("email"), FormValue::text("a@b.com")).unwrap();
    session.blur(&key("email")).unwrap();

    assert!(session.check_status(&key("email")).checking);
    assert_eq!(session.completed(), vec![false, true]);
}

#[test]
fn test_suggestion_set_is_deterministic() {
    let sources = ["Indiranagar", "Bengaluru", "restaurant", "Karnataka"];
    let expected: BTreeSet<String> = slug_candidates("Acme Foods", &sources)
        .into_iter()
        .take(6)
        .collect();
    for _ in 0..10 {
        let got: BTreeSet<String> = generate_slug_suggestions("Acme Foods", &sources, 6)
            .into_iter()
            .collect();
        assert_eq!(got, expected);
    }
}

#[tokio::test(start_paused = true)]
async fn test_product_form_submits_to_directory() {
    let directory = Arc::new(
        InMemoryDirectory::new()
            .with_slug_field("sku")
            .with_registered("sku", ["tea-500g"]),
    );
    let mut session = FormSession::new(product_creation(), directory.clone(), options());

    for (field, value) in [
        ("name", "Assam Tea"),
        ("category", "grocery"),
        ("price", "249.00"),
        ("sku", "tea-500g"),
        ("stock", "40"),
    ] {
        session.set_field_by_name(field, FormValue::text(value)).unwrap();
    }

    let blocked = session.submit(directory.as_ref()).await;
    assert_eq!(
        blocked,
        SubmitOutcome::Blocked {
            step: 2,
            fields: vec![key("sku")]
        }
    );
    assert_eq!(session.current_step(), 2);

    session.set_field_by_name("sku", FormValue::text("tea-1kg")).unwrap();
    let outcome = session.submit(directory.as_ref()).await;
    assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));
    assert!(directory.is_taken("sku", "tea-1kg").await);
    let records = directory.records().await;
    assert_eq!(records[0].payload["values"]["name"], "Assam Tea");
}

#[tokio::test(start_paused = true)]
async fn test_submission_failure_prompts_retry() {
    let directory = Arc::new(InMemoryDirectory::new().with_registered("email", ["taken@b.com"]));
    // Checks say everything is free, the store disagrees at submit time
    let checks = Arc::new(ScriptedChecks::default());
    let mut session = FormSession::new(two_step_schema(), checks, options());
    session.set_field(&key("name"), FormValue::text("Acme")).unwrap();
    session.set_field(&key("city"), FormValue::text("Pune")).unwrap();
    session.set_field(&key("email"), FormValue::text("taken@b.com")).unwrap();

    let outcome = session.submit(directory.as_ref()).await;
    assert_eq!(
        outcome,
        SubmitOutcome::Failed {
            message: SUBMIT_RETRY_MESSAGE.to_string()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_one_pause_issues_one_call_even_if_unpumped() {
    let checks = Arc::new(ScriptedChecks::default());
    let directory = InMemoryDirectory::new();
    let mut session = FormSession::new(two_step_schema(), checks.clone(), options());
    session.set_field(&key("name"), FormValue::text("Acme")).unwrap();
    session.set_field(&key("city"), FormValue::text("Pune")).unwrap();
    session.set_field(&key("email"), FormValue::text("a@b.com")).unwrap();

    tokio::time::sleep(DEBOUNCE + Duration::from_millis(100)).await;
    session.blur(&key("email")).unwrap();
    let outcome = session.submit(&directory).await;

    assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));
    assert_eq!(
        checks.calls(),
        vec![("email".to_string(), "a@b.com".to_string())]
    );
}
