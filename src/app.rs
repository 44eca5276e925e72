//! Application state and key handling

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use onboarding_wizard::forms::{FieldKey, FieldKind, FieldSpec, FormValue};
use onboarding_wizard::services::RecordSubmissionService;
use onboarding_wizard::{FormSession, SubmitOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Main application struct
pub struct App {
    /// The form being filled in
    pub session: FormSession,
    submitter: Arc<dyn RecordSubmissionService>,
    /// Index of the focused field within the current step
    pub active_field: usize,
    /// Highlighted option of the focused select / multi-select field
    pub option_cursor: usize,
    /// Raw text of free-form list fields, kept so separators survive editing
    list_drafts: HashMap<FieldKey, String>,
    /// Feedback shown in the status bar
    pub status_message: Option<String>,
    /// Record id once the form was accepted
    pub submitted: Option<String>,
    /// Reference point for the spinner animation
    pub started: Instant,
    quit: bool,
}

impl App {
    pub fn new(session: FormSession, submitter: Arc<dyn RecordSubmissionService>) -> Self {
        Self {
            session,
            submitter,
            active_field: 0,
            option_cursor: 0,
            list_drafts: HashMap::new(),
            status_message: None,
            submitted: None,
            started: Instant::now(),
            quit: false,
        }
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Fields of the step currently shown
    pub fn step_fields(&self) -> Vec<FieldKey> {
        self.session
            .schema()
            .get_step(self.session.current_step())
            .map(|step| step.fields.clone())
            .unwrap_or_default()
    }

    pub fn active_key(&self) -> Option<FieldKey> {
        self.step_fields().get(self.active_field).cloned()
    }

    fn active_spec(&self) -> Option<FieldSpec> {
        let key = self.active_key()?;
        self.session.schema().field(&key).cloned()
    }

    /// Apply uniqueness answers that arrived since the last frame
    pub fn tick(&mut self) {
        self.session.pump_checks();
    }

    /// Handle a key event
    pub async fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Esc => self.quit = true,
            KeyCode::Char('s') if ctrl => self.submit().await,
            KeyCode::Char('b') if ctrl => {
                self.blur_active()?;
                self.session.go_previous();
                self.focus_field(0);
            }
            KeyCode::Char('r') if ctrl => {
                self.session.regenerate_suggestions();
                self.status_message = Some("Suggestions refreshed".to_string());
            }
            KeyCode::Char(c) if ctrl && c.is_ascii_digit() => {
                let target = c.to_digit(10).unwrap_or(1).saturating_sub(1) as usize;
                self.blur_active()?;
                if !self.session.go_to(target) {
                    self.status_message = Some("Complete the highlighted fields first".to_string());
                }
                self.focus_field(0);
            }
            KeyCode::Tab => {
                self.blur_active()?;
                let count = self.step_fields().len().max(1);
                self.focus_field((self.active_field + 1) % count);
            }
            KeyCode::BackTab => {
                self.blur_active()?;
                let count = self.step_fields().len().max(1);
                self.focus_field((self.active_field + count - 1) % count);
            }
            KeyCode::Enter => {
                self.blur_active()?;
                if self.session.current_step() == self.session.schema().last_step() {
                    self.submit().await;
                } else if self.session.go_next() {
                    self.status_message = None;
                    self.focus_field(0);
                } else {
                    self.status_message = Some("Complete the required fields to continue".to_string());
                    self.focus_first_error();
                }
            }
            _ if !ctrl => self.edit_active(key.code)?,
            _ => {}
        }
        Ok(())
    }

    fn focus_field(&mut self, index: usize) {
        self.active_field = index;
        self.option_cursor = 0;
    }

    fn focus_first_error(&mut self) {
        let errors = self.session.errors();
        if let Some(index) = self.step_fields().iter().position(|k| errors.contains(k)) {
            self.focus_field(index);
        }
    }

    fn blur_active(&mut self) -> Result<()> {
        if let Some(key) = self.active_key() {
            self.session.blur(&key)?;
        }
        Ok(())
    }

    fn edit_active(&mut self, code: KeyCode) -> Result<()> {
        let Some(spec) = self.active_spec() else {
            return Ok(());
        };
        let key = spec.key.clone();
        let current = self.session.value(&key);

        match (&spec.kind, code) {
            (FieldKind::Checkbox, KeyCode::Char(' ')) => {
                self.session
                    .set_field(&key, FormValue::Bool(!current.as_bool()))?;
            }
            (FieldKind::Select { options }, KeyCode::Left | KeyCode::Right) if !options.is_empty() => {
                self.option_cursor = step_cursor(self.option_cursor, options.len(), code);
                self.session
                    .set_field(&key, FormValue::text(options[self.option_cursor].clone()))?;
            }
            (FieldKind::MultiSelect { options }, KeyCode::Left | KeyCode::Right) if !options.is_empty() => {
                self.option_cursor = step_cursor(self.option_cursor, options.len(), code);
            }
            (FieldKind::MultiSelect { options }, KeyCode::Char(' ')) if !options.is_empty() => {
                let option = &options[self.option_cursor.min(options.len() - 1)];
                let mut chosen: Vec<String> = current.as_list().to_vec();
                if let Some(pos) = chosen.iter().position(|c| c == option) {
                    chosen.remove(pos);
                } else {
                    chosen.push(option.clone());
                }
                // Keep the declared option order
                chosen.sort_by_key(|c| options.iter().position(|o| o == c));
                self.session.set_field(&key, FormValue::List(chosen))?;
            }
            (FieldKind::MultiSelect { options }, KeyCode::Char(c)) if options.is_empty() => {
                let draft = self.list_drafts.entry(key.clone()).or_default();
                draft.push(c);
                let value = split_list(draft);
                self.session.set_field(&key, value)?;
            }
            (FieldKind::MultiSelect { options }, KeyCode::Backspace) if options.is_empty() => {
                let draft = self.list_drafts.entry(key.clone()).or_default();
                draft.pop();
                let value = split_list(draft);
                self.session.set_field(&key, value)?;
            }
            (FieldKind::Slug, KeyCode::Up | KeyCode::Down) => self.cycle_suggestion(&key, code)?,
            (FieldKind::Select { .. }, _) => {}
            (_, KeyCode::Char(c)) if spec.kind.is_textual() => {
                let mut text = current.as_text().to_string();
                text.push(c);
                self.session.set_field(&key, FormValue::text(text))?;
            }
            (_, KeyCode::Backspace) if spec.kind.is_textual() => {
                let mut text = current.as_text().to_string();
                text.pop();
                self.session.set_field(&key, FormValue::text(text))?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Write the next (or previous) offered suggestion into the field
    fn cycle_suggestion(&mut self, key: &FieldKey, code: KeyCode) -> Result<()> {
        let suggestions = self.session.suggestions_for(key).to_vec();
        if suggestions.is_empty() {
            return Ok(());
        }
        let current = self.session.value(key);
        let next = match suggestions.iter().position(|s| s == current.as_text()) {
            Some(pos) => step_cursor(pos, suggestions.len(), code),
            None => 0,
        };
        self.session
            .set_field(key, FormValue::text(suggestions[next].clone()))?;
        Ok(())
    }

    async fn submit(&mut self) {
        let outcome = self.session.submit(self.submitter.as_ref()).await;
        match outcome {
            SubmitOutcome::Submitted { id } => {
                self.status_message = Some(format!("Submitted. Reference {id}"));
                self.submitted = Some(id);
            }
            SubmitOutcome::Blocked { step, fields } => {
                let title = self
                    .session
                    .schema()
                    .get_step(step)
                    .map(|s| s.title.clone())
                    .unwrap_or_default();
                self.status_message = Some(format!(
                    "{} field(s) need attention in {}",
                    fields.len(),
                    title
                ));
                self.focus_field(0);
                self.focus_first_error();
            }
            SubmitOutcome::Failed { message } => self.status_message = Some(message),
        }
    }
}

fn step_cursor(cursor: usize, len: usize, code: KeyCode) -> usize {
    match code {
        KeyCode::Left | KeyCode::Up => (cursor + len - 1) % len,
        _ => (cursor + 1) % len,
    }
}

fn split_list(raw: &str) -> FormValue {
    FormValue::list(
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboarding_wizard::forms::partner_registration;
    use onboarding_wizard::services::InMemoryDirectory;
    use onboarding_wizard::SessionOptions;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app() -> App {
        let directory = Arc::new(InMemoryDirectory::new());
        let session = FormSession::new(
            partner_registration(),
            directory.clone(),
            SessionOptions::default(),
        );
        App::new(session, directory)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(press(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_typing_edits_active_field() {
        let mut app = app();
        type_text(&mut app, "Acmx").await;
        app.handle_key(press(KeyCode::Backspace)).await.unwrap();
        type_text(&mut app, "e").await;
        let key = FieldKey::parse("businessName").unwrap();
        assert_eq!(app.session.value(&key).as_text(), "Acme");
    }

    #[tokio::test]
    async fn test_tab_cycles_fields() {
        let mut app = app();
        let count = app.step_fields().len();
        for _ in 0..count {
            app.handle_key(press(KeyCode::Tab)).await.unwrap();
        }
        assert_eq!(app.active_field, 0);
        app.handle_key(press(KeyCode::BackTab)).await.unwrap();
        assert_eq!(app.active_field, count - 1);
    }

    #[tokio::test]
    async fn test_enter_blocked_sets_status() {
        let mut app = app();
        app.handle_key(press(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.session.current_step(), 0);
        assert!(app.status_message.is_some());
        assert!(!app.session.errors().is_empty());
    }

    #[tokio::test]
    async fn test_select_cycles_options() {
        let mut app = app();
        app.handle_key(press(KeyCode::Tab)).await.unwrap();
        app.handle_key(press(KeyCode::Right)).await.unwrap();
        let key = FieldKey::parse("category").unwrap();
        assert!(!app.session.value(&key).is_empty());
    }

    #[tokio::test]
    async fn test_ctrl_b_on_first_step_stays() {
        let mut app = app();
        app.handle_key(ctrl('b')).await.unwrap();
        assert_eq!(app.session.current_step(), 0);
    }

    #[tokio::test]
    async fn test_escape_quits() {
        let mut app = app();
        app.handle_key(press(KeyCode::Esc)).await.unwrap();
        assert!(app.should_quit());
    }

    #[test]
    fn test_split_list_ignores_blanks() {
        assert_eq!(
            split_list("red, ,blue,"),
            FormValue::list(["red", "blue"])
        );
    }
}
