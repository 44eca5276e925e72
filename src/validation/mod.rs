//! Synchronous field and step validation
//!
//! Everything here is pure: the same value always yields the same error, so
//! the session can re-run validation on every keystroke.

mod rules;

pub use rules::PHONE_DIGIT_LENGTHS;

use crate::error::{Result, WizardError};
use crate::forms::{FieldKey, FieldKind, FieldSpec, FormSchema, FormValue, FormValueTree};
use crate::session::FieldError;
use std::collections::BTreeMap;

/// Validator bound to one form schema
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a FormSchema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a FormSchema) -> Self {
        Self { schema }
    }

    /// Format / required error for `value` at `key`, if any
    pub fn validate_field(&self, key: &FieldKey, value: &FormValue) -> Result<Option<FieldError>> {
        let spec = self
            .schema
            .field(key)
            .ok_or_else(|| WizardError::UnknownField(key.to_string()))?;
        Ok(check_spec(spec, value))
    }

    /// Fields of step `index` currently failing format or required checks
    pub fn validate_step(
        &self,
        index: usize,
        values: &FormValueTree,
    ) -> Result<BTreeMap<FieldKey, FieldError>> {
        let step = self.schema.get_step(index)?;
        let mut failing = BTreeMap::new();
        for key in &step.fields {
            let Some(spec) = self.schema.field(key) else {
                continue;
            };
            let fallback = spec.kind.empty_value();
            let value = values.get(key).unwrap_or(&fallback);
            if let Some(error) = check_spec(spec, value) {
                failing.insert(key.clone(), error);
            }
        }
        Ok(failing)
    }
}

/// True when any error in a step report is a missing required value
pub fn blocks_navigation(report: &BTreeMap<FieldKey, FieldError>) -> bool {
    report.values().any(FieldError::is_required)
}

/// Message written when the check service reports an existing record
pub fn conflict_message(spec: &FieldSpec) -> String {
    format!("{} is already registered", spec.label)
}

fn check_spec(spec: &FieldSpec, value: &FormValue) -> Option<FieldError> {
    if value.is_empty() {
        return spec.required.then(|| FieldError::required(required_message(spec)));
    }

    let message = match (&spec.kind, value) {
        (FieldKind::Checkbox, FormValue::Bool(_)) => None,
        (FieldKind::MultiSelect { options }, FormValue::List(items)) => {
            (!options.is_empty() && items.iter().any(|i| !options.contains(i)))
                .then(|| "Choose from the listed options".to_string())
        }
        (FieldKind::Select { options }, FormValue::Text(text)) => (!options.is_empty()
            && !options.iter().any(|o| o == text.trim()))
        .then(|| "Choose one of the listed options".to_string()),
        (kind, FormValue::Text(text)) => match kind {
            FieldKind::Text => None,
            FieldKind::Email => rules::email(text),
            FieldKind::Phone => rules::phone(text),
            FieldKind::TaxId(tax) => rules::tax_id(*tax, text),
            FieldKind::Slug => rules::slug(text),
            FieldKind::Pincode => rules::pincode(text),
            FieldKind::Amount => rules::amount(text),
            FieldKind::Integer => rules::integer(text),
            FieldKind::Time => rules::time(text),
            _ => Some(format!("{} has an unexpected value", spec.label)),
        },
        _ => Some(format!("{} has an unexpected value", spec.label)),
    };

    message.map(|m| FieldError::format(m, value.display_value()))
}

fn required_message(spec: &FieldSpec) -> String {
    match spec.kind {
        FieldKind::Checkbox => format!("Please confirm: {}", spec.label),
        FieldKind::MultiSelect { .. } => format!("Select at least one option for {}", spec.label),
        _ => format!("{} is required", spec.label),
    }
}
