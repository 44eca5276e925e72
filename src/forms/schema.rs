//! Form schema: ordered steps and the field registry
//!
//! A schema is built once per form type and never changes afterwards. All
//! lookups are pure; out-of-range step indexes produce
//! [`WizardError::StepOutOfRange`] and callers clamp with
//! [`FormSchema::clamp_step`] before asking.

use super::field::FieldSpec;
use super::key::FieldKey;
use crate::error::{Result, WizardError};
use std::collections::{BTreeMap, BTreeSet};

/// A contiguous, user-facing partition of form fields
#[derive(Debug, Clone)]
pub struct Step {
    pub index: usize,
    pub title: String,
    pub description: String,
    /// Member fields in display order
    pub fields: Vec<FieldKey>,
}

/// Source fields the slug suggestion generator draws from
#[derive(Debug, Clone)]
pub struct SuggestionPlan {
    /// Field that receives the suggestions (the slug)
    pub target: FieldKey,
    /// Field the slug base is derived from
    pub primary: FieldKey,
    /// Descriptive fields combined with the base
    pub secondary: Vec<FieldKey>,
}

impl SuggestionPlan {
    /// True when `key` feeds the generator
    pub fn is_source(&self, key: &FieldKey) -> bool {
        &self.primary == key || self.secondary.contains(key)
    }
}

/// Declarative schema for a multi-step form
#[derive(Debug, Clone)]
pub struct FormSchema {
    pub name: String,
    pub title: String,
    steps: Vec<Step>,
    fields: BTreeMap<FieldKey, FieldSpec>,
    step_of: BTreeMap<FieldKey, usize>,
    required: BTreeSet<FieldKey>,
    suggestions: Option<SuggestionPlan>,
}

impl FormSchema {
    pub fn builder(name: impl Into<String>, title: impl Into<String>) -> FormSchemaBuilder {
        FormSchemaBuilder {
            name: name.into(),
            title: title.into(),
            steps: Vec::new(),
            suggestions: None,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn get_step(&self, index: usize) -> Result<&Step> {
        self.steps.get(index).ok_or(WizardError::StepOutOfRange {
            index,
            len: self.steps.len(),
        })
    }

    /// Required members of step `index`
    pub fn fields_required_in(&self, index: usize) -> Result<BTreeSet<FieldKey>> {
        let step = self.get_step(index)?;
        Ok(step
            .fields
            .iter()
            .filter(|key| self.required.contains(*key))
            .cloned()
            .collect())
    }

    pub fn step_containing(&self, key: &FieldKey) -> Option<usize> {
        self.step_of.get(key).copied()
    }

    pub fn field(&self, key: &FieldKey) -> Option<&FieldSpec> {
        self.fields.get(key)
    }

    /// Look up a field by its dotted name
    pub fn field_by_name(&self, name: &str) -> Option<&FieldSpec> {
        FieldKey::parse(name).ok().and_then(|key| self.fields.get(&key))
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values()
    }

    pub fn required_fields(&self) -> &BTreeSet<FieldKey> {
        &self.required
    }

    pub fn is_required(&self, key: &FieldKey) -> bool {
        self.required.contains(key)
    }

    /// Fields whose edits go through the uniqueness checker
    pub fn identity_fields(&self) -> impl Iterator<Item = &FieldKey> {
        self.fields.values().filter(|f| f.unique).map(|f| &f.key)
    }

    pub fn suggestion_plan(&self) -> Option<&SuggestionPlan> {
        self.suggestions.as_ref()
    }

    /// Clamp an arbitrary index into `0..step_count()`
    pub fn clamp_step(&self, index: usize) -> usize {
        index.min(self.steps.len().saturating_sub(1))
    }

    pub fn last_step(&self) -> usize {
        self.steps.len().saturating_sub(1)
    }
}

/// Builder collecting steps before the registry invariants are checked
pub struct FormSchemaBuilder {
    name: String,
    title: String,
    steps: Vec<(String, String, Vec<FieldSpec>)>,
    suggestions: Option<SuggestionPlan>,
}

impl FormSchemaBuilder {
    pub fn step(
        mut self,
        title: impl Into<String>,
        description: impl Into<String>,
        fields: Vec<FieldSpec>,
    ) -> Self {
        self.steps.push((title.into(), description.into(), fields));
        self
    }

    pub fn suggestions(mut self, plan: SuggestionPlan) -> Self {
        self.suggestions = Some(plan);
        self
    }

    /// Validate registry invariants and freeze the schema
    pub fn build(self) -> Result<FormSchema> {
        if self.steps.is_empty() {
            return Err(WizardError::schema(format!(
                "form '{}' declares no steps",
                self.name
            )));
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        let mut fields = BTreeMap::new();
        let mut step_of = BTreeMap::new();
        let mut required = BTreeSet::new();

        for (index, (title, description, specs)) in self.steps.into_iter().enumerate() {
            let mut keys = Vec::with_capacity(specs.len());
            for spec in specs {
                if let Some(previous) = step_of.insert(spec.key.clone(), index) {
                    return Err(WizardError::schema(format!(
                        "field '{}' appears in steps {previous} and {index}",
                        spec.key
                    )));
                }
                if spec.required {
                    required.insert(spec.key.clone());
                }
                keys.push(spec.key.clone());
                fields.insert(spec.key.clone(), spec);
            }
            steps.push(Step {
                index,
                title,
                description,
                fields: keys,
            });
        }

        if let Some(plan) = &self.suggestions {
            let referenced = std::iter::once(&plan.target)
                .chain(std::iter::once(&plan.primary))
                .chain(plan.secondary.iter());
            for key in referenced {
                if !fields.contains_key(key) {
                    return Err(WizardError::UnknownField(key.to_string()));
                }
            }
        }

        Ok(FormSchema {
            name: self.name,
            title: self.title,
            steps,
            fields,
            step_of,
            required,
            suggestions: self.suggestions,
        })
    }
}
