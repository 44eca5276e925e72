//! Form values and the nested value tree
//!
//! The tree is persistent: `with_field` copies the path from the root to the
//! written leaf and shares every untouched subtree with the previous version.
//! Consumers can therefore detect changes with [`FormValueTree::same_as`].

use super::key::FieldKey;
use crate::error::{Result, WizardError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

type Mapping = BTreeMap<String, FormValue>;

/// Type-safe field values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
    Map(Arc<Mapping>),
}

impl Default for FormValue {
    fn default() -> Self {
        FormValue::Text(String::new())
    }
}

impl FormValue {
    pub fn text(value: impl Into<String>) -> Self {
        FormValue::Text(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FormValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Empty means: blank text, unchecked box, empty list or empty mapping
    pub fn is_empty(&self) -> bool {
        match self {
            FormValue::Bool(b) => !b,
            FormValue::Text(s) => s.trim().is_empty(),
            FormValue::List(items) => items.iter().all(|i| i.trim().is_empty()),
            FormValue::Map(m) => m.values().all(FormValue::is_empty),
        }
    }

    /// Get the text value (returns empty string for non-text values)
    pub fn as_text(&self) -> &str {
        match self {
            FormValue::Text(s) => s,
            _ => "",
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, FormValue::Bool(true))
    }

    pub fn as_list(&self) -> &[String] {
        match self {
            FormValue::List(items) => items,
            _ => &[],
        }
    }

    /// Get the display value for rendering
    pub fn display_value(&self) -> String {
        match self {
            FormValue::Bool(true) => "[x]".to_string(),
            FormValue::Bool(false) => "[ ]".to_string(),
            FormValue::Text(s) => s.clone(),
            FormValue::List(items) => items.join(", "),
            FormValue::Map(m) => m
                .iter()
                .map(|(k, v)| format!("{k}={}", v.display_value()))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Nested, structurally shared mapping of form values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormValueTree {
    root: Arc<Mapping>,
}

impl FormValueTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve a dotted key against the tree
    pub fn get(&self, key: &FieldKey) -> Option<&FormValue> {
        let mut segments = key.segments();
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            match current {
                FormValue::Map(m) => current = m.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Text at `key`, or the empty string when absent or not text
    pub fn text(&self, key: &FieldKey) -> &str {
        self.get(key).map(FormValue::as_text).unwrap_or("")
    }

    /// True when the key is absent or holds an empty value
    pub fn is_empty_at(&self, key: &FieldKey) -> bool {
        self.get(key).map_or(true, FormValue::is_empty)
    }

    /// Return a new tree with `key` set to `value`. Intermediate mappings are
    /// created as needed; the receiver is left untouched.
    pub fn with_field(&self, key: &FieldKey, value: FormValue) -> Result<Self> {
        let segments: Vec<&str> = key.segments().collect();
        let root = set_path(&self.root, &segments, value, key)?;
        Ok(Self {
            root: Arc::new(root),
        })
    }

    /// Identity comparison: true when both handles share the same root
    pub fn same_as(&self, other: &FormValueTree) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    /// JSON payload for the submission service
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

fn set_path(map: &Mapping, segments: &[&str], value: FormValue, key: &FieldKey) -> Result<Mapping> {
    let mut copy = map.clone();
    match segments {
        [] => return Err(WizardError::InvalidFieldKey(key.to_string())),
        [leaf] => {
            copy.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = match map.get(*head) {
                None => set_path(&Mapping::new(), rest, value, key)?,
                Some(FormValue::Map(inner)) => set_path(inner, rest, value, key)?,
                Some(_) => {
                    return Err(WizardError::PathConflict {
                        key: key.to_string(),
                    })
                }
            };
            copy.insert((*head).to_string(), FormValue::Map(Arc::new(child)));
        }
    }
    Ok(copy)
}
