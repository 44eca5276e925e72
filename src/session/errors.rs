//! Per-field error map shared by the validator and the uniqueness checker

use crate::forms::FieldKey;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which writer produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed value (local, synchronous)
    Format,
    /// Empty required field (local, synchronous)
    Required,
    /// Value already bound to another record (remote, asynchronous)
    Conflict,
}

/// One message attached to a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub class: ErrorClass,
    pub message: String,
    /// Value the error was evaluated against
    pub value: String,
}

impl FieldError {
    pub fn format(message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Format,
            message: message.into(),
            value: value.into(),
        }
    }

    pub fn required(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Required,
            message: message.into(),
            value: String::new(),
        }
    }

    pub fn conflict(message: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Conflict,
            message: message.into(),
            value: value.into(),
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.class == ErrorClass::Conflict
    }

    pub fn is_required(&self) -> bool {
        self.class == ErrorClass::Required
    }

    /// Errors produced synchronously by the validator
    pub fn is_local(&self) -> bool {
        !self.is_conflict()
    }
}

/// Immutable `FieldKey -> FieldError` mapping; every update returns a copy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorMap {
    entries: Arc<BTreeMap<FieldKey, FieldError>>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FieldKey) -> Option<&FieldError> {
        self.entries.get(key)
    }

    pub fn message(&self, key: &FieldKey) -> Option<&str> {
        self.entries.get(key).map(|e| e.message.as_str())
    }

    pub fn contains(&self, key: &FieldKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldError)> {
        self.entries.iter()
    }

    /// Copy with `key` set to `error`
    pub fn with(&self, key: &FieldKey, error: FieldError) -> Self {
        if self.entries.get(key) == Some(&error) {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        entries.insert(key.clone(), error);
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Copy with `key` cleared. Returns a handle to the same map when there
    /// was nothing to clear.
    pub fn without(&self, key: &FieldKey) -> Self {
        if !self.entries.contains_key(key) {
            return self.clone();
        }
        let mut entries = (*self.entries).clone();
        entries.remove(key);
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Copy with `key` set or cleared
    pub fn with_entry(&self, key: &FieldKey, error: Option<FieldError>) -> Self {
        match error {
            Some(error) => self.with(key, error),
            None => self.without(key),
        }
    }

    /// Identity comparison for change detection
    pub fn same_as(&self, other: &ErrorMap) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}
