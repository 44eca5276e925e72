//! Field declarations

use super::key::FieldKey;
use super::value::FormValue;

/// Government tax identifiers with fixed-length formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxIdKind {
    /// Permanent Account Number, 10 characters
    Pan,
    /// Goods and Services Tax Identification Number, 15 characters
    Gst,
}

impl TaxIdKind {
    pub fn length(self) -> usize {
        match self {
            Self::Pan => 10,
            Self::Gst => 15,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pan => "PAN",
            Self::Gst => "GSTIN",
        }
    }
}

/// Input class of a field; selects the validation rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Phone,
    TaxId(TaxIdKind),
    Slug,
    Pincode,
    Amount,
    Integer,
    /// 24h `HH:MM`
    Time,
    Checkbox,
    Select { options: Vec<String> },
    MultiSelect { options: Vec<String> },
}

impl FieldKind {
    /// Value a freshly opened form starts with
    pub fn empty_value(&self) -> FormValue {
        match self {
            FieldKind::Checkbox => FormValue::Bool(false),
            FieldKind::MultiSelect { .. } => FormValue::List(Vec::new()),
            _ => FormValue::Text(String::new()),
        }
    }

    pub fn is_textual(&self) -> bool {
        !matches!(self, FieldKind::Checkbox | FieldKind::MultiSelect { .. })
    }
}

/// Declarative description of a form field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: FieldKey,
    pub label: String,
    pub kind: FieldKind,
    pub help: Option<String>,
    pub required: bool,
    /// Identity field: edits are forwarded to the uniqueness check service
    pub unique: bool,
}

impl FieldSpec {
    pub fn new(key: FieldKey, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key,
            label: label.into(),
            kind,
            help: None,
            required: false,
            unique: false,
        }
    }

    /// Attach optional help / hint text shown beneath the field
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}
