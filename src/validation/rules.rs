//! Format rules per field kind

use crate::forms::TaxIdKind;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("valid PAN regex"));
static GST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{2}[A-Z]{5}[0-9]{4}[A-Z][1-9A-Z]Z[0-9A-Z]$").expect("valid GSTIN regex")
});
static SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_-]+$").expect("valid slug regex"));
static PINCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[1-9][0-9]{5}$").expect("valid pincode regex"));
static AMOUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]+(\.[0-9]{1,2})?$").expect("valid amount regex"));
static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").expect("valid integer regex"));
static TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid time regex"));

/// Digit counts accepted for phone numbers: domestic, or domestic with the
/// `91` country code
pub const PHONE_DIGIT_LENGTHS: [usize; 2] = [10, 12];

pub fn email(value: &str) -> Option<String> {
    (!EMAIL.is_match(value.trim())).then(|| "Enter a valid email address".to_string())
}

pub fn phone(value: &str) -> Option<String> {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    (!PHONE_DIGIT_LENGTHS.contains(&digits))
        .then(|| "Phone number must have 10 digits (12 with country code)".to_string())
}

/// Staged tax-ID feedback: length first, then structure
pub fn tax_id(kind: TaxIdKind, value: &str) -> Option<String> {
    let normalized = value.trim().to_ascii_uppercase();
    let length = kind.length();
    if normalized.chars().count() != length {
        return Some(format!(
            "{} must be exactly {length} characters",
            kind.label()
        ));
    }
    let matches = match kind {
        TaxIdKind::Pan => PAN.is_match(&normalized),
        TaxIdKind::Gst => GST.is_match(&normalized),
    };
    if matches {
        None
    } else {
        Some(match kind {
            TaxIdKind::Pan => "PAN must be 5 letters, 4 digits and a letter (e.g. ABCDE1234F)",
            TaxIdKind::Gst => {
                "GSTIN must be a state code, a PAN, an entity digit, 'Z' and a check character"
            }
        }
        .to_string())
    }
}

pub fn slug(value: &str) -> Option<String> {
    (!SLUG.is_match(value))
        .then(|| "Only lowercase letters, digits, '-' and '_' are allowed".to_string())
}

pub fn pincode(value: &str) -> Option<String> {
    (!PINCODE.is_match(value.trim())).then(|| "Pincode must be 6 digits".to_string())
}

pub fn amount(value: &str) -> Option<String> {
    (!AMOUNT.is_match(value.trim())).then(|| "Enter an amount like 499 or 499.50".to_string())
}

pub fn integer(value: &str) -> Option<String> {
    (!INTEGER.is_match(value.trim())).then(|| "Enter a whole number".to_string())
}

pub fn time(value: &str) -> Option<String> {
    (!TIME.is_match(value.trim())).then(|| "Use 24-hour HH:MM".to_string())
}
