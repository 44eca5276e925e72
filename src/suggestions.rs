//! Slug suggestions derived from business attributes
//!
//! The candidate set is a pure function of the inputs; only the order in
//! which candidates are presented is randomized.

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use std::collections::HashSet;

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9_-]+").expect("valid slug sanitizer regex"));
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid hyphen regex"));

/// Lowercase and collapse every run of disallowed characters into one hyphen
pub fn slugify(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let replaced = DISALLOWED.replace_all(&lowered, "-");
    let collapsed = HYPHENS.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Every candidate in deterministic order: the base joined with each
/// secondary attribute, then with each pair of them
pub fn slug_candidates(primary: &str, secondary: &[&str]) -> Vec<String> {
    let base = slugify(primary);
    if base.is_empty() {
        return Vec::new();
    }

    let mut parts: Vec<String> = Vec::new();
    for raw in secondary {
        let part = slugify(raw);
        if !part.is_empty() && part != base && !parts.contains(&part) {
            parts.push(part);
        }
    }

    let mut candidates = Vec::new();
    for part in &parts {
        candidates.push(format!("{base}-{part}"));
    }
    for (i, first) in parts.iter().enumerate() {
        for second in &parts[i + 1..] {
            candidates.push(format!("{base}-{first}-{second}"));
        }
    }

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .map(|c| slugify(&c))
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

/// Capped, shuffled suggestions using the thread-local RNG
pub fn generate_slug_suggestions(primary: &str, secondary: &[&str], limit: usize) -> Vec<String> {
    generate_slug_suggestions_with(primary, secondary, limit, &mut rand::thread_rng())
}

pub fn generate_slug_suggestions_with<R: Rng + ?Sized>(
    primary: &str,
    secondary: &[&str],
    limit: usize,
    rng: &mut R,
) -> Vec<String> {
    let mut candidates = slug_candidates(primary, secondary);
    candidates.truncate(limit);
    candidates.shuffle(rng);
    candidates
}
