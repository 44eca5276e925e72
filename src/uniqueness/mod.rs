//! Asynchronous uniqueness checking for identity fields

mod checker;

pub use checker::{CheckStatus, Resolution, UniquenessChecker, Verdict};
