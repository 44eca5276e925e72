//! Onboarding wizard engine
//!
//! Stepped forms with synchronous format validation, debounced asynchronous
//! uniqueness checks and a step controller that gates navigation and
//! submission. The terminal front end in `main.rs` is one consumer of this
//! library; anything that can call [`session::FormSession`] is another.

pub mod config;
pub mod error;
pub mod forms;
pub mod services;
pub mod session;
pub mod suggestions;
pub mod uniqueness;
pub mod validation;

pub use config::WizardConfig;
pub use error::{Result, WizardError};
pub use forms::{FieldKey, FormKind, FormSchema, FormValue, FormValueTree};
pub use session::{FormSession, SessionOptions, SubmitOutcome};
