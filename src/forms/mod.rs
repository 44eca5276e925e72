//! Form domain layer
//!
//! Field keys, values, declarations, the step registry and the concrete
//! catalog forms.

mod catalog;
mod field;
mod key;
mod schema;
mod value;

pub use catalog::{partner_registration, product_creation, FormKind};
pub use field::{FieldKind, FieldSpec, TaxIdKind};
pub use key::FieldKey;
pub use schema::{FormSchema, FormSchemaBuilder, Step, SuggestionPlan};
pub use value::{FormValue, FormValueTree};
