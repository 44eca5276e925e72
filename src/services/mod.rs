//! External collaborators: uniqueness checks and record submission

mod http;
mod memory;
mod traits;

pub use http::{HttpCheckService, HttpSubmissionService};
pub use memory::{InMemoryDirectory, StoredRecord};
pub use traits::{CheckResponse, RecordSubmissionService, SubmitReceipt, UniquenessCheckService};

#[cfg(test)]
pub use traits::{MockRecordSubmissionService, MockUniquenessCheckService};
