pub mod domain;
pub mod infrastructure;
pub mod test_utils;

pub use domain::pipeline::{SubmissionPipeline, SubmitContext, SubmitOutcome};
pub use domain::store::PublicationStore;
