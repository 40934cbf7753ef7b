pub mod classifier;
pub mod mapping_store;
pub mod outcome_writer;
pub mod record_store;
pub mod token_harvester;
pub mod transformer;

pub use classifier::{InconclusivePolicy, ResultClassifier};
pub use mapping_store::MappingStore;
pub use outcome_writer::OutcomeWriter;
pub use record_store::{InMemoryRecordStore, SubmissionRecord, SubmissionRecorder};
pub use token_harvester::TokenHarvester;
pub use transformer::transform;
