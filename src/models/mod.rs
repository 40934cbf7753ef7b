pub mod field_map;
pub mod loaders;
pub mod mapping;
pub mod outcome;
pub mod payload;

pub use field_map::TargetFieldMap;
pub use loaders::{load_all_payload_files, load_mapping_file, QueuedPayload};
pub use mapping::{DueDatePolicy, MappingRule, MappingSpecification, TransformKind};
pub use outcome::{Classification, SubmissionOutcome, SubmissionStatus};
pub use payload::Payload;
