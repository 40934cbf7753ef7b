pub mod mapping_loader;
pub mod payload_loader;

pub use mapping_loader::{load_mapping_file, parse_mapping, MappingFormat};
pub use payload_loader::{load_all_payload_files, load_payload_file, QueuedPayload};
