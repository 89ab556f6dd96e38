//! Package metadata for the extension build: the generated version file
//! and the requirements lists.

mod common;
pub mod requirements;
pub mod version;

pub use requirements::{parse_requirements, Requirement};
pub use version::{git_hash, read_version, short_hash, write_version_file, VersionInfo};
