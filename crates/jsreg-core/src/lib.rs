#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

pub mod archive;
pub mod compiler;
pub mod error;
pub mod exports;
pub mod metadata;
pub mod name;
pub mod registry;
pub mod spec;
pub mod store;
pub mod transform;

pub use archive::{ArchiveFs, VirtualFile, MAX_UNPACKED_SIZE};
pub use compiler::EsTarget;
pub use error::{codes, Missing, RegistryError};
pub use exports::has_default_export;
pub use name::{decode_name, encode_name, EncodedName, PackageName, RESERVED_TOKEN};
pub use registry::{Registry, Resolved, Tarball};
pub use spec::{extract_version, has_version, split_name_and_version, Specifier};
pub use store::{BlobAttributes, Group, MemoryStore, PackageStore, PackageSummary, VersionRecord, Visibility};
pub use transform::{error_module, EngineConfig, TransformEngine};

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
