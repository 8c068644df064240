//! Directory-backed package store.
//!
//! Layout:
//!
//! ```text
//! <data-dir>/
//!   <encoded name>/
//!     versions.json      ordered array of version records
//!     <tarball>          one archive per record
//! ```
//!
//! Array order in `versions.json` is the insertion order the registry treats
//! as "latest last".

use jsreg_core::{EncodedName, PackageStore, PackageSummary, RegistryError, VersionRecord, Visibility};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const VERSIONS_FILE: &str = "versions.json";

/// Reads packages from a data directory. Holds no state besides the root.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn package_dir(&self, package: &EncodedName) -> PathBuf {
        self.root.join(package.as_str())
    }

    fn read_records(&self, package: &EncodedName) -> Result<Vec<VersionRecord>, RegistryError> {
        let path = self.package_dir(package).join(VERSIONS_FILE);
        match fs::read(&path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(RegistryError::store(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    fn blob_path(&self, package: &EncodedName, record: &VersionRecord) -> Result<PathBuf, RegistryError> {
        let name = record.tarball.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(RegistryError::store(format!("invalid tarball name '{name}'")));
        }
        Ok(self.package_dir(package).join(name))
    }
}

impl PackageStore for FsStore {
    fn package(&self, package: &EncodedName) -> Result<Option<PackageSummary>, RegistryError> {
        let records = self.read_records(package)?;
        let (Some(first), Some(last)) = (records.first(), records.last()) else {
            return Ok(None);
        };
        Ok(Some(PackageSummary {
            id: package.to_string(),
            encoded: package.clone(),
            created: first.created.clone(),
            updated: last.updated.clone(),
        }))
    }

    fn packages(&self) -> Result<Vec<PackageSummary>, RegistryError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(RegistryError::store(format!(
                    "failed to list {}: {e}",
                    self.root.display()
                )))
            }
        };

        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().join(VERSIONS_FILE).is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        names.sort();

        let mut out = Vec::with_capacity(names.len());
        for name in names {
            if let Some(summary) = self.package(&EncodedName::from_stored(name))? {
                out.push(summary);
            }
        }
        Ok(out)
    }

    fn versions(
        &self,
        package: &EncodedName,
        visibility: Option<Visibility>,
    ) -> Result<Vec<VersionRecord>, RegistryError> {
        let mut records = self.read_records(package)?;
        if let Some(visibility) = visibility {
            records.retain(|r| r.visibility == visibility);
        }
        Ok(records)
    }

    fn read_blob(&self, package: &EncodedName, record: &VersionRecord) -> Result<Vec<u8>, RegistryError> {
        let path = self.blob_path(package, record)?;
        fs::read(&path)
            .map_err(|e| RegistryError::store(format!("failed to read {}: {e}", path.display())))
    }
}
