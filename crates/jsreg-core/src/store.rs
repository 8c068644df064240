//! Metadata and blob store contract.
//!
//! The registry never owns persistence. It reads version records and archive
//! blobs through [`PackageStore`], which implementations back with whatever
//! they like (the server uses a directory tree). [`MemoryStore`] is the
//! in-process implementation used by tests.

use crate::error::RegistryError;
use crate::name::{EncodedName, PackageName};
use md5::digest::Output;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who may see a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Where a package may be consumed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    /// Only inside the publisher's own projects; never served as a dependency.
    Local,
    #[default]
    Net,
    Both,
}

/// One published version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub id: String,
    pub version: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub group: Group,
    /// Entry file path inside the archive.
    pub index: String,
    /// Maintainer ids.
    #[serde(default)]
    pub access: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license: String,
    /// Declared dependency name → version range.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Archive file name, relative to the package's storage directory.
    pub tarball: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

impl VersionRecord {
    /// Create a public, network-visible record.
    #[must_use]
    pub fn new(version: impl Into<String>, index: impl Into<String>, tarball: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            id: format!("v{}", version.replace(['.', '+', '-'], "_")),
            version,
            visibility: Visibility::Public,
            group: Group::Net,
            index: index.into(),
            access: Vec::new(),
            description: String::new(),
            author: String::new(),
            license: String::new(),
            dependencies: BTreeMap::new(),
            tarball: tarball.into(),
            created: String::new(),
            updated: String::new(),
        }
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    #[must_use]
    pub fn is_local_only(&self) -> bool {
        self.group == Group::Local
    }

    /// License, or `"none"` when unset.
    #[must_use]
    pub fn license_or_none(&self) -> &str {
        if self.license.is_empty() {
            "none"
        } else {
            &self.license
        }
    }
}

/// Size and content hash of a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobAttributes {
    pub size: u64,
    pub md5: Output<Md5>,
}

impl BlobAttributes {
    /// Compute attributes from blob contents.
    #[must_use]
    pub fn of(bytes: &[u8]) -> Self {
        Self {
            size: bytes.len() as u64,
            md5: Md5::digest(bytes),
        }
    }

    /// Integrity string in the form `MD5_<hex>`.
    #[must_use]
    pub fn integrity(&self) -> String {
        format!("MD5_{:x}", self.md5)
    }
}

/// Package-level (collection) metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub id: String,
    pub encoded: EncodedName,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

/// Read access to package metadata and archive blobs.
///
/// Record lists are returned in the store's insertion order; "latest" is the
/// last element of that order.
pub trait PackageStore: Send + Sync {
    /// Package-level metadata, if the package exists.
    fn package(&self, package: &EncodedName) -> Result<Option<PackageSummary>, RegistryError>;

    /// All packages, including reserved collections.
    fn packages(&self) -> Result<Vec<PackageSummary>, RegistryError>;

    /// Version records of a package, optionally filtered by visibility.
    ///
    /// An unknown package yields an empty list.
    fn versions(
        &self,
        package: &EncodedName,
        visibility: Option<Visibility>,
    ) -> Result<Vec<VersionRecord>, RegistryError>;

    /// The record for one exact version, if any.
    fn version(
        &self,
        package: &EncodedName,
        version: &str,
    ) -> Result<Option<VersionRecord>, RegistryError> {
        Ok(self
            .versions(package, None)?
            .into_iter()
            .find(|record| record.version == version))
    }

    /// Raw archive bytes for a record.
    fn read_blob(&self, package: &EncodedName, record: &VersionRecord) -> Result<Vec<u8>, RegistryError>;

    /// Size and hash of a record's archive.
    fn blob_attributes(
        &self,
        package: &EncodedName,
        record: &VersionRecord,
    ) -> Result<BlobAttributes, RegistryError> {
        self.read_blob(package, record).map(|bytes| BlobAttributes::of(&bytes))
    }
}

#[derive(Debug, Clone)]
struct MemoryPackage {
    summary: PackageSummary,
    records: Vec<VersionRecord>,
    blobs: BTreeMap<String, Vec<u8>>,
}

/// In-memory store. Populate with [`MemoryStore::publish`] before sharing.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    packages: BTreeMap<EncodedName, MemoryPackage>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a version record and its archive.
    ///
    /// # Errors
    /// Returns `InvalidName` if `name` is not a valid package name.
    pub fn publish(
        &mut self,
        name: &str,
        record: VersionRecord,
        blob: Vec<u8>,
    ) -> Result<&mut Self, RegistryError> {
        let encoded = PackageName::parse(name)?.encode();
        let next_id = self.packages.len() + 1;
        let package = self
            .packages
            .entry(encoded.clone())
            .or_insert_with(|| MemoryPackage {
                summary: PackageSummary {
                    id: format!("pkg{next_id}"),
                    encoded,
                    created: record.created.clone(),
                    updated: record.updated.clone(),
                },
                records: Vec::new(),
                blobs: BTreeMap::new(),
            });

        package.summary.updated.clone_from(&record.updated);
        package.blobs.insert(record.tarball.clone(), blob);
        package.records.push(record);
        Ok(self)
    }
}

impl PackageStore for MemoryStore {
    fn package(&self, package: &EncodedName) -> Result<Option<PackageSummary>, RegistryError> {
        Ok(self.packages.get(package).map(|p| p.summary.clone()))
    }

    fn packages(&self) -> Result<Vec<PackageSummary>, RegistryError> {
        Ok(self.packages.values().map(|p| p.summary.clone()).collect())
    }

    fn versions(
        &self,
        package: &EncodedName,
        visibility: Option<Visibility>,
    ) -> Result<Vec<VersionRecord>, RegistryError> {
        Ok(self
            .packages
            .get(package)
            .map(|p| {
                p.records
                    .iter()
                    .filter(|r| visibility.map_or(true, |v| r.visibility == v))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn read_blob(&self, package: &EncodedName, record: &VersionRecord) -> Result<Vec<u8>, RegistryError> {
        self.packages
            .get(package)
            .and_then(|p| p.blobs.get(&record.tarball))
            .cloned()
            .ok_or_else(|| RegistryError::store(format!("missing blob '{}'", record.tarball)))
    }
}
