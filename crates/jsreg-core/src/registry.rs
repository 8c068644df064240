//! Request resolution.
//!
//! A module request runs once through
//! `name → version → archive → file → transform`. Failures before an archive
//! is open are returned as `Err` for the caller to report as a transport
//! error; failures after that are folded into an error module by the
//! transform engine.
//!
//! "Latest" is the last public record in store order, not the highest
//! semantic version.

use crate::archive::ArchiveFs;
use crate::error::RegistryError;
use crate::exports::has_default_export;
use crate::metadata::{DistInfo, PackageEntry, PackageInfo, PackageList, VersionInfo};
use crate::name::{decode_name, encode_name, EncodedName};
use crate::spec::Specifier;
use crate::store::{PackageStore, VersionRecord, Visibility};
use crate::transform::{error_module, TransformEngine};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Listing page size when none is requested.
pub const DEFAULT_PER_PAGE: usize = 30;
/// Largest accepted listing page size.
pub const MAX_PER_PAGE: usize = 500;

/// A package version chosen for a request.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub name: String,
    pub encoded: EncodedName,
    pub record: VersionRecord,
}

/// A raw archive ready for download.
#[derive(Debug, Clone)]
pub struct Tarball {
    /// `<name>-<version>.tgz`
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Registry front end over a store and a transform engine.
pub struct Registry {
    store: Box<dyn PackageStore>,
    engine: TransformEngine,
    public_url: String,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("engine", &self.engine)
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl Registry {
    #[must_use]
    pub fn new(store: Box<dyn PackageStore>, engine: TransformEngine) -> Self {
        Self {
            store,
            engine,
            public_url: String::new(),
        }
    }

    /// Base URL for tarball links (empty for host-relative links).
    #[must_use]
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    /// Resolve a package name and optional pinned version to a public record.
    ///
    /// # Errors
    /// `InvalidName` for a bad name, `NotFound` when no public record matches.
    pub fn resolve(&self, name: &str, version: Option<&str>) -> Result<Resolved, RegistryError> {
        let encoded = encode_name(name)?;

        let record = match version {
            Some(version) => self
                .store
                .version(&encoded, version)?
                .filter(VersionRecord::is_public)
                .ok_or_else(|| RegistryError::version_not_found(name, version))?,
            None => self
                .store
                .versions(&encoded, Some(Visibility::Public))?
                .pop()
                .ok_or_else(|| RegistryError::package_not_found(name))?,
        };

        debug!(package = name, version = %record.version, pinned = version.is_some(), "resolved");
        Ok(Resolved {
            name: name.to_string(),
            encoded,
            record,
        })
    }

    /// Resolve a `name[@version]` token.
    ///
    /// # Errors
    /// Same as [`Registry::resolve`].
    pub fn resolve_specifier(&self, token: &str) -> Result<Resolved, RegistryError> {
        let spec = Specifier::parse(token);
        self.resolve(&spec.name, spec.version.as_deref())
    }

    fn open_archive(&self, resolved: &Resolved) -> Result<ArchiveFs, RegistryError> {
        let blob = self.store.read_blob(&resolved.encoded, &resolved.record)?;
        ArchiveFs::open(&blob)
    }

    /// Index shim for `name[@version]`.
    ///
    /// # Errors
    /// Resolution, store and archive failures. A missing entry file or a
    /// local-only package yields `Ok` with an error module.
    pub fn index_module(&self, token: &str) -> Result<String, RegistryError> {
        let resolved = self.resolve_specifier(token)?;
        let Resolved { name, record, .. } = &resolved;

        if record.is_local_only() {
            return Ok(self
                .engine
                .render_index(name, &record.version, &record.index, true, false));
        }

        let archive = self.open_archive(&resolved)?;
        let entry = match archive.read(&record.index) {
            Ok(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            Err(err) => {
                warn!(package = %name, version = %record.version, error = %err, "entry file missing");
                return Ok(error_module(&format!("{name}@{}: {err}", record.version)));
            }
        };

        Ok(self.engine.render_index(
            name,
            &record.version,
            &record.index,
            false,
            has_default_export(&entry),
        ))
    }

    /// Transformed file at `path` of `name@version` for `target`.
    ///
    /// # Errors
    /// Resolution, store and archive failures. Everything after the archive
    /// is open yields `Ok` with module text.
    pub fn file_module(
        &self,
        name: &str,
        version: &str,
        target: &str,
        path: &str,
    ) -> Result<String, RegistryError> {
        let resolved = self.resolve(name, Some(version))?;

        if resolved.record.is_local_only() {
            let err = RegistryError::LocalOnly {
                name: name.to_string(),
            };
            return Ok(error_module(&err.to_string()));
        }

        let archive = self.open_archive(&resolved)?;
        Ok(self
            .engine
            .render_file(name, &resolved.record.version, target, path, &archive))
    }

    /// Untransformed bytes of one archive file.
    ///
    /// # Errors
    /// Resolution, store, archive and `NotFound` for the path.
    pub fn source_file(&self, name: &str, version: &str, path: &str) -> Result<Vec<u8>, RegistryError> {
        let resolved = self.resolve(name, Some(version))?;
        let archive = self.open_archive(&resolved)?;
        archive.read(path).map(<[u8]>::to_vec)
    }

    /// Raw archive of a version (latest when `version` is `None`).
    ///
    /// # Errors
    /// Resolution and store failures.
    pub fn tarball(&self, name: &str, version: Option<&str>) -> Result<Tarball, RegistryError> {
        let resolved = self.resolve(name, version)?;
        let bytes = self.store.read_blob(&resolved.encoded, &resolved.record)?;
        Ok(Tarball {
            file_name: format!("{name}-{}.tgz", resolved.record.version),
            bytes,
        })
    }

    fn tarball_url(&self, name: &str, version: Option<&str>) -> String {
        match version {
            Some(version) => format!("{}/{name}/_/{version}/{name}.tgz", self.public_url),
            None => format!("{}/{name}/_/{name}.tgz", self.public_url),
        }
    }

    fn version_info(
        &self,
        name: &str,
        encoded: &EncodedName,
        record: &VersionRecord,
    ) -> Result<VersionInfo, RegistryError> {
        let attrs = self.store.blob_attributes(encoded, record)?;
        Ok(VersionInfo {
            id: record.id.clone(),
            maintainers: record.access.clone(),
            version: record.version.clone(),
            published: record.created.clone(),
            description: record.description.clone(),
            author: record.author.clone(),
            license: record.license_or_none().to_string(),
            private: !record.is_public(),
            dependencies: record.dependencies.clone(),
            dist: DistInfo {
                version: record.version.clone(),
                integrity: attrs.integrity(),
                tarball: self.tarball_url(name, Some(&record.version)),
                size: attrs.size,
            },
        })
    }

    /// Metadata of one public version.
    ///
    /// # Errors
    /// Resolution and store failures.
    pub fn version_metadata(&self, name: &str, version: &str) -> Result<VersionInfo, RegistryError> {
        let resolved = self.resolve(name, Some(version))?;
        self.version_info(name, &resolved.encoded, &resolved.record)
    }

    /// Metadata of a package across its public versions.
    ///
    /// # Errors
    /// `InvalidName`, `NotFound` for a package with no public versions, and
    /// store failures.
    pub fn package_metadata(&self, name: &str) -> Result<PackageInfo, RegistryError> {
        let encoded = encode_name(name)?;
        let records = self.store.versions(&encoded, Some(Visibility::Public))?;
        let (Some(original), Some(latest)) = (records.first(), records.last()) else {
            return Err(RegistryError::package_not_found(name));
        };
        let id = self
            .store
            .package(&encoded)?
            .map_or_else(|| encoded.to_string(), |summary| summary.id);

        let mut versions = BTreeMap::new();
        let mut times = BTreeMap::new();
        for record in &records {
            versions.insert(
                record.version.clone(),
                self.version_info(name, &encoded, record)?,
            );
            times.insert(record.version.clone(), record.created.clone());
        }
        times.insert("created".to_string(), original.created.clone());
        times.insert("updated".to_string(), latest.updated.clone());

        let attrs = self.store.blob_attributes(&encoded, latest)?;
        Ok(PackageInfo {
            id,
            name: name.to_string(),
            license: latest.license.clone(),
            description: latest.description.clone(),
            versions,
            times,
            dist: DistInfo {
                version: latest.version.clone(),
                integrity: attrs.integrity(),
                tarball: self.tarball_url(name, None),
                size: attrs.size,
            },
        })
    }

    /// Maintainer ids of the latest public version.
    ///
    /// # Errors
    /// Resolution failures.
    pub fn maintainers(&self, name: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.resolve(name, None)?.record.access)
    }

    /// Per version, tarball URLs of each declared dependency.
    ///
    /// A dependency resolves to its first public version; dependencies that
    /// are not in this registry are left out.
    ///
    /// # Errors
    /// `InvalidName`, `NotFound` for a package with no public versions, and
    /// store failures.
    pub fn dependencies(&self, name: &str) -> Result<BTreeMap<String, Vec<String>>, RegistryError> {
        let encoded = encode_name(name)?;
        let records = self.store.versions(&encoded, Some(Visibility::Public))?;
        if records.is_empty() {
            return Err(RegistryError::package_not_found(name));
        }

        let mut out = BTreeMap::new();
        for record in &records {
            let mut urls = Vec::new();
            for dep in record.dependencies.keys() {
                let Ok(dep_encoded) = encode_name(dep) else {
                    continue;
                };
                if let Some(first) = self
                    .store
                    .versions(&dep_encoded, Some(Visibility::Public))?
                    .first()
                {
                    urls.push(self.tarball_url(dep, Some(&first.version)));
                }
            }
            out.insert(record.version.clone(), urls);
        }
        Ok(out)
    }

    /// One page of the package listing, without reserved collections.
    ///
    /// `page` starts at 1; `per_page` is clamped to `1..=MAX_PER_PAGE`.
    ///
    /// # Errors
    /// Store failures.
    pub fn packages(&self, page: Option<usize>, per_page: Option<usize>) -> Result<PackageList, RegistryError> {
        let page = page.unwrap_or(1).max(1);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

        let all: Vec<_> = self
            .store
            .packages()?
            .into_iter()
            .filter(|summary| !summary.encoded.is_reserved())
            .collect();
        let total_items = all.len();

        let packages = all
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .map(|summary| {
                (
                    decode_name(summary.encoded.as_str()),
                    PackageEntry {
                        id: summary.id,
                        b62: summary.encoded.to_string(),
                        created: summary.created,
                        updated: summary.updated,
                    },
                )
            })
            .collect();

        Ok(PackageList {
            page,
            per_page,
            total_items,
            total_pages: total_items.div_ceil(per_page),
            packages,
        })
    }
}
