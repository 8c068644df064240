//! Read-only virtual filesystem over a `.tgz` archive blob.
//!
//! Tar entries cannot be located without walking every header before them, so
//! [`ArchiveFs::open`] indexes the whole archive in one pass. The index lives
//! for a single request and is dropped with it.

use crate::error::RegistryError;
use flate2::read::GzDecoder;
use std::collections::BTreeMap;
use std::io::Read;
use tar::Archive;

/// Maximum total size of unpacked file contents (64 MB).
pub const MAX_UNPACKED_SIZE: u64 = 64 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// npm-style tarballs nest everything under this directory.
const PACK_ROOT: &str = "package/";

/// A regular file materialized from the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFile {
    /// Package-relative path.
    pub path: String,
    /// Raw file contents.
    pub contents: Vec<u8>,
}

/// Path → file lookup table built from an archive blob.
#[derive(Debug, Default)]
pub struct ArchiveFs {
    files: BTreeMap<String, VirtualFile>,
}

impl ArchiveFs {
    /// Decompress and index a gzip-compressed tar blob.
    ///
    /// Only regular files are kept; directories, links and other special
    /// entries are skipped.
    ///
    /// # Errors
    /// Returns `Archive` if the blob is not gzip, is truncated, or the tar
    /// stream is malformed.
    pub fn open(blob: &[u8]) -> Result<Self, RegistryError> {
        if blob.len() < GZIP_MAGIC.len() || blob[..2] != GZIP_MAGIC {
            return Err(RegistryError::archive("blob is not gzip-compressed"));
        }

        let mut archive = Archive::new(GzDecoder::new(blob));
        let mut files = BTreeMap::new();
        let mut unpacked: u64 = 0;

        for entry in archive
            .entries()
            .map_err(|e| RegistryError::archive(format!("Failed to read tarball entries: {e}")))?
        {
            let mut entry = entry
                .map_err(|e| RegistryError::archive(format!("Failed to read tarball entry: {e}")))?;

            if !entry.header().entry_type().is_file() {
                continue;
            }

            let path = entry
                .path()
                .map_err(|e| RegistryError::archive(format!("Failed to read entry path: {e}")))?;
            let path = normalize(&path.to_string_lossy()).to_string();

            let size = entry.header().size().unwrap_or(0);
            unpacked = unpacked.saturating_add(size);
            if unpacked > MAX_UNPACKED_SIZE {
                return Err(RegistryError::archive(format!(
                    "Archive too large: more than {MAX_UNPACKED_SIZE} bytes unpacked"
                )));
            }

            let mut contents = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
            entry
                .read_to_end(&mut contents)
                .map_err(|e| RegistryError::archive(format!("Failed to read '{path}': {e}")))?;

            files.insert(path.clone(), VirtualFile { path, contents });
        }

        Ok(Self {
            files: strip_pack_root(files),
        })
    }

    /// Read the contents at an exact path.
    ///
    /// # Errors
    /// Returns `NotFound` naming `path` when the archive has no such file.
    pub fn read(&self, path: &str) -> Result<&[u8], RegistryError> {
        self.entry(path)
            .map(|file| file.contents.as_slice())
            .ok_or_else(|| RegistryError::path_not_found(path))
    }

    /// Look up a file without turning a miss into an error.
    #[must_use]
    pub fn entry(&self, path: &str) -> Option<&VirtualFile> {
        self.files.get(normalize(path))
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entry(path).is_some()
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn normalize(path: &str) -> &str {
    let mut path = path;
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            return path;
        }
    }
}

/// Drop the `package/` prefix when every file sits under it.
fn strip_pack_root(files: BTreeMap<String, VirtualFile>) -> BTreeMap<String, VirtualFile> {
    if files.is_empty() || !files.keys().all(|p| p.starts_with(PACK_ROOT)) {
        return files;
    }

    files
        .into_values()
        .map(|file| {
            let path = file.path[PACK_ROOT.len()..].to_string();
            (
                path.clone(),
                VirtualFile {
                    path,
                    contents: file.contents,
                },
            )
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tar::Builder;

    /// Build a `.tgz` from `(path, contents)` pairs.
    pub(crate) fn tgz(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = Builder::new(&mut tar_bytes);
            for (path, contents) in files {
                let mut header = tar::Header::new_gnu();
                header.set_path(path).unwrap();
                header.set_size(contents.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                builder.append(&header, *contents).unwrap();
            }
            builder.finish().unwrap();
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_open_and_read() {
        let blob = tgz(&[
            ("index.js", b"export default 1;"),
            ("lib/util.js", b"export const x = 1;"),
        ]);
        let fs = ArchiveFs::open(&blob).unwrap();

        assert_eq!(fs.len(), 2);
        assert_eq!(fs.read("index.js").unwrap(), b"export default 1;");
        assert_eq!(fs.read("lib/util.js").unwrap(), b"export const x = 1;");
        assert_eq!(fs.read("./lib/util.js").unwrap(), b"export const x = 1;");
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let blob = tgz(&[("index.js", b"export default 1;")]);
        let fs = ArchiveFs::open(&blob).unwrap();

        let err = fs.read("lib/util.js").unwrap_err();
        match err {
            RegistryError::NotFound(crate::error::Missing::Path(path)) => {
                assert_eq!(path, "lib/util.js");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_not_gzip_is_archive_error() {
        let err = ArchiveFs::open(b"plain text, not an archive").unwrap_err();
        assert!(matches!(err, RegistryError::Archive(_)));

        let err = ArchiveFs::open(b"").unwrap_err();
        assert!(matches!(err, RegistryError::Archive(_)));
    }

    #[test]
    fn test_truncated_blob_is_archive_error() {
        let contents = vec![b'x'; 64 * 1024];
        let blob = tgz(&[("big.js", &contents), ("index.js", b"export default 1;")]);
        let truncated = &blob[..blob.len() / 2];

        let err = ArchiveFs::open(truncated).unwrap_err();
        assert!(matches!(err, RegistryError::Archive(_)), "got {err:?}");
    }

    #[test]
    fn test_directories_are_skipped() {
        let mut tar_bytes = Vec::new();
        {
            let mut builder = Builder::new(&mut tar_bytes);

            let mut dir = tar::Header::new_gnu();
            dir.set_path("lib/").unwrap();
            dir.set_entry_type(tar::EntryType::Directory);
            dir.set_size(0);
            dir.set_mode(0o755);
            dir.set_cksum();
            builder.append(&dir, std::io::empty()).unwrap();

            let data = b"export default 2;";
            let mut file = tar::Header::new_gnu();
            file.set_path("lib/index.js").unwrap();
            file.set_size(data.len() as u64);
            file.set_mode(0o644);
            file.set_cksum();
            builder.append(&file, &data[..]).unwrap();
            builder.finish().unwrap();
        }
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        let blob = encoder.finish().unwrap();

        let fs = ArchiveFs::open(&blob).unwrap();
        assert_eq!(fs.paths().collect::<Vec<_>>(), vec!["lib/index.js"]);
        assert!(!fs.contains("lib"));
    }

    #[test]
    fn test_pack_root_is_stripped() {
        let blob = tgz(&[
            ("package/package.json", br#"{"name":"test"}"#),
            ("package/index.js", b"module.exports = 42;"),
        ]);
        let fs = ArchiveFs::open(&blob).unwrap();

        assert!(fs.contains("index.js"));
        assert!(fs.contains("package.json"));
        assert!(!fs.contains("package/index.js"));
    }

    #[test]
    fn test_pack_root_kept_when_mixed() {
        let blob = tgz(&[
            ("package/index.js", b"export default 1;"),
            ("README.md", b"# readme"),
        ]);
        let fs = ArchiveFs::open(&blob).unwrap();

        assert!(fs.contains("package/index.js"));
        assert!(fs.contains("README.md"));
    }

    #[test]
    fn test_empty_archive() {
        let fs = ArchiveFs::open(&tgz(&[])).unwrap();
        assert!(fs.is_empty());
    }
}
