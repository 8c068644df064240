//! Module rendering: index shims, transformed files and inert error modules.
//!
//! Everything here produces ESM text. Failures discovered while assembling a
//! module are not surfaced as transport errors; they become a module whose
//! only statement throws, so an importing module graph still parses and fails
//! at runtime with a readable message.

pub mod assets;
pub mod rewrite;

pub use assets::{inline_asset_imports, InlineAsset};
pub use rewrite::ImportRewriter;

use crate::archive::ArchiveFs;
use crate::compiler::{CompilerBackend, CompilerError, EsTarget, SwcBackend, TranspileSpec};
use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default active language-level path segment.
pub const DEFAULT_SEGMENT: &str = "v1";

/// Engine configuration, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Leading URL segment of every module path this registry emits.
    pub segment: String,
    /// Target directory that index shims point into.
    pub default_target: EsTarget,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            segment: DEFAULT_SEGMENT.to_string(),
            default_target: EsTarget::default(),
        }
    }
}

/// Renders package modules.
pub struct TransformEngine {
    config: EngineConfig,
    backend: Box<dyn CompilerBackend>,
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl TransformEngine {
    /// Create an engine backed by [`SwcBackend`].
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self::with_backend(config, Box::new(SwcBackend::new()))
    }

    #[must_use]
    pub fn with_backend(config: EngineConfig, backend: Box<dyn CompilerBackend>) -> Self {
        Self { config, backend }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rewriter for one package version at one target.
    #[must_use]
    pub fn rewriter(&self, name: &str, version: &str, target: EsTarget) -> ImportRewriter {
        ImportRewriter::new(&self.config.segment, name, version, target.as_str())
    }

    /// Render the index shim for a package version.
    ///
    /// A local-only package yields an error module instead. The shim re-exports
    /// the entry file under the default target and adds a default re-export
    /// only when `has_default` is set.
    #[must_use]
    pub fn render_index(
        &self,
        name: &str,
        version: &str,
        entry: &str,
        local_only: bool,
        has_default: bool,
    ) -> String {
        if local_only {
            let err = RegistryError::LocalOnly {
                name: name.to_string(),
            };
            warn!(package = name, version, "refusing to serve local package");
            return error_module(&err.to_string());
        }

        let url = self
            .rewriter(name, version, self.config.default_target)
            .url_for(entry);
        debug!(package = name, version, %url, has_default, "rendering index shim");

        let mut module = banner(name, version, None);
        module.push_str(&format!("export * from \"{url}\";\n"));
        if has_default {
            module.push_str(&format!("export {{ default }} from \"{url}\";\n"));
        }
        module
    }

    /// Render one file of a package, substituting an error module on failure.
    #[must_use]
    pub fn render_file(
        &self,
        name: &str,
        version: &str,
        target: &str,
        path: &str,
        archive: &ArchiveFs,
    ) -> String {
        match self.try_render_file(name, version, target, path, archive) {
            Ok(module) => module,
            Err(err) => {
                warn!(
                    package = name,
                    version,
                    target,
                    path,
                    code = err.code(),
                    error = %err,
                    "rendering error module"
                );
                error_module(&format!("{name}@{version}: {err}"))
            }
        }
    }

    /// Render one file of a package.
    ///
    /// Inline-set assets become a data-URL module. Script files go through
    /// asset inlining, the compiler backend and import rewriting. JSON and
    /// other text files become a default-export module. Every success
    /// carries a banner.
    ///
    /// # Errors
    /// - `UnsupportedTarget` for an unknown language-level token
    /// - `NotFound` for a missing file or a missing imported asset
    /// - `Transform` when the backend rejects the source, a `.json` file
    ///   does not parse, or a non-script file is not UTF-8
    pub fn try_render_file(
        &self,
        name: &str,
        version: &str,
        target: &str,
        path: &str,
        archive: &ArchiveFs,
    ) -> Result<String, RegistryError> {
        let target = EsTarget::parse(target)?;
        let bytes = archive.read(path)?;

        if let Some(asset) = InlineAsset::from_path(path) {
            debug!(package = name, version, path, mime = asset.mime(), "inlining asset");
            let mut module = banner(name, version, Some(target));
            module.push_str(&asset.module(bytes));
            return Ok(module);
        }

        let ext = path.rsplit_once('.').map_or("", |(_, ext)| ext);
        if !self.backend.supports_extension(ext) {
            debug!(package = name, version, path, "wrapping data file");
            let mut module = banner(name, version, Some(target));
            module.push_str(&data_module(path, ext, bytes)?);
            return Ok(module);
        }

        let source = String::from_utf8_lossy(bytes);

        debug!(package = name, version, path, %target, backend = self.backend.name(), "transforming file");

        let inlined = inline_asset_imports(&source, rewrite::parent_dir(path), archive)?;
        let output = self
            .backend
            .transpile(&TranspileSpec::new(path, target), &inlined)?;
        let rewritten = self.rewriter(name, version, target).rewrite(&output.code, path);

        let mut module = banner(name, version, Some(target));
        module.push_str(&rewritten);
        if !module.ends_with('\n') {
            module.push('\n');
        }
        Ok(module)
    }
}

/// Banner comment naming the package, version and (for files) target.
#[must_use]
pub fn banner(name: &str, version: &str, target: Option<EsTarget>) -> String {
    let text = match target {
        Some(target) => format!("{name}@{version} ({target})"),
        None => format!("{name}@{version}"),
    };
    // A `*/` in a name would close the comment early.
    format!("/* {} */\n", text.replace("*/", "* /"))
}

/// `export default` of a JSON document, or of a text file as a string.
fn data_module(path: &str, ext: &str, bytes: &[u8]) -> Result<String, CompilerError> {
    let value = if ext.eq_ignore_ascii_case("json") {
        let doc: serde_json::Value = serde_json::from_slice(bytes)
            .map_err(|e| CompilerError::parse_error(format!("{path}: {e}")))?;
        serde_json::to_string(&doc)
    } else {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| CompilerError::transform_error(format!("{path}: not a UTF-8 text file")))?;
        serde_json::to_string(text)
    }
    .map_err(|e| CompilerError::transform_error(format!("{path}: {e}")))?;
    Ok(format!("export default {value};\n"))
}

/// A module consisting of a single statement that throws `message`.
#[must_use]
pub fn error_module(message: &str) -> String {
    let literal = serde_json::to_string(message).unwrap_or_else(|_| "\"unknown error\"".to_string());
    format!("throw new Error({literal});\n")
}
