//! Compiler backend abstraction for single-file minification.
//!
//! The rest of the crate never calls SWC directly; it goes through
//! [`CompilerBackend`] so the backend can be swapped (or stubbed when the
//! `swc` feature is off).
//!
//! ## Usage
//!
//! ```ignore
//! use jsreg_core::compiler::{CompilerBackend, EsTarget, SwcBackend, TranspileSpec};
//!
//! let backend = SwcBackend::new();
//! let spec = TranspileSpec::new("index.js", EsTarget::ES2019);
//!
//! let output = backend.transpile(&spec, "export const answer = 42;")?;
//! println!("{}", output.code);
//! ```

pub mod swc;
pub mod target;

pub use swc::SwcBackend;
pub use target::EsTarget;

/// Compiler error codes.
pub mod codes {
    pub const PARSE_ERROR: &str = "COMPILER_PARSE_ERROR";
    pub const TRANSFORM_ERROR: &str = "COMPILER_TRANSFORM_ERROR";
}

/// Options for transforming one standalone file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileSpec {
    /// File name, used in parse diagnostics only.
    pub filename: String,
    /// Output language level.
    pub target: EsTarget,
    /// Minify whitespace, identifiers and syntax.
    pub minify: bool,
    /// Preserve function and class names under minification.
    pub keep_names: bool,
}

impl TranspileSpec {
    /// Create a spec with minification on and names kept.
    #[must_use]
    pub fn new(filename: impl Into<String>, target: EsTarget) -> Self {
        Self {
            filename: filename.into(),
            target,
            minify: true,
            keep_names: true,
        }
    }

    #[must_use]
    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    #[must_use]
    pub fn with_keep_names(mut self, keep_names: bool) -> Self {
        self.keep_names = keep_names;
        self
    }
}

/// Result of a successful transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOutput {
    pub code: String,
}

impl TranspileOutput {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// A backend failure, tagged with one of the [`codes`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CompilerError {
    pub code: &'static str,
    pub message: String,
}

impl CompilerError {
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: codes::PARSE_ERROR,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transform_error(message: impl Into<String>) -> Self {
        Self {
            code: codes::TRANSFORM_ERROR,
            message: message.into(),
        }
    }
}

/// Turns one module's source into served code.
///
/// One backend instance serves concurrent requests, hence `Send + Sync`.
pub trait CompilerBackend: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Transform a single source file. Imports are left as written; no other
    /// file is read.
    ///
    /// # Errors
    /// `PARSE_ERROR` for syntax errors, `TRANSFORM_ERROR` if code generation
    /// fails.
    fn transpile(&self, spec: &TranspileSpec, source: &str) -> Result<TranspileOutput, CompilerError>;

    /// Whether files with extension `ext` go through [`Self::transpile`].
    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "js" | "mjs" | "cjs")
    }
}
