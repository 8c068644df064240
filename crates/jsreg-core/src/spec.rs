//! Specifier parsing.
//!
//! Splits combined `name@version` tokens:
//! - `left-pad`
//! - `left-pad@1.0.0`
//! - `@std:fs@0.4.0-beta.1+build.7`
//!
//! Version detection is strict (full semver on the part after the last `@`),
//! extraction is deliberately loose so trailing prerelease/build suffixes come
//! along without separate validation.

use regex_lite::Regex;
use semver::Version;
use std::sync::OnceLock;

/// Relaxed numeric-dot run followed by anything ending in an alphanumeric.
const LOOSE_VERSION_PATTERN: &str = r"[0-9]+(?:\.[0-9]+)+.*[A-Za-z0-9]+";

fn loose_version() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LOOSE_VERSION_PATTERN).expect("version pattern is valid"))
}

/// A parsed `name[@version]` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    /// Bare package name.
    pub name: String,
    /// Pinned version (None means latest).
    pub version: Option<String>,
}

impl Specifier {
    /// Parse a specifier token. Never fails; a token without a detectable
    /// version is treated as a bare name.
    #[must_use]
    pub fn parse(token: &str) -> Self {
        let (name, version) = split_name_and_version(token);
        Self { name, version }
    }

    /// Check if a version is pinned.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }
}

/// Whether the part of `token` after the last `@` is a semantic version.
///
/// A bare name (no `@`) yields `false`.
#[must_use]
pub fn has_version(token: &str) -> bool {
    match token.rsplit_once('@') {
        Some((_, candidate)) => Version::parse(candidate).is_ok(),
        None => false,
    }
}

/// Extract the first loose version run from `token`.
///
/// `pkg@2.10.4` → `2.10.4`. Returns `None` when nothing resembling a
/// dotted numeric version is present.
#[must_use]
pub fn extract_version(token: &str) -> Option<String> {
    loose_version()
        .find(token)
        .map(|m| m.as_str().to_string())
}

/// Split `name@version` into its parts.
///
/// The version is extracted from the text after the last `@`, then the first
/// occurrence of the literal `@<version>` is removed from the token. A name
/// that itself contains `@<version>` would lose that occurrence instead; version
/// strings inside names are rare enough that this is accepted.
#[must_use]
pub fn split_name_and_version(token: &str) -> (String, Option<String>) {
    if !has_version(token) {
        return (token.to_string(), None);
    }

    let tail = token.rsplit_once('@').map_or(token, |(_, tail)| tail);
    match extract_version(tail) {
        Some(version) => {
            let name = token.replacen(&format!("@{version}"), "", 1);
            (name, Some(version))
        }
        None => (token.to_string(), None),
    }
}
