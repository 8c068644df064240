//! Default-export detection.
//!
//! A lexical heuristic, not a parser: matches inside strings or comments are
//! false positives, and default exports produced by forms the pattern does
//! not know about are missed. Callers only see the boolean, so a real lexer
//! can replace this without touching them.

use regex_lite::Regex;
use std::sync::OnceLock;

const DEFAULT_EXPORT_PATTERN: &str = r"\bexport\s+default\b|\bas\s+default\b";

fn default_export() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DEFAULT_EXPORT_PATTERN).expect("default export pattern is valid"))
}

/// Whether `source` appears to provide a default export, either directly
/// (`export default ...`) or by renaming (`export { x as default }`).
#[must_use]
pub fn has_default_export(source: &str) -> bool {
    default_export().is_match(source)
}
