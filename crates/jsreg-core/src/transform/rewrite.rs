//! Import rewriting for registry-served modules.
//!
//! Relative specifiers in transformed output are rewritten to absolute,
//! version-pinned registry URLs so nested imports resolve against the
//! registry's own URL space:
//! - `from"./util.js"` in `lib/index.js` → `from"/<segment>/<pkg>/<ver>/<target>/lib/util.js"`
//! - `import("../x.js")` → `import("/<segment>/<pkg>/<ver>/<target>/x.js")`
//!
//! Bare specifiers and absolute URLs are left as written.

use regex_lite::{Captures, Regex};
use std::sync::OnceLock;

fn relative_specifier() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(\bfrom\s*|\bimport\s*|\bimport\s*\(\s*)(["'])(\.\.?/[^"']*)(["'])"#)
            .expect("relative specifier pattern is valid")
    })
}

/// Rewrites relative specifiers against one package/version/target prefix.
#[derive(Debug, Clone)]
pub struct ImportRewriter {
    prefix: String,
}

impl ImportRewriter {
    /// Create a rewriter producing `/<segment>/<name>/<version>/<target>/...`.
    #[must_use]
    pub fn new(segment: &str, name: &str, version: &str, target: &str) -> Self {
        Self {
            prefix: format!("/{segment}/{name}/{version}/{target}"),
        }
    }

    /// The URL prefix all rewritten specifiers share.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Absolute URL for a package-relative path.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.prefix, path.trim_start_matches('/'))
    }

    /// Rewrite every relative specifier in `code`.
    ///
    /// `module_path` is the package-relative path of the file `code` came
    /// from; specifiers resolve against its directory.
    #[must_use]
    pub fn rewrite(&self, code: &str, module_path: &str) -> String {
        let module_dir = parent_dir(module_path);
        relative_specifier()
            .replace_all(code, |caps: &Captures<'_>| {
                let resolved = resolve_relative(module_dir, &caps[3]);
                format!("{}{}{}{}", &caps[1], &caps[2], self.url_for(&resolved), &caps[4])
            })
            .into_owned()
    }
}

/// Directory part of a package-relative path (`""` at the root).
#[must_use]
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Join `specifier` onto `dir` and normalize `.` and `..` segments.
///
/// `..` never climbs above the package root.
#[must_use]
pub fn resolve_relative(dir: &str, specifier: &str) -> String {
    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();

    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}
