//! Binary asset inlining.
//!
//! Files in the inline set never reach the browser as separate requests:
//! a requested asset becomes a module whose default export is a `data:` URL,
//! and default imports of assets in JavaScript are replaced with the same URL
//! as a string constant.

use super::rewrite::resolve_relative;
use crate::archive::ArchiveFs;
use crate::error::RegistryError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex_lite::{Captures, Regex};
use std::sync::OnceLock;

/// Extensions embedded as data URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineAsset {
    Wasm,
    Svg,
    Png,
    Webp,
    Ttf,
    Eot,
    Woff,
    Woff2,
}

impl InlineAsset {
    /// Determine the asset kind from a file extension (without the dot).
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "wasm" => Some(Self::Wasm),
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "ttf" => Some(Self::Ttf),
            "eot" => Some(Self::Eot),
            "woff" => Some(Self::Woff),
            "woff2" => Some(Self::Woff2),
            _ => None,
        }
    }

    /// Determine the asset kind from the extension of a path or specifier.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let file = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file.rsplit_once('.')?;
        Self::from_extension(ext)
    }

    #[must_use]
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Wasm => "application/wasm",
            Self::Svg => "image/svg+xml",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Ttf => "font/ttf",
            Self::Eot => "application/vnd.ms-fontobject",
            Self::Woff => "font/woff",
            Self::Woff2 => "font/woff2",
        }
    }

    /// Encode `bytes` as a base64 `data:` URL of this kind.
    #[must_use]
    pub fn data_url(&self, bytes: &[u8]) -> String {
        format!("data:{};base64,{}", self.mime(), STANDARD.encode(bytes))
    }

    /// Module text whose default export is the asset's data URL.
    #[must_use]
    pub fn module(&self, bytes: &[u8]) -> String {
        format!("export default \"{}\";\n", self.data_url(bytes))
    }
}

fn default_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bimport\s+([A-Za-z_$][A-Za-z0-9_$]*)\s+from\s*["']([^"']+)["']\s*;?"#)
            .expect("default import pattern is valid")
    })
}

fn side_effect_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bimport\s*["']([^"']+)["']\s*;?"#).expect("side-effect import pattern is valid")
    })
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// Replace relative asset imports in `source` with inline data.
///
/// `module_dir` is the directory of the file being transformed, relative to
/// the package root. `import logo from "./logo.svg"` becomes
/// `const logo = "data:image/svg+xml;base64,...";` and side-effect imports of
/// assets are removed. Anything else is left untouched.
///
/// # Errors
/// Returns `NotFound` naming the resolved path when an imported asset is not
/// in the archive.
pub fn inline_asset_imports(
    source: &str,
    module_dir: &str,
    archive: &ArchiveFs,
) -> Result<String, RegistryError> {
    let source = replace_fallible(default_import(), source, |caps| {
        let specifier = &caps[2];
        let Some(asset) = InlineAsset::from_path(specifier).filter(|_| is_relative(specifier))
        else {
            return Ok(None);
        };
        let path = resolve_relative(module_dir, specifier);
        let bytes = archive.read(&path)?;
        Ok(Some(format!("const {} = \"{}\";", &caps[1], asset.data_url(bytes))))
    })?;

    replace_fallible(side_effect_import(), &source, |caps| {
        let specifier = &caps[1];
        if !is_relative(specifier) || InlineAsset::from_path(specifier).is_none() {
            return Ok(None);
        }
        let path = resolve_relative(module_dir, specifier);
        archive.read(&path)?;
        Ok(Some(String::new()))
    })
}

/// `Regex::replace_all` with a replacer that can fail or decline.
fn replace_fallible<F>(re: &Regex, haystack: &str, mut replace: F) -> Result<String, RegistryError>
where
    F: FnMut(&Captures<'_>) -> Result<Option<String>, RegistryError>,
{
    let mut out = String::with_capacity(haystack.len());
    let mut last = 0;

    for caps in re.captures_iter(haystack) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(replacement) = replace(&caps)? {
            out.push_str(&haystack[last..whole.start()]);
            out.push_str(&replacement);
            last = whole.end();
        }
    }

    out.push_str(&haystack[last..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::tgz;

    const SVG: &[u8] = br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#;

    #[test]
    fn test_inline_set() {
        for ext in ["wasm", "svg", "png", "webp", "ttf", "eot", "woff", "woff2", "SVG"] {
            assert!(InlineAsset::from_extension(ext).is_some(), "{ext}");
        }
        for ext in ["js", "css", "json", "jpg", "gif"] {
            assert!(InlineAsset::from_extension(ext).is_none(), "{ext}");
        }
    }

    #[test]
    fn test_from_path() {
        assert_eq!(InlineAsset::from_path("./img/logo.svg"), Some(InlineAsset::Svg));
        assert_eq!(InlineAsset::from_path("fonts/a.woff2"), Some(InlineAsset::Woff2));
        assert_eq!(InlineAsset::from_path("v1.2/readme"), None);
        assert_eq!(InlineAsset::from_path("index.js"), None);
    }

    #[test]
    fn test_data_url() {
        let url = InlineAsset::Png.data_url(b"abc");
        assert_eq!(url, "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_asset_module() {
        let module = InlineAsset::Svg.module(SVG);
        assert!(module.starts_with("export default \"data:image/svg+xml;base64,"));
        assert!(module.trim_end().ends_with("\";"));
    }

    #[test]
    fn test_default_import_inlined() {
        let archive = ArchiveFs::open(&tgz(&[("img/logo.svg", SVG)])).unwrap();
        let source = "import logo from \"./img/logo.svg\";\nexport default logo;\n";

        let out = inline_asset_imports(source, "", &archive).unwrap();
        assert!(out.contains("const logo = \"data:image/svg+xml;base64,"));
        assert!(!out.contains("./img/logo.svg"));
        assert!(out.contains("export default logo;"));
    }

    #[test]
    fn test_parent_relative_import_inlined() {
        let archive = ArchiveFs::open(&tgz(&[("assets/icon.png", b"\x89PNG")])).unwrap();
        let source = "import icon from '../assets/icon.png'\nexport { icon };";

        let out = inline_asset_imports(source, "lib", &archive).unwrap();
        assert!(out.contains("const icon = \"data:image/png;base64,"));
        assert!(!out.contains("icon.png"));
    }

    #[test]
    fn test_side_effect_asset_import_dropped() {
        let archive = ArchiveFs::open(&tgz(&[("font.woff2", b"wOF2")])).unwrap();
        let source = "import \"./font.woff2\";\nexport const ready = true;\n";

        let out = inline_asset_imports(source, "", &archive).unwrap();
        assert!(!out.contains("font.woff2"));
        assert!(out.contains("export const ready = true;"));
    }

    #[test]
    fn test_non_asset_imports_untouched() {
        let archive = ArchiveFs::open(&tgz(&[])).unwrap();
        let source = "import pad from \"./pad.js\";\nimport \"./polyfill.js\";\nimport x from \"pkg/logo.svg\";\n";

        let out = inline_asset_imports(source, "", &archive).unwrap();
        assert_eq!(out, source);
    }

    #[test]
    fn test_missing_asset_is_not_found() {
        let archive = ArchiveFs::open(&tgz(&[("index.js", b"")])).unwrap();
        let err = inline_asset_imports("import a from './a.wasm';", "lib", &archive).unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("lib/a.wasm"));
    }
}
