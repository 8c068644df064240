//! JSON metadata documents served alongside modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Download information for one archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistInfo {
    pub version: String,
    /// `MD5_<hex>` of the archive bytes.
    pub integrity: String,
    pub tarball: String,
    pub size: u64,
}

/// Metadata of one published version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_maintainers")]
    pub maintainers: Vec<String>,
    pub version: String,
    pub published: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub private: bool,
    pub dependencies: BTreeMap<String, String>,
    pub dist: DistInfo,
}

/// Metadata of a package across all public versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub license: String,
    pub description: String,
    pub versions: BTreeMap<String, VersionInfo>,
    /// Publish time per version, plus `created` and `updated`.
    pub times: BTreeMap<String, String>,
    pub dist: DistInfo,
}

/// One row of the package listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
    pub id: String,
    /// Storage token of the name.
    pub b62: String,
    pub created: String,
    pub updated: String,
}

/// A page of the package listing, keyed by decoded package name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageList {
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub packages: BTreeMap<String, PackageEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_field_names() {
        let info = VersionInfo {
            id: "r1".to_string(),
            maintainers: vec!["u1".to_string()],
            version: "1.0.0".to_string(),
            published: String::new(),
            description: String::new(),
            author: String::new(),
            license: "none".to_string(),
            private: false,
            dependencies: BTreeMap::new(),
            dist: DistInfo {
                version: "1.0.0".to_string(),
                integrity: "MD5_00".to_string(),
                tarball: "/a/_/1.0.0/a.tgz".to_string(),
                size: 3,
            },
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["_id"], "r1");
        assert_eq!(json["_maintainers"][0], "u1");
        assert_eq!(json["dist"]["size"], 3);
    }

    #[test]
    fn test_package_list_camel_case() {
        let list = PackageList {
            page: 1,
            per_page: 30,
            total_items: 0,
            total_pages: 0,
            packages: BTreeMap::new(),
        };
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["perPage"], 30);
        assert_eq!(json["totalItems"], 0);
        assert_eq!(json["totalPages"], 0);
    }
}
