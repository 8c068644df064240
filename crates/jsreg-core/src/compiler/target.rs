//! Language-level targets.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};

/// ECMAScript output level a module is downleveled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EsTarget {
    /// Also accepted as `es6`.
    ES2015,
    ES2016,
    ES2017,
    ES2018,
    ES2019,
    ES2020,
    ES2021,
    #[default]
    ES2022,
    ES2023,
    ES2024,
    /// Latest ECMAScript features, no downleveling.
    ESNext,
}

impl EsTarget {
    /// Every recognized target, oldest first.
    pub const ALL: [Self; 11] = [
        Self::ES2015,
        Self::ES2016,
        Self::ES2017,
        Self::ES2018,
        Self::ES2019,
        Self::ES2020,
        Self::ES2021,
        Self::ES2022,
        Self::ES2023,
        Self::ES2024,
        Self::ESNext,
    ];

    /// Resolve a language-level token from a request URL.
    ///
    /// Matching is case-insensitive and `es6` is accepted as an alias of
    /// `es2015`.
    ///
    /// # Errors
    /// Returns `UnsupportedTarget` carrying the token as given.
    pub fn parse(token: &str) -> Result<Self, RegistryError> {
        let lowered = token.to_ascii_lowercase();
        if lowered == "es6" {
            return Ok(Self::ES2015);
        }
        Self::ALL
            .into_iter()
            .find(|target| target.as_str() == lowered)
            .ok_or_else(|| RegistryError::UnsupportedTarget(token.to_string()))
    }

    /// Canonical lowercase token, as used in module URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ES2015 => "es2015",
            Self::ES2016 => "es2016",
            Self::ES2017 => "es2017",
            Self::ES2018 => "es2018",
            Self::ES2019 => "es2019",
            Self::ES2020 => "es2020",
            Self::ES2021 => "es2021",
            Self::ES2022 => "es2022",
            Self::ES2023 => "es2023",
            Self::ES2024 => "es2024",
            Self::ESNext => "esnext",
        }
    }

    /// Edition year, or `None` for `esnext`.
    #[must_use]
    pub fn year(self) -> Option<u16> {
        match self {
            Self::ESNext => None,
            other => other.as_str().strip_prefix("es").and_then(|y| y.parse().ok()),
        }
    }
}

impl std::fmt::Display for EsTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EsTarget {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
