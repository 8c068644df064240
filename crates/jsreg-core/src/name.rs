//! Package name codec.
//!
//! Package names are stored under identifiers that may only contain
//! alphanumerics, so names are mapped through a reversible radix-62 encoding
//! of their raw bytes. The mapping needs no lookup table, and names with
//! characters that are illegal in identifiers (`@`, `:`, `.`) survive intact.
//!
//! One literal, [`RESERVED_TOKEN`], names the auth-record collection and is
//! passed through both directions untouched.

use crate::error::RegistryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Collection name for auth records. Never encoded or decoded.
pub const RESERVED_TOKEN: &str = "jsreg_auth_system";

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: u32 = 62;

/// A validated package name.
///
/// Matches `^[A-Za-z0-9@][A-Za-z0-9:_.\-]*$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageName(String);

impl PackageName {
    /// Validate a package name.
    ///
    /// # Errors
    /// Returns `InvalidName` carrying the offending string.
    pub fn parse(input: &str) -> Result<Self, RegistryError> {
        let mut chars = input.chars();

        let valid = match chars.next() {
            Some(first) => {
                (first.is_ascii_alphanumeric() || first == '@')
                    && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '.' | '-'))
            }
            None => false,
        };

        if valid {
            Ok(Self(input.to_string()))
        } else {
            Err(RegistryError::invalid_name(input))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encode into the storage-safe token.
    #[must_use]
    pub fn encode(&self) -> EncodedName {
        if self.0 == RESERVED_TOKEN {
            return EncodedName(RESERVED_TOKEN.to_string());
        }
        EncodedName(to_base62(self.0.as_bytes()))
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Storage-safe token derived from a [`PackageName`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedName(String);

impl EncodedName {
    /// Wrap a token previously read back from storage.
    #[must_use]
    pub fn from_stored(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the original package name.
    #[must_use]
    pub fn decode(&self) -> String {
        decode_name(&self.0)
    }

    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.0 == RESERVED_TOKEN
    }
}

impl fmt::Display for EncodedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validate and encode a package name.
///
/// # Errors
/// Returns `InvalidName` if `name` does not match the package name grammar.
pub fn encode_name(name: &str) -> Result<EncodedName, RegistryError> {
    PackageName::parse(name).map(|name| name.encode())
}

/// Decode a storage token back into a package name.
///
/// Total over anything [`encode_name`] produces. Other input decodes on a
/// best-effort basis: symbols outside the alphabet are skipped and invalid
/// UTF-8 is replaced rather than reported.
#[must_use]
pub fn decode_name(token: &str) -> String {
    if token == RESERVED_TOKEN {
        return RESERVED_TOKEN.to_string();
    }
    String::from_utf8_lossy(&from_base62(token)).into_owned()
}

fn symbol_value(symbol: u8) -> Option<u8> {
    match symbol {
        b'0'..=b'9' => Some(symbol - b'0'),
        b'A'..=b'Z' => Some(symbol - b'A' + 10),
        b'a'..=b'z' => Some(symbol - b'a' + 36),
        _ => None,
    }
}

/// Big-number conversion from base 256 to base 62.
///
/// Leading zero bytes carry over as leading `'0'` symbols so distinct inputs
/// never collide.
fn to_base62(bytes: &[u8]) -> String {
    let zeros = bytes.iter().take_while(|&&b| b == 0).count();

    // Little-endian base-62 digits.
    let mut digits: Vec<u8> = Vec::with_capacity(bytes.len() * 4 / 3 + 1);
    for &byte in &bytes[zeros..] {
        let mut carry = u32::from(byte);
        for digit in &mut digits {
            carry += u32::from(*digit) << 8;
            *digit = (carry % BASE) as u8;
            carry /= BASE;
        }
        while carry > 0 {
            digits.push((carry % BASE) as u8);
            carry /= BASE;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat('0').take(zeros));
    out.extend(digits.iter().rev().map(|&d| char::from(ALPHABET[usize::from(d)])));
    out
}

fn from_base62(token: &str) -> Vec<u8> {
    let values: Vec<u8> = token.bytes().filter_map(symbol_value).collect();
    let zeros = values.iter().take_while(|&&v| v == 0).count();

    // Little-endian base-256 digits.
    let mut bytes: Vec<u8> = Vec::with_capacity(values.len());
    for &value in &values[zeros..] {
        let mut carry = u32::from(value);
        for byte in &mut bytes {
            carry += u32::from(*byte) * BASE;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: &[&str] = &[
        "a",
        "0",
        "00",
        "left-pad",
        "@std:fs",
        "@scope:pkg.name_v2-beta",
        "Z",
        "zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz",
        "9.9.9",
        "@",
        "react",
    ];

    #[test]
    fn test_round_trip() {
        for name in NAMES {
            let encoded = encode_name(name).unwrap();
            assert_eq!(decode_name(encoded.as_str()), *name, "round trip of {name}");
            assert_eq!(encoded.decode(), *name);
        }
    }

    #[test]
    fn test_round_trip_generated_names() {
        let tail: Vec<char> = "azAZ09:_.-".chars().collect();
        let heads = ['a', 'Z', '0', '@'];
        for head in heads {
            for a in &tail {
                for b in &tail {
                    let name = format!("{head}{a}{b}");
                    let encoded = encode_name(&name).unwrap();
                    assert_eq!(decode_name(encoded.as_str()), name);
                }
            }
        }
    }

    #[test]
    fn test_encoded_is_alphanumeric() {
        for name in NAMES {
            let encoded = encode_name(name).unwrap();
            assert!(!encoded.as_str().is_empty());
            assert!(
                encoded.as_str().chars().all(|c| c.is_ascii_alphanumeric()),
                "{encoded} should be alphanumeric"
            );
        }
    }

    #[test]
    fn test_encoding_is_collision_free() {
        let mut seen = std::collections::HashSet::new();
        for name in NAMES {
            assert!(seen.insert(encode_name(name).unwrap()), "collision on {name}");
        }
    }

    #[test]
    fn test_reserved_token_is_fixed_point() {
        assert_eq!(encode_name(RESERVED_TOKEN).unwrap().as_str(), RESERVED_TOKEN);
        assert_eq!(decode_name(RESERVED_TOKEN), RESERVED_TOKEN);
        assert!(EncodedName::from_stored(RESERVED_TOKEN).is_reserved());
    }

    #[test]
    fn test_invalid_names_rejected() {
        for bad in ["", ".hidden", "has space", "a/b", "-dash", "_under", "é", "name!"] {
            match encode_name(bad) {
                Err(RegistryError::InvalidName { name }) => assert_eq!(name, bad),
                other => panic!("expected InvalidName for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_garbage_does_not_panic() {
        let _ = decode_name("");
        let _ = decode_name("!!!");
        let _ = decode_name("not-base62/at all");
    }

    #[test]
    fn test_known_encoding() {
        // 'a' is 97 = 1 * 62 + 35
        assert_eq!(encode_name("a").unwrap().as_str(), "1Z");
    }
}
