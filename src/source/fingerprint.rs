//! Content hash of a decoded desired-state list.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical JSON encoding of a value.
///
/// Maps inside the endpoint shapes are ordered, so equal content always
/// hashes equally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigFingerprint(String);

impl ConfigFingerprint {
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_vec(value)?;
        let digest = Sha256::digest(&encoded);
        Ok(Self(format!("{:x}", digest)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_equal_content_equal_hash() {
        let mut first = BTreeMap::new();
        first.insert("b", 2);
        first.insert("a", 1);
        let mut second = BTreeMap::new();
        second.insert("a", 1);
        second.insert("b", 2);

        assert_eq!(
            ConfigFingerprint::of(&first).unwrap(),
            ConfigFingerprint::of(&second).unwrap()
        );
    }

    #[test]
    fn test_hex_encoded() {
        let fingerprint = ConfigFingerprint::of(&vec![1, 2, 3]).unwrap();
        assert_eq!(fingerprint.as_str().len(), 64);
        assert!(fingerprint.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(fingerprint, ConfigFingerprint::of(&vec![1, 2]).unwrap());
    }
}
