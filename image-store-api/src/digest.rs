//! Content digests in the canonical `sha256:<hex>` form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::StoreError;

/// A SHA-256 content digest.
///
/// The canonical rendering is `sha256:` followed by 64 lowercase hex
/// characters. Parsing rejects every other algorithm, so a `Digest` always
/// names content this engine can verify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    hex: String,
}

impl Digest {
    /// The only digest algorithm the store understands.
    pub const ALGORITHM: &'static str = "sha256";

    /// Compute the digest of a complete byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            hex: hex::encode(Sha256::digest(data)),
        }
    }

    /// The hex portion of the digest, without the algorithm prefix.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", Self::ALGORITHM, self.hex)
    }
}

impl FromStr for Digest {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || StoreError::BadBlobDigest(s.to_string());

        let (algorithm, hex) = s.split_once(':').ok_or_else(bad)?;
        if algorithm != Self::ALGORITHM {
            return Err(bad());
        }
        if hex.len() != 64 || !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(bad());
        }

        Ok(Self {
            hex: hex.to_string(),
        })
    }
}

impl TryFrom<String> for Digest {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.to_string()
    }
}

/// Streaming SHA-256 digester.
///
/// Feed bytes with [`update`](Digester::update) as they arrive, then call
/// [`finalize`](Digester::finalize) for the resulting [`Digest`].
#[derive(Debug, Default, Clone)]
pub struct Digester {
    hasher: Sha256,
}

impl Digester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finalize(self) -> Digest {
        Digest {
            hex: hex::encode(self.hasher.finalize()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str =
        "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn digest_of_empty_input() {
        assert_eq!(Digest::from_bytes(b"").to_string(), EMPTY_SHA256);
    }

    #[test]
    fn parse_round_trip() {
        let digest: Digest = EMPTY_SHA256.parse().unwrap();
        assert_eq!(digest.to_string(), EMPTY_SHA256);
        assert_eq!(format!("sha256:{}", digest.hex()), EMPTY_SHA256);
    }

    #[test]
    fn rejects_other_algorithms() {
        let sha512 = format!("sha512:{}", "a".repeat(128));
        assert!(sha512.parse::<Digest>().is_err());
    }

    #[test]
    fn rejects_malformed_hex() {
        assert!("sha256:abc".parse::<Digest>().is_err());
        let upper = format!("sha256:{}", "A".repeat(64));
        assert!(upper.parse::<Digest>().is_err());
        assert!("not-a-digest".parse::<Digest>().is_err());
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut digester = Digester::new();
        digester.update(b"test-");
        digester.update(b"data3");
        assert_eq!(digester.finalize(), Digest::from_bytes(b"test-data3"));
    }

    #[test]
    fn serde_uses_string_form() {
        let digest = Digest::from_bytes(b"test-data3");
        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{digest}\""));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
