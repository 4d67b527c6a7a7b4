//! Content addressing for cached track products
//!
//! A [`CacheKey`] is the SHA-256 digest of an attachment's original URL. It is
//! stored as raw bytes and rendered as lowercase hex wherever it becomes part
//! of a file name or a serialized record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 digest identifying every cache entry derived from one source URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey([u8; 32]);

/// Error returned when parsing a malformed hex key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid cache key: {0}. Expected 64 hex characters")]
pub struct InvalidCacheKey(pub String);

impl CacheKey {
    /// Derive the key for a source URL
    ///
    /// The digest covers the URL exactly as it appears in the attachment, not
    /// the URL actually fetched, so a change of export endpoint keeps the
    /// cache valid.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use perms_fetcher::app::CacheKey;
    ///
    /// let a = CacheKey::from_url("https://ridewithgps.com/routes/12345");
    /// let b = CacheKey::from_url("https://ridewithgps.com/routes/12345");
    /// assert_eq!(a, b);
    /// assert_eq!(a.to_hex().len(), 64);
    /// ```
    pub fn from_url(url: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        CacheKey(hasher.finalize().into())
    }

    /// Parse a key from its 64-character hex form (case insensitive)
    pub fn from_hex(hex_str: &str) -> Result<Self, InvalidCacheKey> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|_| InvalidCacheKey(hex_str.to_string()))?;
        Ok(CacheKey(bytes))
    }

    /// Lowercase hex representation, as used in cache file names
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for CacheKey {
    type Err = InvalidCacheKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Serialized as hex so keys stay readable in JSON
impl Serialize for CacheKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CacheKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex_string = String::deserialize(deserializer)?;
        Self::from_hex(&hex_string).map_err(serde::de::Error::custom)
    }
}
