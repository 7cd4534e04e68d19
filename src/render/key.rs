//! Content-addressed cache keys
//!
//! A key is the SHA256 of the stripped source, the digest of the empty
//! document template, and the magnification. Changing the preamble or the
//! resolution therefore moves every formula to a new key.

use sha2::{Digest, Sha256};
use std::fmt;

/// Hex-encoded SHA256 identifying one rendered formula
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `source` under the given template digest and resolution
    pub fn derive(source: &str, template_digest: &str, resolution: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(source.trim().as_bytes());
        hasher.update(template_digest.as_bytes());
        hasher.update(resolution.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// The hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the image file for this key
    pub fn image_name(&self) -> String {
        format!("{}.png", self.0)
    }

    /// Name of an intermediate artifact with the given extension
    pub fn artifact_name(&self, ext: &str) -> String {
        format!("{}.{}", self.0, ext)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SHA256 hex digest of an arbitrary text, used for the template digest
pub fn digest_text(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
