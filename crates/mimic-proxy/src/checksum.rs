//! Content checksum for persisted modules

use crate::error::ProxyError;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// 32-byte Blake3 digest of a module's serialized payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleChecksum([u8; 32]);

impl ModuleChecksum {
    /// Hash raw bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash the JSON encoding of `value`
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn of_serializable<T: serde::Serialize>(value: &T) -> Result<Self, ProxyError> {
        let json = serde_json::to_vec(value)?;
        Ok(Self::compute(&json))
    }

    /// Raw digest
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// First 16 hex characters
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ModuleChecksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ModuleChecksum {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ProxyError::InvalidChecksum(e.to_string()))?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ProxyError::InvalidChecksum(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self(array))
    }
}
