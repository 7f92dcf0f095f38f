//! Content fingerprints using BLAKE3.

use std::fmt;

/// Fingerprint digest size in bytes (BLAKE3 produces 256-bit hashes).
pub const FINGERPRINT_SIZE: usize = 32;

/// A 32-byte BLAKE3 digest of a resource's persisted form.
///
/// File-backed resources record one when they load or save, and compare a
/// fresh one at save time to decide whether a save would be a no-op.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Convert to hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Fingerprint raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Fingerprint(*hash.as_bytes())
    }

    /// Fingerprint a JSON value by its compact serialization.
    ///
    /// Key order is part of the fingerprint, since it is part of what gets
    /// written to disk.
    pub fn of_json(value: &serde_json::Value) -> Self {
        let mut hasher = blake3::Hasher::new();
        // Writing into a hasher cannot fail
        let _ = serde_json::to_writer(&mut hasher, value);
        Fingerprint(*hasher.finalize().as_bytes())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}
