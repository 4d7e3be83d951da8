//! SHA-256 fingerprints via `ring::digest`.

use ring::digest::{digest, SHA256};

use pkiscout_core::KeyFingerprint;

/// Compute SHA-256 of raw bytes, lowercase hex.
#[must_use]
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::encode(digest(&SHA256, data).as_ref())
}

/// Fingerprint of a DER SubjectPublicKeyInfo.
#[must_use]
pub fn fingerprint(spki_der: &[u8]) -> KeyFingerprint {
    KeyFingerprint::from_hex(sha256_bytes(spki_der))
}

/// Fingerprint of an opaque key blob, used when no public key is derivable.
#[must_use]
pub fn blob_fingerprint(payload: &[u8]) -> KeyFingerprint {
    KeyFingerprint::from_hex(sha256_bytes(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_bytes() {
        let hash = sha256_bytes(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            sha256_bytes(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_is_idempotent() {
        let spki = b"not really der but hashing does not care";
        assert_eq!(fingerprint(spki), fingerprint(spki));
        assert_eq!(fingerprint(spki).as_str().len(), 64);
    }
}
