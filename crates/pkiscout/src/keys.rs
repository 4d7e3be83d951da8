//! Public-key extraction.
//!
//! Every resource that carries or implies a public key is reduced to a DER
//! SubjectPublicKeyInfo, the input of [`crate::hash::fingerprint`]. Private
//! keys are handled per encoding tag through a table of derivers, so adding
//! an algorithm means adding a row.

use std::fmt;

use ed25519_dalek::SigningKey;
use pkcs8::spki::{AlgorithmIdentifierRef, SubjectPublicKeyInfoRef};
use pkcs8::{DecodePrivateKey, EncodePublicKey, ObjectIdentifier, PrivateKeyInfo};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use serde::Serialize;
use x509_parser::prelude::{parse_x509_certificate, FromDer, X509CertificationRequest};

use pkiscout_core::{Resource, ResourceKind, Result, ScanError};

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Public-key algorithms we can derive and recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    /// RSA, any modulus size
    Rsa,
    /// ECDSA with P-256 curve
    EcdsaP256,
    /// ECDSA with P-384 curve
    EcdsaP384,
    /// Ed25519
    Ed25519,
}

impl KeyAlgorithm {
    /// Identify the algorithm from an `AlgorithmIdentifier`.
    #[must_use]
    pub fn from_identifier(algorithm: &AlgorithmIdentifierRef<'_>) -> Option<Self> {
        if algorithm.oid == RSA_ENCRYPTION {
            return Some(Self::Rsa);
        }
        if algorithm.oid == ED25519 {
            return Some(Self::Ed25519);
        }
        if algorithm.oid != EC_PUBLIC_KEY {
            return None;
        }

        let curve = algorithm.parameters_oid().ok()?;
        if curve == SECP256R1 {
            Some(Self::EcdsaP256)
        } else if curve == SECP384R1 {
            Some(Self::EcdsaP384)
        } else {
            None
        }
    }

    /// Short name for listings
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::EcdsaP256 => "P-256",
            Self::EcdsaP384 => "P-384",
            Self::Ed25519 => "Ed25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A public key derived from a private key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    /// Algorithm of the pair
    pub algorithm: KeyAlgorithm,
    /// DER SubjectPublicKeyInfo
    pub spki: Vec<u8>,
}

type Deriver = fn(&[u8]) -> Result<DerivedKey>;

/// Private-key encoding tags we can derive a public key from.
const DERIVERS: &[(&str, Deriver)] = &[
    ("PRIVATE KEY", derive_pkcs8),
    ("RSA PRIVATE KEY", derive_pkcs1),
    ("EC PRIVATE KEY", derive_sec1),
];

fn unsupported(err: impl fmt::Display) -> ScanError {
    ScanError::UnsupportedKey(err.to_string())
}

/// Derive the public key of an unencrypted private key.
///
/// Fails with [`ScanError::UnsupportedKey`] when the tag has no deriver or
/// the algorithm is not one we handle.
pub fn derive_public_key(tag: &str, der: &[u8]) -> Result<DerivedKey> {
    let (_, deriver) = DERIVERS
        .iter()
        .find(|(known, _)| *known == tag)
        .ok_or_else(|| unsupported(format!("no derivation for {tag}")))?;
    deriver(der)
}

fn derive_pkcs8(der: &[u8]) -> Result<DerivedKey> {
    let info = PrivateKeyInfo::try_from(der).map_err(unsupported)?;
    let algorithm = KeyAlgorithm::from_identifier(&info.algorithm)
        .ok_or_else(|| unsupported(format!("algorithm {}", info.algorithm.oid)))?;

    let spki = match algorithm {
        KeyAlgorithm::Rsa => rsa::RsaPrivateKey::from_pkcs8_der(der)
            .map_err(unsupported)?
            .to_public_key()
            .to_public_key_der(),
        KeyAlgorithm::EcdsaP256 => p256::SecretKey::from_pkcs8_der(der)
            .map_err(unsupported)?
            .public_key()
            .to_public_key_der(),
        KeyAlgorithm::EcdsaP384 => p384::SecretKey::from_pkcs8_der(der)
            .map_err(unsupported)?
            .public_key()
            .to_public_key_der(),
        KeyAlgorithm::Ed25519 => SigningKey::from_pkcs8_der(der)
            .map_err(unsupported)?
            .verifying_key()
            .to_public_key_der(),
    }
    .map_err(unsupported)?;

    Ok(DerivedKey {
        algorithm,
        spki: spki.into_vec(),
    })
}

fn derive_pkcs1(der: &[u8]) -> Result<DerivedKey> {
    let spki = rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(unsupported)?
        .to_public_key()
        .to_public_key_der()
        .map_err(unsupported)?;
    Ok(DerivedKey {
        algorithm: KeyAlgorithm::Rsa,
        spki: spki.into_vec(),
    })
}

fn derive_sec1(der: &[u8]) -> Result<DerivedKey> {
    // The curve parameters are optional in SEC1, so try each curve.
    if let Ok(key) = p256::SecretKey::from_sec1_der(der) {
        let spki = key.public_key().to_public_key_der().map_err(unsupported)?;
        return Ok(DerivedKey {
            algorithm: KeyAlgorithm::EcdsaP256,
            spki: spki.into_vec(),
        });
    }
    let key = p384::SecretKey::from_sec1_der(der).map_err(unsupported)?;
    let spki = key.public_key().to_public_key_der().map_err(unsupported)?;
    Ok(DerivedKey {
        algorithm: KeyAlgorithm::EcdsaP384,
        spki: spki.into_vec(),
    })
}

/// DER SubjectPublicKeyInfo carried or implied by `resource`.
///
/// Private keys are derived, public keys are validated (PKCS#1 RSA public
/// keys are re-encoded), certificates and requests give their embedded key.
/// Encrypted keys and anything else fail with [`ScanError::UnsupportedKey`].
pub fn public_key_der(resource: &Resource) -> Result<Vec<u8>> {
    let der = resource.payload.as_slice();
    match resource.kind {
        ResourceKind::PrivateKey if resource.is_encrypted() => {
            Err(unsupported("private key is encrypted"))
        }
        ResourceKind::PrivateKey => derive_public_key(&resource.tag, der).map(|d| d.spki),
        ResourceKind::PublicKey if resource.tag == "RSA PUBLIC KEY" => {
            let spki = rsa::RsaPublicKey::from_pkcs1_der(der)
                .map_err(unsupported)?
                .to_public_key_der()
                .map_err(unsupported)?;
            Ok(spki.into_vec())
        }
        ResourceKind::PublicKey => {
            SubjectPublicKeyInfoRef::try_from(der).map_err(unsupported)?;
            Ok(der.to_vec())
        }
        ResourceKind::Certificate => {
            let (_, cert) = parse_x509_certificate(der).map_err(unsupported)?;
            Ok(cert.public_key().raw.to_vec())
        }
        ResourceKind::CertificateRequest => {
            let (_, csr) = X509CertificationRequest::from_der(der).map_err(unsupported)?;
            Ok(csr.certification_request_info.subject_pki.raw.to_vec())
        }
        ResourceKind::RevocationList | ResourceKind::Unknown => {
            Err(unsupported(format!("{} carries no public key", resource.kind)))
        }
    }
}

/// Algorithm of a DER SubjectPublicKeyInfo
#[must_use]
pub fn algorithm_of(spki: &[u8]) -> Option<KeyAlgorithm> {
    let info = SubjectPublicKeyInfoRef::try_from(spki).ok()?;
    KeyAlgorithm::from_identifier(&info.algorithm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::decode_pem;
    use crate::hash::fingerprint;
    use pkiscout_core::Location;

    const RSA_FP: &str = "952679f858cfdb1f477a1c19b9ddab21b60941ff4e7e973f503526a5c8e33299";
    const EC_FP: &str = "8e35eedc3a2d8bc03a08cfe64c2c47e5d1692da3b87691dbf843b70b882c9e32";
    const ED25519_FP: &str = "1bf0dc3a51c6da0382d6fb4d9bffc18eaede10064a8de0360063a23c775cab46";
    const P384_FP: &str = "ee146441f7c5fb6b0fb34ed33909938377b274d492b495dc172eb506475e350c";

    fn resource(pem: &[u8]) -> Resource {
        let block = decode_pem(pem).unwrap().remove(0);
        let mut res = Resource::new(block.tag, block.der, Location::new("/fixture"));
        for (k, v) in block.headers {
            res = res.with_attribute(k, v);
        }
        res
    }

    fn fp_of(pem: &[u8]) -> String {
        fingerprint(&public_key_der(&resource(pem)).unwrap()).to_string()
    }

    #[test]
    fn private_and_public_halves_agree() {
        assert_eq!(fp_of(include_bytes!("../testdata/rsa.key")), RSA_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/rsa.pub")), RSA_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/ec.key")), EC_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/ec.pub")), EC_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/ed25519.key")), ED25519_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/ed25519.pub")), ED25519_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/p384.key")), P384_FP);
    }

    #[test]
    fn legacy_encodings_derive_the_same_key() {
        assert_eq!(fp_of(include_bytes!("../testdata/rsa_pkcs1.key")), RSA_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/ec_sec1.key")), EC_FP);

        let sec1_der = include_bytes!("../testdata/ec_sec1.key.der");
        let derived = derive_public_key("EC PRIVATE KEY", sec1_der).unwrap();
        assert_eq!(fingerprint(&derived.spki).as_str(), EC_FP);
    }

    #[test]
    fn certificates_and_requests_carry_the_key() {
        assert_eq!(fp_of(include_bytes!("../testdata/rsa.crt")), RSA_FP);
        assert_eq!(fp_of(include_bytes!("../testdata/ec.csr")), EC_FP);
    }

    #[test]
    fn encrypted_keys_are_not_derivable() {
        let enc = resource(include_bytes!("../testdata/enc.key"));
        assert!(matches!(public_key_der(&enc), Err(ScanError::UnsupportedKey(_))));

        let legacy = resource(include_bytes!("../testdata/legacy_enc.key"));
        assert!(legacy.is_encrypted());
        assert!(public_key_der(&legacy).is_err());
    }

    #[test]
    fn unknown_tags_have_no_deriver() {
        assert!(derive_public_key("OPENSSH PRIVATE KEY", &[0x30, 0x00]).is_err());
    }

    #[test]
    fn algorithm_detection() {
        let rsa = public_key_der(&resource(include_bytes!("../testdata/rsa.pub"))).unwrap();
        let ec = public_key_der(&resource(include_bytes!("../testdata/ec.pub"))).unwrap();
        let ed = public_key_der(&resource(include_bytes!("../testdata/ed25519.pub"))).unwrap();
        let p384 = derive_public_key("PRIVATE KEY", &resource(include_bytes!("../testdata/p384.key")).payload)
            .unwrap();

        assert_eq!(algorithm_of(&rsa), Some(KeyAlgorithm::Rsa));
        assert_eq!(algorithm_of(&ec), Some(KeyAlgorithm::EcdsaP256));
        assert_eq!(algorithm_of(&ed), Some(KeyAlgorithm::Ed25519));
        assert_eq!(p384.algorithm, KeyAlgorithm::EcdsaP384);
        assert_eq!(algorithm_of(b"nope"), None);
    }
}
