//! Decoded cryptographic resources.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::location::Location;

/// Attribute naming the private key a public key belongs to.
pub const LINKED_KEY_ATTR: &str = "Linked-Key";

/// Attribute a private key may carry to declare its own identifier.
pub const KEY_ID_ATTR: &str = "Key-Id";

/// Legacy OpenSSL header marking encrypted PEM blocks.
pub const PROC_TYPE_ATTR: &str = "Proc-Type";

/// What a resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Private key (plain or encrypted)
    PrivateKey,
    /// Public key
    PublicKey,
    /// X.509 certificate
    Certificate,
    /// PKCS#10 certificate signing request
    CertificateRequest,
    /// Certificate revocation list
    RevocationList,
    /// Anything else found in a PEM envelope
    Unknown,
}

/// Encoding-type tags and the kind each one maps to.
const TAG_KINDS: &[(&str, ResourceKind)] = &[
    ("PRIVATE KEY", ResourceKind::PrivateKey),
    ("ENCRYPTED PRIVATE KEY", ResourceKind::PrivateKey),
    ("RSA PRIVATE KEY", ResourceKind::PrivateKey),
    ("EC PRIVATE KEY", ResourceKind::PrivateKey),
    ("DSA PRIVATE KEY", ResourceKind::PrivateKey),
    ("OPENSSH PRIVATE KEY", ResourceKind::PrivateKey),
    ("PUBLIC KEY", ResourceKind::PublicKey),
    ("RSA PUBLIC KEY", ResourceKind::PublicKey),
    ("CERTIFICATE", ResourceKind::Certificate),
    ("X509 CERTIFICATE", ResourceKind::Certificate),
    ("TRUSTED CERTIFICATE", ResourceKind::Certificate),
    ("CERTIFICATE REQUEST", ResourceKind::CertificateRequest),
    ("NEW CERTIFICATE REQUEST", ResourceKind::CertificateRequest),
    ("X509 CRL", ResourceKind::RevocationList),
];

impl ResourceKind {
    /// Map an encoding-type tag (e.g. a PEM label) to a kind.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        TAG_KINDS
            .iter()
            .find(|(known, _)| *known == tag)
            .map_or(Self::Unknown, |(_, kind)| *kind)
    }

    /// Short label for listings
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::PrivateKey => "private key",
            Self::PublicKey => "public key",
            Self::Certificate => "certificate",
            Self::CertificateRequest => "request",
            Self::RevocationList => "crl",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single cryptographic artifact extracted from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// What this is
    pub kind: ResourceKind,
    /// Original encoding-type tag (PEM label or the label DER sniffing assigned)
    pub tag: String,
    /// Decoded DER bytes. Never serialized: this can be private key material.
    #[serde(skip)]
    pub payload: Vec<u8>,
    /// Headers carried alongside the payload
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Where it was found
    pub location: Location,
}

impl Resource {
    /// Build a resource whose kind is derived from `tag`.
    pub fn new(tag: impl Into<String>, payload: Vec<u8>, location: Location) -> Self {
        let tag = tag.into();
        Self {
            kind: ResourceKind::from_tag(&tag),
            tag,
            payload,
            attributes: BTreeMap::new(),
            location,
        }
    }

    /// Add one attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// True for private keys whose public half cannot be read without a passphrase.
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        if self.kind != ResourceKind::PrivateKey {
            return false;
        }
        self.tag == "ENCRYPTED PRIVATE KEY"
            || self
                .attributes
                .get(PROC_TYPE_ATTR)
                .is_some_and(|v| v.contains("ENCRYPTED"))
    }

    /// Explicit identifier of the private key this resource belongs to
    #[must_use]
    pub fn linked_key(&self) -> Option<&str> {
        self.attributes
            .get(LINKED_KEY_ATTR)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Identifier a private key declares for itself
    #[must_use]
    pub fn declared_key_id(&self) -> Option<&str> {
        self.attributes
            .get(KEY_ID_ATTR)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// How a scan ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Every producer finished and the stream closed normally
    Complete,
    /// Cancellation was raised; results are partial
    Cancelled,
}

impl ScanOutcome {
    /// Returns true if the scan ran to completion
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Complete)
    }
}
