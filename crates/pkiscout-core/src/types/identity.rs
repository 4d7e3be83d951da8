//! Resolved identities and the events that build them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::resource::Resource;

/// SHA-256 of a DER SubjectPublicKeyInfo (lowercase hex).
///
/// Two keys with equal fingerprints are the same identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyFingerprint(String);

impl KeyFingerprint {
    /// Wrap an already computed hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    /// The hex digest
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 16 hex characters, for compact listings
    #[must_use]
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which heuristic paired the private key with its public half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Public key derived from the (unencrypted) private key itself
    Derived,
    /// A public key declared the private key through a linked-key identifier
    LinkedKey,
    /// A public key sat next to the private key (same location-root)
    LocationRoot,
    /// Nothing matched; the fingerprint is a hash of the key blob
    Unmatched,
}

/// A private key, its fingerprint, and the certificates issued for it.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    /// Fingerprint of the public key (or of the key blob when unmatched)
    pub fingerprint: KeyFingerprint,
    /// The private key
    pub key: Resource,
    /// Resource that supplied the public half when matched heuristically
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<Resource>,
    /// Certificates whose public key carries this fingerprint
    pub certificates: Vec<Resource>,
    /// How the pairing was made
    pub matched_by: MatchSource,
}

impl Identity {
    /// A resolved identity without certificates yet
    pub fn new(fingerprint: KeyFingerprint, key: Resource, matched_by: MatchSource) -> Self {
        Self {
            fingerprint,
            key,
            public_key: None,
            certificates: Vec::new(),
            matched_by,
        }
    }

    /// An unverified key-only identity emitted at drain time
    pub fn anonymous(fingerprint: KeyFingerprint, key: Resource) -> Self {
        Self::new(fingerprint, key, MatchSource::Unmatched)
    }

    /// Record the resource that supplied the public key.
    #[must_use]
    pub fn with_public_key(mut self, public_key: Option<Resource>) -> Self {
        self.public_key = public_key;
        self
    }

    /// True when no public counterpart was ever found
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self.matched_by, MatchSource::Unmatched)
    }

    /// Attach a certificate unless the same bytes are already attached.
    ///
    /// Returns true if the certificate was added.
    pub fn attach_certificate(&mut self, certificate: Resource) -> bool {
        if self
            .certificates
            .iter()
            .any(|c| c.payload == certificate.payload)
        {
            return false;
        }
        self.certificates.push(certificate);
        true
    }
}

/// Output of the identity resolver.
#[derive(Debug, Clone)]
pub enum ResolverEvent {
    /// A newly resolved identity, with every certificate known so far
    Identity(Identity),
    /// A certificate for an identity that was already emitted
    Certificate {
        /// Identity the certificate belongs to
        fingerprint: KeyFingerprint,
        /// The certificate
        certificate: Resource,
    },
}

/// Folds resolver events into one identity per fingerprint.
#[derive(Debug, Default, Clone)]
pub struct IdentitySet {
    identities: BTreeMap<KeyFingerprint, Identity>,
}

impl IdentitySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event.
    ///
    /// A certificate event for an unknown fingerprint is ignored; the
    /// resolver never produces one.
    pub fn apply(&mut self, event: ResolverEvent) {
        match event {
            ResolverEvent::Identity(identity) => {
                self.identities
                    .entry(identity.fingerprint.clone())
                    .or_insert(identity);
            }
            ResolverEvent::Certificate {
                fingerprint,
                certificate,
            } => {
                if let Some(identity) = self.identities.get_mut(&fingerprint) {
                    identity.attach_certificate(certificate);
                }
            }
        }
    }

    /// Look up an identity by fingerprint.
    #[must_use]
    pub fn get(&self, fingerprint: &KeyFingerprint) -> Option<&Identity> {
        self.identities.get(fingerprint)
    }

    /// Iterate identities in fingerprint order.
    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.identities.values()
    }

    /// Number of identities
    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// True if no identity was resolved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Consume the set, returning identities in fingerprint order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Identity> {
        self.identities.into_values().collect()
    }
}

impl Extend<ResolverEvent> for IdentitySet {
    fn extend<T: IntoIterator<Item = ResolverEvent>>(&mut self, iter: T) {
        for event in iter {
            self.apply(event);
        }
    }
}

impl FromIterator<ResolverEvent> for IdentitySet {
    fn from_iter<T: IntoIterator<Item = ResolverEvent>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
