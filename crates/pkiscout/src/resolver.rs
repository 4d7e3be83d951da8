//! Identity resolution: fold a stream of resources into identities.
//!
//! The resolver is a single-owner state machine. Each private key is either
//! pending (no public half known yet) or resolved (emitted, never revisited).
//! Matching rules, in order of strength:
//!
//! 1. an unencrypted private key derives its own public key;
//! 2. a public key whose `Linked-Key` attribute names the private key
//!    (by its declared `Key-Id` or its location-root);
//! 3. a public key sharing the private key's location-root
//!    (`/keys/c.pem` and `/keys/c.pub`).
//!
//! Certificates and requests also offer their embedded public key under
//! rules 2 and 3. Certificates are attached to the identity with the same
//! fingerprint whenever it resolves.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use futures_util::StreamExt;
use tracing::{debug, trace, warn};

use pkiscout_core::{
    strip_location, Identity, IdentitySet, KeyFingerprint, MatchSource, Resource, ResolverEvent,
    ResourceKind, Result, ScanOutcome,
};

use crate::cancel::Cancellation;
use crate::hash::{blob_fingerprint, fingerprint, sha256_bytes};
use crate::keys::{derive_public_key, public_key_der};
use crate::pipeline::{ResourceScan, ScanConfig, ScanPipeline};

/// Resolver behavior.
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Emit unmatched private keys as anonymous identities at drain
    pub emit_anonymous: bool,
    /// Log skipped resources at warn level instead of debug
    pub verbose: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            emit_anonymous: true,
            verbose: false,
        }
    }
}

impl ResolverOptions {
    /// Set anonymous emission
    #[must_use]
    pub const fn emit_anonymous(mut self, emit: bool) -> Self {
        self.emit_anonymous = emit;
        self
    }

    /// Set verbosity
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[derive(Debug)]
struct PendingKey {
    key: Resource,
    root: String,
    links: Vec<String>,
}

#[derive(Debug)]
struct PendingPublic {
    resource: Resource,
    fingerprint: KeyFingerprint,
}

/// Matches private keys with public keys and certificates.
#[derive(Debug, Default)]
pub struct IdentityResolver {
    options: ResolverOptions,
    /// Unmatched keys by arrival slot
    pending_keys: BTreeMap<u64, PendingKey>,
    next_slot: u64,
    /// Slots in arrival order. Keys waiting for a declared link are not
    /// indexed by root.
    keys_by_root: HashMap<String, Vec<u64>>,
    keys_by_link: HashMap<String, Vec<u64>>,
    public_by_root: HashMap<String, PendingPublic>,
    public_by_link: HashMap<String, PendingPublic>,
    pending_certs: HashMap<KeyFingerprint, Vec<Resource>>,
    /// Emitted fingerprints and the digests of certificates sent for each
    resolved: HashMap<KeyFingerprint, HashSet<String>>,
}

impl IdentityResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new(options: ResolverOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Drive a resolver from a running scan.
    #[must_use]
    pub fn run(scan: ResourceScan, options: ResolverOptions) -> IdentityStream {
        IdentityStream {
            cancel: scan.cancellation().clone(),
            scan: Some(scan),
            resolver: Some(Self::new(options)),
            queue: VecDeque::new(),
            outcome: None,
        }
    }

    /// Number of private keys still waiting for a public half
    #[must_use]
    pub fn pending_keys(&self) -> usize {
        self.pending_keys.len()
    }

    /// Number of identities emitted so far
    #[must_use]
    pub fn resolved(&self) -> usize {
        self.resolved.len()
    }

    /// Consume one resource, returning whatever it completed.
    pub fn push(&mut self, resource: Resource) -> Vec<ResolverEvent> {
        match resource.kind {
            ResourceKind::PrivateKey => self.offer_private(resource).into_iter().collect(),
            ResourceKind::PublicKey | ResourceKind::CertificateRequest => {
                match self.spki_of(&resource) {
                    Some(spki) => self.offer_public(resource, &spki).into_iter().collect(),
                    None => Vec::new(),
                }
            }
            ResourceKind::Certificate => match self.spki_of(&resource) {
                Some(spki) => self.offer_certificate(resource, &spki),
                None => Vec::new(),
            },
            ResourceKind::RevocationList | ResourceKind::Unknown => {
                trace!(location = %resource.location, kind = %resource.kind, "ignoring resource");
                Vec::new()
            }
        }
    }

    /// End of input: keys still waiting for a declared link take a leftover
    /// public key from their location-root. The rest become anonymous
    /// identities.
    ///
    /// Only call this once every producer has finished, otherwise a key
    /// whose match has not been read yet is reported as anonymous.
    #[must_use]
    pub fn drain(mut self) -> Vec<ResolverEvent> {
        debug!(
            pending_keys = self.pending_keys.len(),
            pending_public_keys = self.public_by_root.len() + self.public_by_link.len(),
            pending_certificates = self.pending_certs.values().map(Vec::len).sum::<usize>(),
            "draining resolver"
        );

        let mut events = Vec::new();
        let mut unmatched = Vec::new();
        for p in std::mem::take(&mut self.pending_keys).into_values() {
            match self.public_by_root.remove(&p.root) {
                Some(public) => events.extend(self.resolve(
                    public.fingerprint,
                    p.key,
                    MatchSource::LocationRoot,
                    Some(public.resource),
                )),
                None => unmatched.push(p),
            }
        }

        if !self.options.emit_anonymous {
            return events;
        }

        for p in unmatched {
            let fp = blob_fingerprint(&p.key.payload);
            if self.resolved.contains_key(&fp) {
                debug!(location = %p.key.location, fingerprint = %fp.short(), "duplicate key, dropped");
                continue;
            }
            self.resolved.insert(fp.clone(), HashSet::new());
            events.push(ResolverEvent::Identity(Identity::anonymous(fp, p.key)));
        }
        events
    }

    fn spki_of(&self, resource: &Resource) -> Option<Vec<u8>> {
        match public_key_der(resource) {
            Ok(spki) => Some(spki),
            Err(e) => {
                if self.options.verbose {
                    warn!(location = %resource.location, error = %e, "no public key, skipping");
                } else {
                    debug!(location = %resource.location, error = %e, "no public key, skipping");
                }
                None
            }
        }
    }

    fn offer_private(&mut self, key: Resource) -> Option<ResolverEvent> {
        if !key.is_encrypted() {
            match derive_public_key(&key.tag, &key.payload) {
                Ok(derived) => {
                    return self.resolve(fingerprint(&derived.spki), key, MatchSource::Derived, None);
                }
                Err(e) => {
                    debug!(location = %key.location, error = %e, "cannot derive public key, treating as opaque");
                }
            }
        }

        let root = key.location.root();
        let declared = key.declared_key_id().map(strip_location);
        let waits_for_link = declared.as_ref().is_some_and(|id| *id != root);
        let mut links = Vec::with_capacity(2);
        links.extend(declared);
        if !links.contains(&root) {
            links.push(root.clone());
        }

        for link in &links {
            if let Some(public) = self.public_by_link.remove(link) {
                return self.resolve(
                    public.fingerprint,
                    key,
                    MatchSource::LinkedKey,
                    Some(public.resource),
                );
            }
        }
        if !waits_for_link {
            if let Some(public) = self.public_by_root.remove(&root) {
                return self.resolve(
                    public.fingerprint,
                    key,
                    MatchSource::LocationRoot,
                    Some(public.resource),
                );
            }
        }

        let slot = self.next_slot;
        self.next_slot += 1;
        if !waits_for_link {
            self.keys_by_root.entry(root.clone()).or_default().push(slot);
        }
        for link in &links {
            self.keys_by_link.entry(link.clone()).or_default().push(slot);
        }
        trace!(location = %key.location, slot, waits_for_link, "private key pending");
        self.pending_keys.insert(slot, PendingKey { key, root, links });
        None
    }

    fn offer_public(&mut self, resource: Resource, spki: &[u8]) -> Option<ResolverEvent> {
        let fingerprint = fingerprint(spki);

        if let Some(link) = resource.linked_key().map(strip_location) {
            if let Some(pending) = self.take_key(oldest(&self.keys_by_link, &link)) {
                return self.resolve(fingerprint, pending.key, MatchSource::LinkedKey, Some(resource));
            }
            Self::register_public(&mut self.public_by_link, link, resource, fingerprint);
            return None;
        }

        let root = resource.location.root();
        if let Some(pending) = self.take_key(oldest(&self.keys_by_root, &root)) {
            return self.resolve(fingerprint, pending.key, MatchSource::LocationRoot, Some(resource));
        }
        Self::register_public(&mut self.public_by_root, root, resource, fingerprint);
        None
    }

    fn offer_certificate(&mut self, certificate: Resource, spki: &[u8]) -> Vec<ResolverEvent> {
        let fp = fingerprint(spki);
        let mut events = Vec::new();

        if let Some(sent) = self.resolved.get_mut(&fp) {
            if sent.insert(sha256_bytes(&certificate.payload)) {
                events.push(ResolverEvent::Certificate {
                    fingerprint: fp,
                    certificate: certificate.clone(),
                });
            }
        } else {
            let pending = self.pending_certs.entry(fp).or_default();
            if !pending.iter().any(|c| c.payload == certificate.payload) {
                pending.push(certificate.clone());
            }
        }

        events.extend(self.offer_public(certificate, spki));
        events
    }

    fn register_public(
        index: &mut HashMap<String, PendingPublic>,
        id: String,
        resource: Resource,
        fingerprint: KeyFingerprint,
    ) {
        match index.get(&id) {
            Some(first) => {
                debug!(
                    location = %resource.location,
                    kept = %first.resource.location,
                    "public key already pending for this key, ignored"
                );
            }
            None => {
                trace!(location = %resource.location, id = %id, "public key pending");
                index.insert(
                    id,
                    PendingPublic {
                        resource,
                        fingerprint,
                    },
                );
            }
        }
    }

    fn take_key(&mut self, slot: Option<u64>) -> Option<PendingKey> {
        let slot = slot?;
        let pending = self.pending_keys.remove(&slot)?;
        unindex(&mut self.keys_by_root, &pending.root, slot);
        for link in &pending.links {
            unindex(&mut self.keys_by_link, link, slot);
        }
        Some(pending)
    }

    fn resolve(
        &mut self,
        fingerprint: KeyFingerprint,
        key: Resource,
        matched_by: MatchSource,
        public_key: Option<Resource>,
    ) -> Option<ResolverEvent> {
        if self.resolved.contains_key(&fingerprint) {
            debug!(location = %key.location, fingerprint = %fingerprint.short(), "duplicate key, dropped");
            return None;
        }

        let mut identity =
            Identity::new(fingerprint.clone(), key, matched_by).with_public_key(public_key);
        let mut sent = HashSet::new();
        for certificate in self.pending_certs.remove(&fingerprint).unwrap_or_default() {
            sent.insert(sha256_bytes(&certificate.payload));
            identity.attach_certificate(certificate);
        }
        self.resolved.insert(fingerprint, sent);

        debug!(
            location = %identity.key.location,
            fingerprint = %identity.fingerprint.short(),
            matched_by = ?identity.matched_by,
            certificates = identity.certificates.len(),
            "identity resolved"
        );
        Some(ResolverEvent::Identity(identity))
    }
}

/// Oldest pending slot filed under `id`
fn oldest(index: &HashMap<String, Vec<u64>>, id: &str) -> Option<u64> {
    index.get(id)?.first().copied()
}

fn unindex(index: &mut HashMap<String, Vec<u64>>, id: &str, slot: u64) {
    if let Some(slots) = index.get_mut(id) {
        slots.retain(|&s| s != slot);
        if slots.is_empty() {
            index.remove(id);
        }
    }
}

/// Resolver events produced from a running scan, on the consumer side.
#[derive(Debug)]
pub struct IdentityStream {
    scan: Option<ResourceScan>,
    resolver: Option<IdentityResolver>,
    queue: VecDeque<ResolverEvent>,
    cancel: Cancellation,
    outcome: Option<ScanOutcome>,
}

impl IdentityStream {
    /// Next event, or `None` once the scan ended (or was cancelled).
    ///
    /// Anonymous identities are only emitted when the scan completed.
    pub async fn next(&mut self) -> Option<ResolverEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            let scan = self.scan.as_mut()?;

            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => Err(()),
                resource = scan.next() => Ok(resource),
            };

            match next {
                Ok(Some(resource)) => {
                    if let Some(resolver) = self.resolver.as_mut() {
                        self.queue.extend(resolver.push(resource));
                    }
                }
                Ok(None) => self.finish_scan(false).await,
                Err(()) => self.finish_scan(true).await,
            }
        }
    }

    /// How the scan ended, once `next` has returned `None`
    #[must_use]
    pub const fn outcome(&self) -> Option<ScanOutcome> {
        self.outcome
    }

    /// Stop the underlying scan.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Fold every event into an [`IdentitySet`].
    pub async fn collect(mut self) -> Resolution {
        let mut identities = IdentitySet::new();
        while let Some(event) = self.next().await {
            identities.apply(event);
        }
        Resolution {
            identities,
            outcome: self.outcome.unwrap_or(ScanOutcome::Cancelled),
        }
    }

    async fn finish_scan(&mut self, cancelled: bool) {
        let Some(scan) = self.scan.take() else {
            return;
        };
        let outcome = match scan.finish().await {
            Ok(_) if cancelled => ScanOutcome::Cancelled,
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "scan did not finish cleanly");
                ScanOutcome::Cancelled
            }
        };

        let resolver = self.resolver.take();
        if outcome.is_complete() {
            if let Some(resolver) = resolver {
                self.queue.extend(resolver.drain());
            }
        } else {
            debug!("scan cancelled, partial matches dropped");
        }
        self.outcome = Some(outcome);
    }
}

/// Everything a scan resolved.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// One identity per fingerprint
    pub identities: IdentitySet,
    /// Whether the scan ran to completion
    pub outcome: ScanOutcome,
}

/// Scan `roots` and resolve every identity found.
///
/// # Errors
///
/// `ScanError::NoRoots` if none of `roots` exists. Cancellation is not an
/// error: the partial result carries `ScanOutcome::Cancelled`.
pub async fn resolve_identities(
    cancel: &Cancellation,
    roots: &[PathBuf],
    config: ScanConfig,
    options: ResolverOptions,
) -> Result<Resolution> {
    let scan = ScanPipeline::new(config).scan(cancel, roots)?;
    Ok(IdentityResolver::run(scan, options).collect().await)
}
