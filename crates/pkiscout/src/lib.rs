//! # pkiscout
//!
//! Find the keys, certificates and requests scattered over a file system
//! and work out which of them belong together.
//!
//! A private key is matched to its public half, and the certificates issued
//! for that public key are attached to it. The result is an
//! [`Identity`](pkiscout_core::Identity) per key fingerprint. Keys that
//! cannot be matched (typically encrypted keys with no public key nearby)
//! are still reported, as anonymous identities.
//!
//! ## Data Flow
//!
//! ```text
//! PathWalker          walkdir over each root, lazily, absolute paths
//!   -> ScanPipeline   bounded reader tasks, one shared output channel
//!      -> ResourceReader + FormatRegistry
//!                     extension -> decoder -> tagged DER blocks -> Resource
//!   -> IdentityResolver
//!                     single consumer, no locks: Resource -> ResolverEvent
//!   -> IdentitySet    one Identity per fingerprint
//! ```
//!
//! [`locate`] reuses the walker to race several roots for one file name.
//!
//! ## Example
//!
//! ```no_run
//! use pkiscout::{resolve_identities, Cancellation, ResolverOptions, ScanConfig, WalkOptions};
//! use std::path::PathBuf;
//!
//! # async fn demo() -> pkiscout_core::Result<()> {
//! let cancel = Cancellation::new();
//! let roots = vec![PathBuf::from("/etc/ssl")];
//! let config = ScanConfig::default().walk(WalkOptions::default().recursive(true));
//! let resolution = resolve_identities(
//!     &cancel,
//!     &roots,
//!     config,
//!     ResolverOptions::default(),
//! )
//! .await?;
//!
//! for identity in resolution.identities.iter() {
//!     println!("{} {}", identity.fingerprint.short(), identity.key.location);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod certs;
pub mod format;
pub mod hash;
pub mod keys;
pub mod locator;
pub mod pipeline;
pub mod reader;
pub mod resolver;
pub mod walker;

#[cfg(test)]
mod testutil;

pub use cancel::Cancellation;
pub use certs::{summarize, CertificateSummary};
pub use format::{Block, DecodeError, Decoder, FormatRegistry};
pub use keys::{algorithm_of, public_key_der, KeyAlgorithm};
pub use locator::locate;
pub use pipeline::{ResourceScan, ScanConfig, ScanPipeline, DEFAULT_WORKERS};
pub use reader::ResourceReader;
pub use resolver::{resolve_identities, IdentityResolver, IdentityStream, Resolution, ResolverOptions};
pub use walker::{PathWalker, WalkOptions};
