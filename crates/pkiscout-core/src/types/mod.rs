//! Core types for resource discovery and identity resolution.

pub mod identity;
pub mod location;
pub mod resource;

pub use identity::{Identity, IdentitySet, KeyFingerprint, MatchSource, ResolverEvent};
pub use location::{strip_location, Location};
pub use resource::{
    Resource, ResourceKind, ScanOutcome, KEY_ID_ATTR, LINKED_KEY_ATTR, PROC_TYPE_ATTR,
};
