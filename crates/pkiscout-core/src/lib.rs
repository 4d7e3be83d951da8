//! # pkiscout-core
//!
//! Core types and error definitions shared by the pkiscout engine and CLI.
//!
//! This crate provides:
//! - The resource model: [`Resource`], [`ResourceKind`], [`Location`]
//! - Identity records produced by resolution: [`Identity`], [`ResolverEvent`]
//! - The error taxonomy: [`ScanError`]

pub mod error;
pub mod types;

pub use error::{Result, ScanError};
pub use types::*;
