//! # pkiscout-cli
//!
//! Command-line front end for the pkiscout discovery engine.
//!
//! ## Commands
//!
//! - **scan**: every key, certificate, request and CRL under the roots
//! - **list**: identities (private key + public key + certificates)
//! - **find**: first file whose name ends with a given suffix
//! - **config**: show the configuration file in use
//!
//! Roots come from the command line, then `PKISCOUT_PATH`, then the
//! configuration file. Output is a pretty table or JSON.

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
