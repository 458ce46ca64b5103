//! Foundation types for the decoy shell.
//!
//! Shared by every crate in the workspace: the error type returned across
//! the filesystem and dispatch layers, and the honeypot configuration.

pub mod config;
pub mod error;
