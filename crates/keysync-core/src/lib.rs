//! # keysync-core
//!
//! Core types and utilities for the SSH key synchronization service.
//!
//! This crate provides the error type shared across the workspace, HTTP
//! client utilities, configuration structures, and the snapshot data model
//! together with the store that holds the current snapshot under concurrent
//! read access.
//!
//! ## Modules
//!
//! - [`error`] - Error types and upstream status mapping
//! - [`client`] - HTTP client configuration and retry policies
//! - [`config`] - Configuration structures for the service
//! - [`snapshot`] - Snapshot model and the atomically replaceable store

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod snapshot;

// Re-export commonly used types
pub use error::{Error, Result};
pub use snapshot::{GroupRecord, Snapshot, SnapshotStore};
