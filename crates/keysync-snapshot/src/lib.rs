//! Snapshot construction and the periodic synchronization loop.
//!
//! A snapshot maps each configured group to the SSH keys of its members.
//! [`SnapshotBuilder`] resolves one from the directory all-or-nothing,
//! [`SnapshotPublisher`] persists it to object storage, and
//! [`Synchronizer`] drives both on a fixed interval until cancelled.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod builder;
pub mod publisher;
pub mod synchronizer;

pub use builder::SnapshotBuilder;
pub use publisher::{S3Publisher, SnapshotPublisher};
pub use synchronizer::Synchronizer;

/// Result type used throughout this crate.
pub type Result<T> = keysync_core::Result<T>;
