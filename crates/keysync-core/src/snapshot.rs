//! Snapshot data model and the store holding the current snapshot.
//!
//! A [`Snapshot`] is the immutable result of one synchronization pass:
//! group names mapped to the SSH keys of their members. The
//! [`SnapshotStore`] holds exactly one current snapshot; readers get a
//! cheap handle to it while the synchronizer swaps in full replacements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

/// One group's resolved keys.
///
/// `keys` contains only non-empty key strings, in membership-list order;
/// duplicates are preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group identifier as configured
    pub name: String,
    /// Registered SSH keys of the group's members
    pub keys: Vec<String>,
}

impl GroupRecord {
    /// Create a record for the named group.
    #[must_use]
    pub fn new(name: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }
}

/// The immutable result of one synchronization pass.
///
/// A new `Snapshot` fully replaces the old one; no in-place mutation is
/// visible to readers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When this snapshot was installed (RFC 3339 on the wire)
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
    /// Resolved groups, in configured order
    pub groups: Vec<GroupRecord>,
}

impl Snapshot {
    /// Create a snapshot of the given groups stamped with the current time.
    #[must_use]
    pub fn now(groups: Vec<GroupRecord>) -> Self {
        Self {
            last_updated: Utc::now(),
            groups,
        }
    }

    /// The empty, unpopulated snapshot a process starts with.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            last_updated: DateTime::UNIX_EPOCH,
            groups: Vec::new(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Holds the current [`Snapshot`] under concurrent read access.
///
/// Many readers, one periodic writer. [`current`](Self::current) clones an
/// `Arc` under a shared read lock and never blocks on other readers;
/// [`replace`](Self::replace) swaps the `Arc` exclusively, so a reader
/// observes either the full pre-image or the full post-image, never a mix.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Create a store seeded with the empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Returns a handle to the current snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<Snapshot> {
        self.current.read().unwrap().clone()
    }

    /// Installs a new snapshot, discarding the old one once the last
    /// outstanding reader handle drops.
    pub fn replace(&self, snapshot: Snapshot) {
        *self.current.write().unwrap() = Arc::new(snapshot);
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
