//! All-or-nothing snapshot construction from the directory.

use crate::Result;
use keysync_core::{GroupRecord, Snapshot};
use keysync_directory::Directory;
use std::sync::Arc;
use tracing::debug;

/// Resolves the configured groups into a [`Snapshot`].
///
/// Resolution is sequential and all-or-nothing: any directory error aborts
/// the whole build so a partially resolved snapshot is never observed.
pub struct SnapshotBuilder {
    directory: Arc<dyn Directory>,
    groups: Vec<String>,
}

impl SnapshotBuilder {
    /// Create a builder resolving `groups`, in order, through `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>, groups: Vec<String>) -> Self {
        Self { directory, groups }
    }

    /// The groups this builder resolves.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Resolve every group and stamp the result with the current time.
    ///
    /// Group order matches the configured list and key order matches the
    /// membership list. Members without a registered key are omitted;
    /// a group with no keyed members still appears, with an empty key list.
    ///
    /// # Errors
    ///
    /// Returns the first directory error encountered. No partial snapshot
    /// is ever returned.
    pub async fn build(&self) -> Result<Snapshot> {
        let mut records = Vec::with_capacity(self.groups.len());

        for group in &self.groups {
            let members = self.directory.list_group_members(group).await?;
            let mut keys = Vec::with_capacity(members.len());

            for member in &members {
                let attribute = self.directory.get_user_key_attribute(&member.email).await?;
                if attribute.is_set() {
                    keys.push(attribute.ssh);
                }
            }

            debug!(group, members = members.len(), keys = keys.len(), "resolved group");
            records.push(GroupRecord::new(group.clone(), keys));
        }

        Ok(Snapshot::now(records))
    }
}
