//! Periodic snapshot refresh loop.

use crate::builder::SnapshotBuilder;
use crate::publisher::SnapshotPublisher;
use crate::Result;
use keysync_core::SnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drives snapshot rebuilds on a fixed interval.
///
/// Each tick rebuilds the snapshot, installs it in the store, and then
/// publishes it. A failed build leaves the previous snapshot in place; a
/// failed publish is logged and retried implicitly on the next tick, since
/// the in-memory snapshot already serves reads.
pub struct Synchronizer {
    builder: SnapshotBuilder,
    publisher: Arc<dyn SnapshotPublisher>,
    store: Arc<SnapshotStore>,
    refresh_interval: Duration,
}

impl Synchronizer {
    /// Create a synchronizer refreshing every `refresh_interval`.
    #[must_use]
    pub fn new(
        builder: SnapshotBuilder,
        publisher: Arc<dyn SnapshotPublisher>,
        store: Arc<SnapshotStore>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            builder,
            publisher,
            store,
            refresh_interval,
        }
    }

    /// Rebuild, install, and publish one snapshot.
    ///
    /// # Errors
    ///
    /// Returns the build error if resolution fails; the store is left
    /// untouched in that case. Publish failures are logged, not returned,
    /// because the refreshed snapshot is already live in memory.
    pub async fn run_once(&self) -> Result<()> {
        let snapshot = self.builder.build().await?;
        let groups = snapshot.groups.len();
        self.store.replace(snapshot.clone());
        info!(groups, "installed refreshed snapshot");

        if let Err(err) = self.publisher.publish(&snapshot).await {
            warn!(error = %err, "snapshot publication failed");
        }
        Ok(())
    }

    /// Run the refresh loop until `cancel` is triggered.
    ///
    /// The first refresh happens immediately; subsequent refreshes follow
    /// the configured interval.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.refresh_interval.as_secs(),
            "starting synchronization loop"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("synchronization loop stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.run_once().await {
                        warn!(error = %err, "snapshot refresh failed, keeping previous snapshot");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keysync_core::{Error, Snapshot};
    use keysync_directory::{Directory, KeyAttribute, Member};
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        pub Dir {}

        #[async_trait]
        impl Directory for Dir {
            async fn list_group_members(&self, group: &str) -> Result<Vec<Member>>;
            async fn get_user_key_attribute(&self, email: &str) -> Result<KeyAttribute>;
            async fn set_user_key_attribute(&self, email: &str, key: &str) -> Result<String>;
        }
    }

    struct RecordingPublisher {
        published: AtomicUsize,
        fail: bool,
    }

    impl RecordingPublisher {
        fn new(fail: bool) -> Self {
            Self {
                published: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl SnapshotPublisher for RecordingPublisher {
        async fn publish(&self, _snapshot: &Snapshot) -> Result<()> {
            self.published.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(Error::Publish("bucket offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn healthy_directory() -> MockDir {
        let mut dir = MockDir::new();
        dir.expect_list_group_members()
            .returning(|_| Ok(vec![Member::new("member1@example.com")]));
        dir.expect_get_user_key_attribute().returning(|_| {
            Ok(KeyAttribute {
                ssh: "key-one".to_string(),
            })
        });
        dir
    }

    #[tokio::test]
    async fn run_once_installs_and_publishes() {
        let builder = SnapshotBuilder::new(
            Arc::new(healthy_directory()),
            vec!["ingroup1".to_string()],
        );
        let publisher = Arc::new(RecordingPublisher::new(false));
        let store = Arc::new(SnapshotStore::new());
        let sync = Synchronizer::new(
            builder,
            publisher.clone(),
            store.clone(),
            Duration::from_secs(300),
        );

        sync.run_once().await.unwrap();

        assert_eq!(store.current().groups.len(), 1);
        assert_eq!(publisher.published.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_build_leaves_previous_snapshot() {
        let mut dir = MockDir::new();
        dir.expect_list_group_members().returning(|_| {
            Err(Error::UpstreamStatus {
                status: 500,
                body: "boom".to_string(),
            })
        });

        let builder = SnapshotBuilder::new(Arc::new(dir), vec!["ingroup1".to_string()]);
        let publisher = Arc::new(RecordingPublisher::new(false));
        let store = Arc::new(SnapshotStore::new());
        let previous = Snapshot::now(vec![]);
        store.replace(previous.clone());

        let sync = Synchronizer::new(
            builder,
            publisher.clone(),
            store.clone(),
            Duration::from_secs(300),
        );

        sync.run_once().await.unwrap_err();

        assert_eq!(*store.current(), previous);
        assert_eq!(publisher.published.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_tick_then_successful_tick_installs() {
        let mut dir = MockDir::new();
        let mut seq = mockall::Sequence::new();
        dir.expect_list_group_members()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(Error::UpstreamStatus {
                    status: 500,
                    body: "boom".to_string(),
                })
            });
        dir.expect_list_group_members()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![Member::new("member1@example.com")]));
        dir.expect_get_user_key_attribute().returning(|_| {
            Ok(KeyAttribute {
                ssh: "key-one".to_string(),
            })
        });

        let builder = SnapshotBuilder::new(Arc::new(dir), vec!["ingroup1".to_string()]);
        let publisher = Arc::new(RecordingPublisher::new(false));
        let store = Arc::new(SnapshotStore::new());
        let sync = Synchronizer::new(
            builder,
            publisher,
            store.clone(),
            Duration::from_secs(300),
        );

        sync.run_once().await.unwrap_err();
        assert!(store.current().groups.is_empty());

        sync.run_once().await.unwrap();
        assert_eq!(store.current().groups[0].keys, vec!["key-one"]);
    }

    #[tokio::test]
    async fn failed_publish_still_installs_snapshot() {
        let builder = SnapshotBuilder::new(
            Arc::new(healthy_directory()),
            vec!["ingroup1".to_string()],
        );
        let publisher = Arc::new(RecordingPublisher::new(true));
        let store = Arc::new(SnapshotStore::new());
        let sync = Synchronizer::new(
            builder,
            publisher.clone(),
            store.clone(),
            Duration::from_secs(300),
        );

        sync.run_once().await.unwrap();

        assert_eq!(store.current().groups.len(), 1);
        assert_eq!(publisher.published.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_refreshes_immediately_and_stops_on_cancel() {
        let builder = SnapshotBuilder::new(
            Arc::new(healthy_directory()),
            vec!["ingroup1".to_string()],
        );
        let publisher = Arc::new(RecordingPublisher::new(false));
        let store = Arc::new(SnapshotStore::new());
        let sync = Synchronizer::new(
            builder,
            publisher.clone(),
            store.clone(),
            Duration::from_secs(300),
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(sync.run(cancel.clone()));

        // First tick fires immediately.
        tokio::time::timeout(Duration::from_secs(1), async {
            while store.current().groups.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
