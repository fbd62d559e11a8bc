//! Durable snapshot publication to object storage.

use crate::Result;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use keysync_core::{Error, Snapshot};
use tracing::debug;

/// Sink for finished snapshots.
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    /// Persist a snapshot. The destination is overwritten in place.
    async fn publish(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Publishes snapshots to a fixed object in an S3 bucket.
pub struct S3Publisher {
    client: Client,
    bucket: String,
    object_key: String,
}

impl S3Publisher {
    /// Create a publisher writing to `bucket` under `object_key`.
    #[must_use]
    pub fn new(client: Client, bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            object_key: object_key.into(),
        }
    }

    /// Create a publisher using credentials and region from the ambient
    /// environment.
    pub async fn from_env(bucket: impl Into<String>, object_key: impl Into<String>) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), bucket, object_key)
    }
}

#[async_trait]
impl SnapshotPublisher for S3Publisher {
    async fn publish(&self, snapshot: &Snapshot) -> Result<()> {
        let body = serde_json::to_vec(snapshot)
            .map_err(|err| Error::Publish(format!("failed to serialize snapshot: {err}")))?;
        let content_type = content_type_for(&body);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.object_key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|err| {
                Error::Publish(format!(
                    "failed to write s3://{}/{}: {err}",
                    self.bucket, self.object_key
                ))
            })?;

        debug!(bucket = %self.bucket, key = %self.object_key, "published snapshot");
        Ok(())
    }
}

// The destination key carries no extension, so the type is sniffed from the
// payload rather than the name.
fn content_type_for(body: &[u8]) -> &'static str {
    match body.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{' | b'[') => "application/json; charset=utf-8",
        _ => "text/plain; charset=utf-8",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_payload_gets_json_content_type() {
        assert_eq!(
            content_type_for(br#"{"groups":[]}"#),
            "application/json; charset=utf-8"
        );
        assert_eq!(content_type_for(b"  [1,2]"), "application/json; charset=utf-8");
    }

    #[test]
    fn other_payloads_fall_back_to_text() {
        assert_eq!(content_type_for(b"hello"), "text/plain; charset=utf-8");
        assert_eq!(content_type_for(b""), "text/plain; charset=utf-8");
    }

    #[test]
    fn serialized_snapshot_is_json_typed() {
        let body = serde_json::to_vec(&Snapshot::empty()).unwrap();
        assert_eq!(content_type_for(&body), "application/json; charset=utf-8");
    }
}
