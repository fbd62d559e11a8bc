//! Configuration structures for the key synchronization service.
//!
//! The server binary loads these from the environment; library consumers can
//! construct them directly. Validation happens at construction time so a
//! misconfigured process fails on startup rather than on the first tick.

use crate::Error;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Default refresh interval between snapshot rebuilds (seconds).
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 300;

/// Default object key under which the snapshot is published.
pub const DEFAULT_SNAPSHOT_OBJECT_KEY: &str = "authmap";

/// OAuth scopes required to read group membership and manage user key
/// attributes in the directory.
pub const DIRECTORY_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/admin.directory.user",
    "https://www.googleapis.com/auth/admin.directory.group.member.readonly",
];

/// Configuration for the directory service client.
#[derive(Debug, Clone, Validate)]
pub struct DirectoryConfig {
    /// Base URL of the directory admin API
    #[validate(url)]
    pub base_url: String,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300))]
    pub request_timeout_secs: u64,

    /// Maximum number of retry attempts
    #[validate(range(min = 0, max = 10))]
    pub max_retries: u32,
}

impl DirectoryConfig {
    /// Create a directory client configuration for the given base URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL is invalid.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            base_url: base_url.into(),
            request_timeout_secs: crate::client::DIRECTORY_DEFAULT_TIMEOUT,
            max_retries: crate::client::DEFAULT_MAX_RETRIES,
        };
        config.validate()?;
        Ok(config)
    }

    /// Set the request timeout in seconds.
    #[must_use]
    pub const fn with_timeout_secs(mut self, seconds: u64) -> Self {
        self.request_timeout_secs = seconds;
        self
    }

    /// Set the maximum retry attempts.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Returns the request timeout duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Credentials for the identity-provider OAuth flow used by the key
/// submission pages.
#[derive(Debug, Clone)]
pub struct OauthConfig {
    /// OAuth client identifier
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: SecretString,

    /// Callback URL registered with the provider
    pub callback_url: String,
}

impl OauthConfig {
    /// Create OAuth credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            callback_url: callback_url.into(),
        }
    }
}

/// Service-account credentials used for directory API access with an
/// impersonated admin subject.
#[derive(Debug, Clone)]
pub struct ServiceAccountConfig {
    /// Path to the service-account credential JSON file
    pub key_file: PathBuf,

    /// Admin email the service account impersonates
    pub subject: String,

    /// OAuth scopes requested for the access token
    pub scopes: Vec<String>,
}

impl ServiceAccountConfig {
    /// Create a service-account configuration with the default directory
    /// scopes.
    pub fn new(key_file: impl Into<PathBuf>, subject: impl Into<String>) -> Self {
        Self {
            key_file: key_file.into(),
            subject: subject.into(),
            scopes: DIRECTORY_SCOPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Override the requested scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }
}

/// Configuration for the synchronization engine.
#[derive(Debug, Clone, Validate)]
pub struct SyncConfig {
    /// Ordered list of group identifiers to resolve on each rebuild
    #[validate(length(min = 1))]
    pub groups: Vec<String>,

    /// Object-storage bucket the snapshot is published to
    #[validate(length(min = 1))]
    pub bucket: String,

    /// Object key the snapshot is published under (overwritten each rebuild)
    pub object_key: String,

    /// Interval between rebuilds in seconds
    #[validate(range(min = 1))]
    pub refresh_interval_secs: u64,
}

impl SyncConfig {
    /// Create a synchronization configuration for the given groups and
    /// bucket, with the default object key and refresh interval.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the group list is empty or the bucket
    /// name is blank.
    pub fn new(groups: Vec<String>, bucket: impl Into<String>) -> Result<Self, Error> {
        let config = Self {
            groups,
            bucket: bucket.into(),
            object_key: DEFAULT_SNAPSHOT_OBJECT_KEY.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the published object key.
    #[must_use]
    pub fn with_object_key(mut self, key: impl Into<String>) -> Self {
        self.object_key = key.into();
        self
    }

    /// Override the refresh interval in seconds.
    #[must_use]
    pub const fn with_refresh_interval_secs(mut self, seconds: u64) -> Self {
        self.refresh_interval_secs = seconds;
        self
    }

    /// Returns the refresh interval duration.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}
