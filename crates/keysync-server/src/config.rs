use anyhow::{Context, Result};
use keysync_core::config::{OauthConfig, ServiceAccountConfig, SyncConfig};
use secrecy::SecretString;
use std::net::SocketAddr;

const DEFAULT_DIRECTORY_URL: &str = "https://www.googleapis.com/admin/directory/v1";

/// Server configuration, assembled from `SKM_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_address: SocketAddr,

    /// Base URL of the directory admin API
    pub directory_base_url: String,

    /// Credentials for the browser-facing OAuth flow
    pub oauth: OauthConfig,

    /// Service-account credentials for directory access
    pub service_account: ServiceAccountConfig,

    /// Groups, bucket, and refresh interval for the synchronizer
    pub sync: SyncConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let bind_address = std::env::var("SKM_BIND_ADDRESS")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .context("SKM_BIND_ADDRESS is not a valid socket address")?;

        let directory_base_url = std::env::var("SKM_DIRECTORY_URL")
            .unwrap_or_else(|_| DEFAULT_DIRECTORY_URL.to_string());

        let oauth = OauthConfig::new(
            required("SKM_CLIENT_ID")?,
            SecretString::from(required("SKM_CLIENT_SECRET")?),
            required("SKM_CALLBACK_URL")?,
        );

        let service_account =
            ServiceAccountConfig::new(required("SKM_SA_KEY_LOC")?, required("SKM_SUBJECT")?);

        let groups = parse_groups(&required("SKM_GROUPS")?);
        let mut sync = SyncConfig::new(groups, required("SKM_AWS_BUCKET")?)
            .context("invalid synchronization configuration")?;

        if let Ok(key) = std::env::var("SKM_OBJECT_KEY") {
            sync = sync.with_object_key(key);
        }
        if let Ok(interval) = std::env::var("SKM_REFRESH_INTERVAL_SECS") {
            let seconds: u64 = interval
                .parse()
                .context("SKM_REFRESH_INTERVAL_SECS is not a valid number of seconds")?;
            sync = sync.with_refresh_interval_secs(seconds);
        }

        Ok(Config {
            bind_address,
            directory_base_url,
            oauth,
            service_account,
            sync,
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} environment variable required"))
}

fn parse_groups(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_groups_splits_and_trims() {
        assert_eq!(
            parse_groups("infra, oncall ,release"),
            vec!["infra", "oncall", "release"]
        );
    }

    #[test]
    fn parse_groups_drops_empty_entries() {
        assert_eq!(parse_groups("infra,,  ,oncall"), vec!["infra", "oncall"]);
        assert!(parse_groups("").is_empty());
    }
}
