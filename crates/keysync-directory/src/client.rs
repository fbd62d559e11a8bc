//! Asynchronous directory client implementation.

use crate::auth::TokenSource;
use crate::models::{DirectoryUser, KeyAttribute, Member, MemberList, UpdateUserRequest};
use crate::Result;
use async_trait::async_trait;
use keysync_core::client::{HttpConfig, RetryPolicy};
use keysync_core::config::DirectoryConfig;
use keysync_core::Error;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("keysync-directory/", env!("CARGO_PKG_VERSION"));

/// Read and write operations the synchronization engine needs from the
/// directory service.
///
/// [`DirectoryClient`] is the production implementation; tests mock this
/// trait to drive the snapshot builder without a network.
#[async_trait]
pub trait Directory: Send + Sync {
    /// List the members of a group, in membership-list order.
    async fn list_group_members(&self, group: &str) -> Result<Vec<Member>>;

    /// Fetch a user's SSH-key attribute. A user with no key registered
    /// yields an attribute with an empty `ssh` value.
    async fn get_user_key_attribute(&self, email: &str) -> Result<KeyAttribute>;

    /// Set a user's SSH-key attribute and verify the upstream echoed it.
    /// Returns the confirmed key value.
    async fn set_user_key_attribute(&self, email: &str, key: &str) -> Result<String>;
}

/// Builder for [`DirectoryClient`].
#[derive(Clone)]
pub struct DirectoryClientBuilder {
    config: DirectoryConfig,
    http_config: HttpConfig,
    token_source: Arc<dyn TokenSource>,
}

impl DirectoryClientBuilder {
    /// Create a builder from a configuration and token source.
    #[must_use]
    pub fn new(config: DirectoryConfig, token_source: Arc<dyn TokenSource>) -> Self {
        let http_config = HttpConfig::new()
            .with_timeout(config.timeout())
            .with_retry_policy(RetryPolicy::new().with_max_retries(config.max_retries));

        Self {
            config,
            http_config,
            token_source,
        }
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, http_config: HttpConfig) -> Self {
        self.http_config = http_config;
        self
    }

    /// Finalise the builder and create the [`DirectoryClient`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is invalid or the HTTP
    /// client cannot be constructed.
    pub fn build(self) -> Result<DirectoryClient> {
        let mut base_url = Url::parse(&self.config.base_url)?;
        // Url::join drops the last path segment without this.
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let http = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(self.http_config.timeout)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|err| Error::Config(format!("failed to build directory HTTP client: {err}")))?;

        Ok(DirectoryClient {
            http,
            base_url,
            retry_policy: self.http_config.retry_policy,
            token_source: self.token_source,
        })
    }
}

/// Asynchronous client for the directory admin API.
#[derive(Clone)]
pub struct DirectoryClient {
    http: Client,
    base_url: Url,
    retry_policy: RetryPolicy,
    token_source: Arc<dyn TokenSource>,
}

impl DirectoryClient {
    /// Construct a client directly from a configuration and token source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on an invalid base URL.
    pub fn new(config: DirectoryConfig, token_source: Arc<dyn TokenSource>) -> Result<Self> {
        DirectoryClientBuilder::new(config, token_source).build()
    }

    /// Return the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|err| Error::Config(format!("invalid directory path `{path}`: {err}")))
    }

    // GETs are idempotent and retried per the policy; writes go out once.
    async fn get_json<T>(&self, path: &str, params: &[(&'static str, &'static str)]) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        let mut last_error: Option<Error> = None;

        loop {
            let url = self.build_url(path)?;
            let token = self.token_source.access_token().await?;
            let request = self
                .http
                .get(url)
                .query(params)
                .bearer_auth(token)
                .header("Accept", "application/json");

            debug!(path = %path, attempt, "sending directory request");

            match request.send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response.json::<T>().await.map_err(|err| {
                            Error::Decode(format!(
                                "failed to parse directory response for `{path}`: {err}"
                            ))
                        });
                    }

                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unknown error".to_string());
                    let error = Error::UpstreamStatus {
                        status: status.as_u16(),
                        body,
                    };

                    if !retryable_status(status) {
                        return Err(error);
                    }
                    last_error = Some(error);
                }
                Err(err) => {
                    let error = Error::from(err);
                    if matches!(error, Error::Timeout(_) | Error::Transport(_)) {
                        last_error = Some(error);
                    } else {
                        return Err(error);
                    }
                }
            }

            attempt += 1;
            if attempt > self.retry_policy.max_retries {
                break;
            }

            let delay = self.retry_policy.delay_for_attempt(attempt);
            if delay > Duration::from_millis(0) {
                debug!("retrying directory request after {:?}", delay);
                sleep(delay).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Transport("directory request failed after retries".to_string())
        }))
    }
}

fn retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn list_group_members(&self, group: &str) -> Result<Vec<Member>> {
        let path = format!("groups/{group}/members");
        let list: MemberList = self.get_json(&path, &[]).await?;
        Ok(list.members)
    }

    async fn get_user_key_attribute(&self, email: &str) -> Result<KeyAttribute> {
        let path = format!("users/{email}");
        let user: DirectoryUser = self
            .get_json(&path, &[("customFieldMask", "keys"), ("projection", "custom")])
            .await?;
        Ok(user.custom_schemas.keys)
    }

    async fn set_user_key_attribute(&self, email: &str, key: &str) -> Result<String> {
        let url = self.build_url(&format!("users/{email}"))?;
        let token = self.token_source.access_token().await?;
        let body = UpdateUserRequest::with_ssh_key(key);

        // Transport error first, then status, then the echoed value. The
        // upstream has been seen returning 200 without durably applying the
        // change, so a successful status alone is not enough.
        let response = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(email, status = status.as_u16(), "directory update rejected");
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        if !text.contains(key) {
            return Err(Error::WriteVerification(format!(
                "update for {email} returned {status} but did not echo the submitted key"
            )));
        }

        Ok(key.to_string())
    }
}
