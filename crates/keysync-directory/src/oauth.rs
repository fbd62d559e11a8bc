//! OAuth authorization-code flow for the key submission form.

use crate::Result;
use keysync_core::client::OAUTH_DEFAULT_TIMEOUT;
use keysync_core::config::OauthConfig;
use keysync_core::Error;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v3/token";
const DEFAULT_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v1/userinfo";
const OAUTH_SCOPES: &str = "openid email profile";

/// Tokens returned by the authorization-code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Short-lived access token used for userinfo lookups.
    pub access_token: String,
    /// Refresh token, present on first consent with offline access.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// OpenID Connect identity token.
    #[serde(default)]
    pub id_token: Option<String>,
}

#[derive(Deserialize)]
struct UserInfo {
    email: String,
}

/// Client for the browser-facing OAuth flow.
pub struct OauthClient {
    config: OauthConfig,
    authorize_url: String,
    token_url: String,
    userinfo_url: String,
    http: Client,
}

impl OauthClient {
    /// Create a client against the default endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be constructed.
    pub fn new(config: OauthConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(OAUTH_DEFAULT_TIMEOUT))
            .build()
            .map_err(|err| Error::Config(format!("failed to build OAuth HTTP client: {err}")))?;

        Ok(Self {
            config,
            authorize_url: DEFAULT_AUTHORIZE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            userinfo_url: DEFAULT_USERINFO_URL.to_string(),
            http,
        })
    }

    /// Point all three endpoints at `base`. Test use only.
    #[must_use]
    pub fn with_endpoint_base(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.authorize_url = format!("{base}/o/oauth2/auth");
        self.token_url = format!("{base}/oauth2/v3/token");
        self.userinfo_url = format!("{base}/oauth2/v1/userinfo");
        self
    }

    /// Build the authorization URL a visitor is redirected to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configured authorize endpoint is
    /// not a valid URL.
    pub fn authorize_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.authorize_url)?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", &self.config.callback_url)
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", OAUTH_SCOPES)
            .append_pair("approval_prompt", "force")
            .append_pair("access_type", "offline");
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamStatus`] if the token endpoint rejects the
    /// code, and transport or decode errors for request failures.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        debug!("exchanging authorization code");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", &self.config.client_id),
                ("client_secret", self.config.client_secret.expose_secret()),
                ("redirect_uri", &self.config.callback_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|err| Error::Decode(format!("failed to parse token response: {err}")))
    }

    /// Resolve the authenticated visitor's email address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamStatus`] on a rejected token and decode
    /// errors on a malformed userinfo document.
    pub async fn fetch_user_email(&self, access_token: &str) -> Result<String> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .query(&[("alt", "json"), ("access_token", access_token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(Error::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let info: UserInfo = response
            .json()
            .await
            .map_err(|err| Error::Decode(format!("failed to parse userinfo: {err}")))?;
        Ok(info.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> OauthConfig {
        OauthConfig {
            client_id: "client-123".to_string(),
            client_secret: SecretString::from("hunter2".to_string()),
            callback_url: "https://keys.example.com/callback".to_string(),
        }
    }

    #[test]
    fn authorize_url_carries_flow_parameters() {
        let client = OauthClient::new(test_config()).unwrap();
        let url = Url::parse(&client.authorize_url().unwrap()).unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "client-123".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), "openid email profile".to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "https://keys.example.com/callback".to_string()
        )));
    }

    #[tokio::test]
    async fn exchange_code_posts_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v3/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=the-code"))
            .and(body_string_contains("client_secret=hunter2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "id_token": "idt-1"
            })))
            .mount(&server)
            .await;

        let client = OauthClient::new(test_config())
            .unwrap()
            .with_endpoint_base(&server.uri());
        let tokens = client.exchange_code("the-code").await.unwrap();
        assert_eq!(tokens.access_token, "at-1");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt-1"));
    }

    #[tokio::test]
    async fn exchange_code_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/v3/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let client = OauthClient::new(test_config())
            .unwrap()
            .with_endpoint_base(&server.uri());
        let err = client.exchange_code("stale").await.unwrap_err();
        assert_eq!(
            err,
            Error::UpstreamStatus {
                status: 400,
                body: "invalid_grant".to_string()
            }
        );
    }

    #[tokio::test]
    async fn fetch_user_email_reads_userinfo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/v1/userinfo"))
            .and(query_param("alt", "json"))
            .and(query_param("access_token", "at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "email": "visitor@example.com",
                "verified_email": true
            })))
            .mount(&server)
            .await;

        let client = OauthClient::new(test_config())
            .unwrap()
            .with_endpoint_base(&server.uri());
        let email = client.fetch_user_email("at-1").await.unwrap();
        assert_eq!(email, "visitor@example.com");
    }

    #[tokio::test]
    async fn fetch_user_email_rejects_malformed_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/v1/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sub": "123"})))
            .mount(&server)
            .await;

        let client = OauthClient::new(test_config())
            .unwrap()
            .with_endpoint_base(&server.uri());
        let err = client.fetch_user_email("at-1").await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
