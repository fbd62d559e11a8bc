use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CallbackParams {
    code: String,
}

/// Entry point: send the visitor to the identity provider.
pub async fn index(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let url = state.oauth.authorize_url()?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]))
}

/// OAuth callback: exchange the code and render the submission form with
/// the access token carried as a hidden field.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<String>, ApiError> {
    let tokens = state.oauth.exchange_code(&params.code).await?;
    Ok(Html(render_submit_form(&tokens.access_token)))
}

fn render_submit_form(token: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html><head><title>Register SSH key</title></head><body>\n\
         <h1>Register your public SSH key</h1>\n\
         <p>Supported key types: ssh-ed25519, ecdsa-sha2-nistp256.</p>\n\
         <form method=\"post\" action=\"/submit\">\n\
         <input type=\"text\" name=\"key\" size=\"80\" \
          placeholder=\"ssh-ed25519 AAAA... you@example.com\">\n\
         <input type=\"hidden\" name=\"token\" value=\"{}\">\n\
         <input type=\"submit\" value=\"Register\">\n\
         </form></body></html>\n",
        escape_attribute(token)
    )
}

fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_embeds_token_as_hidden_field() {
        let html = render_submit_form("ya29.token-value");
        assert!(html.contains("name=\"token\" value=\"ya29.token-value\""));
        assert!(html.contains("method=\"post\""));
        assert!(html.contains("action=\"/submit\""));
    }

    #[test]
    fn token_value_is_attribute_escaped() {
        let html = render_submit_form("a\"><script>");
        assert!(!html.contains("\"><script>"));
        assert!(html.contains("a&quot;&gt;&lt;script&gt;"));
    }
}
