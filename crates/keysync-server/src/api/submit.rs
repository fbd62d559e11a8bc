use axum::extract::State;
use axum::response::Html;
use axum::Form;
use keysync_core::Error;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

const MAX_KEY_LENGTH: usize = 500;
const ALLOWED_KEY_PREFIXES: &[&str] = &["ssh-ed25519", "ecdsa-sha2-nistp256"];

#[derive(Deserialize)]
pub struct SubmitForm {
    key: String,
    token: String,
}

/// Register a submitted SSH key against the visitor's directory account.
///
/// The key is validated before any network call. The trailing comment is
/// rewritten to the verified email so the published key always identifies
/// its owner.
pub async fn submit_key(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SubmitForm>,
) -> Result<Html<String>, ApiError> {
    let key = form.key.trim();
    validate_key(key)?;

    let email = state.oauth.fetch_user_email(&form.token).await?;
    let rewritten = rewrite_comment(key, &email)?;
    let confirmed = state.directory.set_user_key_attribute(&email, &rewritten).await?;

    tracing::info!(%email, "registered ssh key");
    Ok(Html(render_confirmation(&email, &confirmed)))
}

fn validate_key(key: &str) -> Result<(), Error> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(Error::Validation(format!(
            "key exceeds {MAX_KEY_LENGTH} characters"
        )));
    }
    if !ALLOWED_KEY_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
    {
        return Err(Error::Validation(format!(
            "unsupported key type, expected one of: {}",
            ALLOWED_KEY_PREFIXES.join(", ")
        )));
    }
    if key.split_whitespace().count() < 2 {
        return Err(Error::Validation(
            "key must contain an algorithm and a blob field".to_string(),
        ));
    }
    Ok(())
}

// Replaces everything after the blob with the verified email.
fn rewrite_comment(key: &str, email: &str) -> Result<String, Error> {
    let mut parts = key.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(algorithm), Some(blob)) => Ok(format!("{algorithm} {blob} {email}")),
        _ => Err(Error::Validation(
            "key must contain an algorithm and a blob field".to_string(),
        )),
    }
}

fn render_confirmation(email: &str, key: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html><head><title>Key registered</title></head><body>\n\
         <h1>Key registered</h1>\n\
         <p>The following key is now on file for {email}:</p>\n\
         <pre>{key}</pre>\n\
         </body></html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_key_types() {
        validate_key("ssh-ed25519 AAAAC3Nza alice@example.com").unwrap();
        validate_key("ecdsa-sha2-nistp256 AAAAE2Vj alice@example.com").unwrap();
    }

    #[test]
    fn rejects_unsupported_key_type() {
        let err = validate_key("ssh-rsa AAAAB3Nza alice@example.com").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_oversized_key() {
        let key = format!("ssh-ed25519 {}", "A".repeat(MAX_KEY_LENGTH));
        let err = validate_key(&key).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn accepts_key_at_length_limit() {
        let blob = "A".repeat(MAX_KEY_LENGTH - "ssh-ed25519 ".len());
        validate_key(&format!("ssh-ed25519 {blob}")).unwrap();
    }

    #[test]
    fn rejects_key_without_blob_field() {
        let err = validate_key("ssh-ed25519").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rewrites_comment_to_verified_email() {
        let rewritten = rewrite_comment("ssh-ed25519 AAAA somebody-else", "a@b.com").unwrap();
        assert_eq!(rewritten, "ssh-ed25519 AAAA a@b.com");
    }

    #[test]
    fn rewrite_appends_email_when_comment_missing() {
        let rewritten = rewrite_comment("ssh-ed25519 AAAA", "a@b.com").unwrap();
        assert_eq!(rewritten, "ssh-ed25519 AAAA a@b.com");
    }

    #[test]
    fn rewrite_collapses_multi_word_comments() {
        let rewritten =
            rewrite_comment("ssh-ed25519 AAAA some old comment", "a@b.com").unwrap();
        assert_eq!(rewritten, "ssh-ed25519 AAAA a@b.com");
    }
}
