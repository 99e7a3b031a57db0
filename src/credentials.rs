//! Bearer credential sources
//!
//! Token storage is owned by the host application; the feed only reads the
//! current token right before each network call.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use std::path::PathBuf;

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current bearer token, or `None` when the user is signed out
    async fn get_token(&self) -> Option<String>;
}

/// A fixed token, e.g. passed on the command line
pub struct StaticToken {
    token: Option<String>,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn absent() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn get_token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Reads the token from an environment variable on every call
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvToken {
    async fn get_token(&self) -> Option<String> {
        std::env::var(&self.var).ok()
    }
}

/// Reads the token from a file on every call, so a sign-in elsewhere is
/// picked up without restarting
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialProvider for FileToken {
    async fn get_token(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Some(content.trim().to_string()),
            Err(e) => {
                log::debug!("Token file {} unreadable: {e}", self.path.display());
                None
            }
        }
    }
}

/// Fetch the current token and keep it only if it is usable
pub async fn usable_token(provider: &dyn CredentialProvider) -> Option<String> {
    let token = provider.get_token().await?;
    let token = token.trim();
    if is_usable_token(token, Utc::now().timestamp()) {
        Some(token.to_string())
    } else {
        log::warn!("Discarding unusable bearer token");
        None
    }
}

/// Empty tokens, tokens that cannot travel in an `Authorization` header and
/// JWTs whose `exp` has passed are unusable. Opaque tokens are accepted as-is
/// since only the server can judge them.
pub fn is_usable_token(token: &str, now_unix: i64) -> bool {
    let token = token.trim();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_graphic()) {
        return false;
    }

    match jwt_expiry(token) {
        Some(exp) => exp > now_unix,
        None => true,
    }
}

fn jwt_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).ok()?;
    claims.get("exp")?.as_i64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jwt_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_opaque_tokens_are_usable() {
        assert!(is_usable_token("abc123", 1_700_000_000));
        assert!(!is_usable_token("", 1_700_000_000));
        assert!(!is_usable_token("   ", 1_700_000_000));
        assert!(!is_usable_token("abc 123", 1_700_000_000));
        assert!(!is_usable_token("abc\u{7}123", 1_700_000_000));
        assert!(!is_usable_token("abcé123", 1_700_000_000));
        assert!(is_usable_token("abc123\n", 1_700_000_000));
    }

    #[test]
    fn test_jwt_expiry_is_enforced() {
        let token = jwt_with_payload(r#"{"sub":"7","exp":1700000000}"#);
        assert!(is_usable_token(&token, 1_699_999_999));
        assert!(!is_usable_token(&token, 1_700_000_000));
        assert!(!is_usable_token(&token, 1_800_000_000));
    }

    #[test]
    fn test_jwt_without_exp_is_usable() {
        let token = jwt_with_payload(r#"{"sub":"7"}"#);
        assert!(is_usable_token(&token, 1_800_000_000));
    }

    #[tokio::test]
    async fn test_usable_token_filters_provider_output() {
        assert_eq!(
            usable_token(&StaticToken::new("abc123")).await,
            Some("abc123".to_string())
        );
        assert_eq!(usable_token(&StaticToken::absent()).await, None);
        assert_eq!(usable_token(&StaticToken::new("")).await, None);
        assert_eq!(
            usable_token(&StaticToken::new(" abc123\n")).await,
            Some("abc123".to_string())
        );

        let expired = jwt_with_payload(r#"{"exp":1}"#);
        assert_eq!(usable_token(&StaticToken::new(expired)).await, None);
    }

    #[tokio::test]
    async fn test_file_token_trims_and_handles_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "abc123\n").unwrap();

        assert_eq!(
            FileToken::new(&path).get_token().await,
            Some("abc123".to_string())
        );
        assert_eq!(
            FileToken::new(dir.path().join("missing")).get_token().await,
            None
        );
    }
}
