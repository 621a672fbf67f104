//! API credentials and where they come from.

use async_trait::async_trait;
use storefront_common::SecureString;
use storefront_domain::constants::{ENV_API_TOKEN, ENV_SIGNATURE_SECRET};

use super::errors::AccurateError;

/// Bearer token plus HMAC signing secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    api_token: SecureString,
    signature_secret: SecureString,
}

impl Credentials {
    /// Both values must be non-blank.
    pub fn new(
        api_token: impl Into<String>,
        signature_secret: impl Into<String>,
    ) -> Result<Self, AccurateError> {
        let api_token = SecureString::new(api_token);
        let signature_secret = SecureString::new(signature_secret);
        if api_token.is_blank() || signature_secret.is_blank() {
            return Err(missing_credentials());
        }
        Ok(Self { api_token, signature_secret })
    }

    /// Bearer token for the `Authorization` header.
    pub fn api_token(&self) -> &SecureString {
        &self.api_token
    }

    /// HMAC key for `X-Api-Signature`.
    pub fn signature_secret(&self) -> &SecureString {
        &self.signature_secret
    }
}

fn missing_credentials() -> AccurateError {
    AccurateError::Configuration(format!("{ENV_API_TOKEN} and {ENV_SIGNATURE_SECRET} must be set"))
}

/// Source of credentials, consulted before every signed request.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self) -> Result<Credentials, AccurateError>;
}

/// Reads the secrets from the process environment at each use, so a missing
/// secret surfaces on the first call rather than at startup.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    token_var: String,
    secret_var: String,
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::with_vars(ENV_API_TOKEN, ENV_SIGNATURE_SECRET)
    }
}

impl EnvCredentials {
    /// `ACCURATE_API_TOKEN` / `ACCURATE_SIGNATURE_SECRET`
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from custom variable names.
    pub fn with_vars(token_var: impl Into<String>, secret_var: impl Into<String>) -> Self {
        Self { token_var: token_var.into(), secret_var: secret_var.into() }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn credentials(&self) -> Result<Credentials, AccurateError> {
        let token = std::env::var(&self.token_var).unwrap_or_default();
        let secret = std::env::var(&self.secret_var).unwrap_or_default();
        if token.trim().is_empty() || secret.trim().is_empty() {
            return Err(AccurateError::Configuration(format!(
                "{} and {} must be set",
                self.token_var, self.secret_var
            )));
        }
        Credentials::new(token, secret)
    }
}

/// Fixed credentials, for embedders that manage secrets themselves.
#[derive(Debug, Clone)]
pub struct StaticCredentials(Credentials);

impl StaticCredentials {
    /// Wrap already validated credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self(credentials)
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credentials(&self) -> Result<Credentials, AccurateError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_configuration_errors() {
        let err = Credentials::new("token", "  ").unwrap_err();
        assert!(matches!(err, AccurateError::Configuration(msg) if msg.contains(ENV_SIGNATURE_SECRET)));
    }

    #[test]
    fn debug_output_is_redacted() {
        let creds = Credentials::new("tok-123", "sec-456").unwrap();
        let printed = format!("{creds:?}");
        assert!(!printed.contains("tok-123"));
        assert!(!printed.contains("sec-456"));
    }

    #[tokio::test]
    async fn env_credentials_report_missing_vars() {
        let provider =
            EnvCredentials::with_vars("STOREFRONT_TEST_UNSET_TOKEN", "STOREFRONT_TEST_UNSET_SECRET");
        let err = provider.credentials().await.unwrap_err();
        match err {
            AccurateError::Configuration(msg) => {
                assert!(msg.contains("STOREFRONT_TEST_UNSET_TOKEN"));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn env_credentials_read_at_call_time() {
        let provider = EnvCredentials::with_vars("STOREFRONT_TEST_LATE_TOKEN", "STOREFRONT_TEST_LATE_SECRET");
        assert!(provider.credentials().await.is_err());

        std::env::set_var("STOREFRONT_TEST_LATE_TOKEN", "late-token");
        std::env::set_var("STOREFRONT_TEST_LATE_SECRET", "late-secret");
        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds.api_token().expose(), "late-token");

        std::env::remove_var("STOREFRONT_TEST_LATE_TOKEN");
        std::env::remove_var("STOREFRONT_TEST_LATE_SECRET");
    }
}
