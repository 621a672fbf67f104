//! Tenant host discovery.
//!
//! The ERP serves each tenant from its own host, which is only known after a
//! signed call to the token verification endpoint. The result is cached for
//! the life of the resolver; [`HostResolver::invalidate`] forces the next
//! call to verify again.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use storefront_domain::{TokenPayload, TokenVerificationResponse};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::credentials::CredentialProvider;
use super::errors::AccurateError;
use super::signing::RequestSigner;
use crate::http::HttpClient;

const BODY_PREVIEW_CHARS: usize = 200;

/// Supplies the base URL that endpoint paths are appended to.
#[async_trait]
pub trait HostResolver: Send + Sync {
    /// Base URL of the tenant API, without a trailing slash.
    async fn resolve_host(&self) -> Result<String, AccurateError>;

    /// Drop any cached host.
    fn invalidate(&self) {}
}

/// A fixed host, for tests and single-tenant deployments.
#[derive(Debug, Clone)]
pub struct StaticHostResolver {
    host: String,
}

impl StaticHostResolver {
    /// Always resolve to `host`, without a trailing slash.
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into().trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl HostResolver for StaticHostResolver {
    async fn resolve_host(&self) -> Result<String, AccurateError> {
        Ok(self.host.clone())
    }
}

/// Host and database alias returned by token verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    /// Base URL of the tenant API, without a trailing slash
    pub host: String,
    /// Database name, for logs
    pub alias: Option<String>,
}

/// Resolves the host through the token verification endpoint.
///
/// Concurrent first callers share a single verification request: the
/// `resolving` mutex serialises cache misses and the cache is re-checked
/// once it is held. A failed verification leaves the cache empty.
pub struct TokenHostResolver {
    http: HttpClient,
    token_url: String,
    signer: Arc<RequestSigner>,
    credentials: Arc<dyn CredentialProvider>,
    cached: RwLock<Option<ResolvedHost>>,
    resolving: Mutex<()>,
}

impl std::fmt::Debug for TokenHostResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenHostResolver")
            .field("token_url", &self.token_url)
            .field("cached", &self.cached())
            .finish()
    }
}

impl TokenHostResolver {
    /// Resolver verifying against `token_url`; nothing is sent until the
    /// first [`HostResolver::resolve_host`].
    pub fn new(
        http: HttpClient,
        token_url: impl Into<String>,
        signer: Arc<RequestSigner>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            signer,
            credentials,
            cached: RwLock::new(None),
            resolving: Mutex::new(()),
        }
    }

    /// Cached resolution, if any.
    pub fn cached(&self) -> Option<ResolvedHost> {
        self.cached.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[instrument(skip(self), fields(token_url = %self.token_url))]
    async fn verify(&self) -> Result<ResolvedHost, AccurateError> {
        let credentials = self.credentials.credentials().await?;
        let signed = self.signer.signed_headers(&credentials)?;
        let mut headers = HeaderMap::new();
        signed.apply(&mut headers)?;

        debug!("verifying API token");
        let request = self.http.request(Method::POST, &self.token_url).headers(headers);
        let response = self.http.send_buffered(request).await.map_err(|err| {
            AccurateError::TokenVerification { status: None, body: err.to_string() }
        })?;
        let status = response.status.as_u16();
        debug!(status, "token verification responded");

        if !response.is_success() {
            warn!(status, "token verification rejected");
            return Err(AccurateError::TokenVerification { status: Some(status), body: response.body });
        }

        let parsed: TokenVerificationResponse =
            serde_json::from_str(&response.body).map_err(|_| AccurateError::TokenVerification {
                status: Some(status),
                body: format!("invalid JSON response: {}", preview(&response.body)),
            })?;

        if !parsed.success {
            let body = match parsed.error.as_deref() {
                Some(error) => format!(
                    "API Error: {error} - {}",
                    parsed.error_description.as_deref().unwrap_or_default()
                ),
                None => response.body,
            };
            return Err(AccurateError::TokenVerification { status: Some(status), body });
        }

        let payload = TokenPayload::from_data(parsed.data);

        let host = payload.host().ok_or_else(|| AccurateError::TokenVerification {
            status: Some(status),
            body: format!("could not get host from token verification: {}", preview(&response.body)),
        })?;

        Ok(ResolvedHost {
            host: host.trim_end_matches('/').to_string(),
            alias: payload.alias().map(str::to_string),
        })
    }
}

#[async_trait]
impl HostResolver for TokenHostResolver {
    async fn resolve_host(&self) -> Result<String, AccurateError> {
        if let Some(resolved) = self.cached() {
            return Ok(resolved.host);
        }

        let _resolving = self.resolving.lock().await;
        if let Some(resolved) = self.cached() {
            return Ok(resolved.host);
        }

        let resolved = self.verify().await?;
        info!(
            host = %resolved.host,
            database = resolved.alias.as_deref().unwrap_or("unknown"),
            "token verified, tenant host resolved"
        );
        let host = resolved.host.clone();
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(resolved);
        Ok(host)
    }

    fn invalidate(&self) {
        let previous = self.cached.write().unwrap_or_else(PoisonError::into_inner).take();
        if previous.is_some() {
            debug!("cached tenant host invalidated");
        }
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_resolver_strips_trailing_slash() {
        let resolver = StaticHostResolver::new("https://fake.host/");
        assert_eq!(resolver.resolve_host().await.unwrap(), "https://fake.host");
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let body = "é".repeat(300);
        assert_eq!(preview(&body).chars().count(), BODY_PREVIEW_CHARS);
    }
}
