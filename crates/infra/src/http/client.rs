use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use storefront_domain::StorefrontError;
use tracing::debug;

use crate::errors::InfraError;

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    /// Response status
    pub status: StatusCode,
    /// `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Body decoded as text
    pub body: String,
}

impl BufferedResponse {
    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// HTTP client with a request timeout.
///
/// Each `send` is a single attempt. Callers that retry do so above this
/// layer, because every attempt to the ERP needs fresh auth headers and a
/// fresh slot in the request scheduler.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self, StorefrontError> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the request once.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, StorefrontError> {
        let request = builder.build().map_err(|err| StorefrontError::from(InfraError::from(err)))?;

        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, url = %redact_query(&url), "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, error = %err, "HTTP request failed");
                Err(InfraError::from(err).into())
            }
        }
    }

    /// Execute the request once and read the whole body as text.
    pub async fn send_buffered(
        &self,
        builder: RequestBuilder,
    ) -> Result<BufferedResponse, StorefrontError> {
        let response = self.send(builder).await?;
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await.map_err(|err| StorefrontError::from(InfraError::from(err)))?;

        Ok(BufferedResponse { status, content_type, body })
    }
}

// Query strings can carry customer identifiers; keep them out of debug logs.
fn redact_query(url: &reqwest::Url) -> String {
    let mut shown = url.clone();
    if shown.query().is_some() {
        shown.set_query(Some("redacted"));
    }
    shown.to_string()
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None }
    }
}

impl HttpClientBuilder {
    /// Per-request timeout covering connect, send and body read.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `User-Agent` sent with every request.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// `StorefrontError::InvalidInput` if reqwest rejects the settings.
    pub fn build(self) -> Result<HttpClient, StorefrontError> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|err| StorefrontError::from(InfraError::from(err)))?;

        Ok(HttpClient { client })
    }
}
