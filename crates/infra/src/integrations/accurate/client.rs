//! ERP fetch facade.
//!
//! [`AccurateClient::call`] resolves the tenant host, then for every attempt
//! takes a slot in the shared [`RequestScheduler`], signs the request at
//! dispatch time and sends it. Responses are normalised into
//! [`AccurateResponse`] or an [`AccurateError`].

use std::future::Future;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde_json::Value;
use storefront_common::resilience::{
    retry_with_policy, ClassifiedRetry, RequestScheduler, RetryConfig, SchedulerConfig,
};
use storefront_common::{Clock, SystemClock};
use storefront_domain::constants::PROTECTED_HEADERS;
use storefront_domain::AccurateConfig;
use tracing::{debug, instrument, warn};

use super::credentials::{CredentialProvider, EnvCredentials};
use super::errors::{AccurateError, UpstreamBody};
use super::host::{HostResolver, TokenHostResolver};
use super::signing::RequestSigner;
use crate::http::{BufferedResponse, HttpClient};

const TEXT_PREVIEW_CHARS: usize = 100;

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `application/json`
    Json(Value),
    /// Sent as-is; set `Content-Type` through the headers
    Text(String),
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// HTTP method, `GET` by default
    pub method: Method,
    /// Extra headers. Values for the auth headers are ignored.
    pub headers: Vec<(String, String)>,
    /// Optional payload
    pub body: Option<RequestBody>,
    /// Override whether failed attempts may be retried. Defaults to retrying
    /// idempotent methods only.
    pub retry: Option<bool>,
}

impl CallOptions {
    /// A `GET` without body.
    pub fn get() -> Self {
        Self::default()
    }

    /// A `POST`; not retried unless [`CallOptions::retry`] opts in.
    pub fn post() -> Self {
        Self { method: Method::POST, ..Self::default() }
    }

    /// Add a caller header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Send `fields` form-urlencoded.
    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Send `value` as JSON.
    pub fn json(mut self, value: Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Send a raw text body.
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    /// Force retries on or off for this call.
    pub fn retry(mut self, enabled: bool) -> Self {
        self.retry = Some(enabled);
        self
    }

    fn retries_enabled(&self) -> bool {
        self.retry.unwrap_or_else(|| self.method.is_idempotent())
    }
}

/// Normalised successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum AccurateResponse {
    /// Body parsed as JSON
    Json(Value),
    /// 2xx body that is not JSON
    Text(String),
}

impl AccurateResponse {
    /// The JSON value, if the body was JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Take the JSON value, if the body was JSON.
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }
}

/// Authenticated, rate-limited client for the ERP API.
#[derive(Clone)]
pub struct AccurateClient {
    http: HttpClient,
    hosts: Arc<dyn HostResolver>,
    signer: Arc<RequestSigner>,
    credentials: Arc<dyn CredentialProvider>,
    scheduler: Arc<RequestScheduler>,
    retry: RetryConfig,
}

impl std::fmt::Debug for AccurateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccurateClient")
            .field("signer", &self.signer)
            .field("scheduler", &self.scheduler)
            .field("retry", &self.retry)
            .finish()
    }
}

/// A request ready to be signed and sent.
#[derive(Clone)]
struct PreparedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
}

impl AccurateClient {
    /// Start building a client.
    pub fn builder() -> AccurateClientBuilder {
        AccurateClientBuilder::default()
    }

    /// Client with credentials from the environment and host discovery
    /// through token verification.
    pub fn from_config(config: &AccurateConfig) -> Result<Self, AccurateError> {
        Self::builder().config(config.clone()).build()
    }

    /// Shared scheduler; pass it to other clients that must share the limit.
    pub fn scheduler(&self) -> &Arc<RequestScheduler> {
        &self.scheduler
    }

    /// Resolver used for the tenant host.
    pub fn host_resolver(&self) -> &Arc<dyn HostResolver> {
        &self.hosts
    }

    /// Today's date in the ERP's zone, `dd/mm/yyyy`.
    pub fn today(&self) -> String {
        self.signer.today()
    }

    /// Call `endpoint_path` (path plus query, starting with `/`) on the
    /// tenant host.
    ///
    /// 2xx JSON bodies come back as [`AccurateResponse::Json`], other 2xx
    /// bodies as [`AccurateResponse::Text`]. Non-2xx statuses become
    /// [`AccurateError::Upstream`] carrying the body.
    #[instrument(
        skip(self, endpoint_path, options),
        fields(method = %options.method, path = %endpoint_path.split('?').next().unwrap_or_default())
    )]
    pub async fn call(
        &self,
        endpoint_path: &str,
        options: CallOptions,
    ) -> Result<AccurateResponse, AccurateError> {
        if !endpoint_path.starts_with('/') {
            return Err(AccurateError::InvalidRequest(format!(
                "endpoint path must start with '/': {endpoint_path}"
            )));
        }

        let host = self.hosts.resolve_host().await?;
        let url = Url::parse(&format!("{}{}", host.trim_end_matches('/'), endpoint_path))
            .map_err(|e| AccurateError::InvalidRequest(format!("invalid endpoint URL: {e}")))?;

        let retry =
            if options.retries_enabled() { self.retry.clone() } else { RetryConfig::no_retry() };
        let prepared = PreparedRequest {
            method: options.method,
            url,
            headers: caller_headers(&options.headers)?,
            body: options.body,
        };

        retry_with_policy(&retry, &ClassifiedRetry, |attempt| {
            let dispatched = self.dispatch(prepared.clone(), attempt);
            async move { normalize(dispatched.await?) }
        })
        .await
    }

    /// Enqueue one attempt. Signing happens when the scheduler starts the
    /// task, so queueing delay never ages the timestamp.
    fn dispatch(
        &self,
        request: PreparedRequest,
        attempt: u32,
    ) -> impl Future<Output = Result<BufferedResponse, AccurateError>> + Send {
        let http = self.http.clone();
        let signer = Arc::clone(&self.signer);
        let credentials = Arc::clone(&self.credentials);

        self.scheduler.enqueue(move || async move {
            let signed = signer.signed_headers(&credentials.credentials().await?)?;
            let mut headers = request.headers;
            signed.apply(&mut headers)?;

            debug!(attempt = attempt + 1, path = request.url.path(), "dispatching ERP request");
            let mut builder = http.request(request.method, request.url).headers(headers);
            builder = match request.body {
                Some(RequestBody::Form(fields)) => builder.form(&fields),
                Some(RequestBody::Json(value)) => builder.json(&value),
                Some(RequestBody::Text(text)) => builder.body(text),
                None => builder,
            };

            http.send_buffered(builder).await.map_err(AccurateError::from)
        })
    }
}

/// Caller headers with the auth headers removed.
fn caller_headers(pairs: &[(String, String)]) -> Result<HeaderMap, AccurateError> {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if PROTECTED_HEADERS.iter().any(|protected| protected.eq_ignore_ascii_case(name)) {
            warn!(header = %name, "ignoring caller override of auth header");
            continue;
        }
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AccurateError::InvalidRequest(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| AccurateError::InvalidRequest(format!("invalid value for {name}: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

fn normalize(response: BufferedResponse) -> Result<AccurateResponse, AccurateError> {
    let status = response.status.as_u16();

    if !response.is_success() {
        warn!(status, "ERP request failed");
        return Err(AccurateError::Upstream { status, body: UpstreamBody::parse(&response.body) });
    }

    match serde_json::from_str(&response.body) {
        Ok(value) => Ok(AccurateResponse::Json(value)),
        Err(_) => {
            let preview: String = response.body.chars().take(TEXT_PREVIEW_CHARS).collect();
            warn!(
                status,
                content_type = response.content_type.as_deref().unwrap_or("none"),
                %preview,
                "response is not JSON, returning raw text"
            );
            Ok(AccurateResponse::Text(response.body))
        }
    }
}

/// Builder for [`AccurateClient`].
#[derive(Default)]
pub struct AccurateClientBuilder {
    config: AccurateConfig,
    credentials: Option<Arc<dyn CredentialProvider>>,
    host_resolver: Option<Arc<dyn HostResolver>>,
    clock: Option<Arc<dyn Clock>>,
    http: Option<HttpClient>,
    scheduler: Option<Arc<RequestScheduler>>,
}

impl AccurateClientBuilder {
    /// Limits, token URL and timezone. Defaults to [`AccurateConfig::default`].
    pub fn config(mut self, config: AccurateConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`EnvCredentials`].
    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Defaults to a [`TokenHostResolver`] on the configured token URL.
    pub fn host_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.host_resolver = Some(resolver);
        self
    }

    /// Clock used for request timestamps. Defaults to the system clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// HTTP client to send with. Defaults to one using the configured timeout.
    pub fn http_client(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Share an existing scheduler instead of creating one from the config.
    pub fn scheduler(mut self, scheduler: Arc<RequestScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Validate the configuration and assemble the client.
    ///
    /// # Errors
    /// `AccurateError::Configuration` for invalid limits or an unknown
    /// timezone.
    pub fn build(self) -> Result<AccurateClient, AccurateError> {
        let config = self.config;
        config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let signer = Arc::new(RequestSigner::for_timezone(clock, &config.timezone)?);

        let http = match self.http {
            Some(http) => http,
            None => HttpClient::builder()
                .timeout(config.request_timeout())
                .user_agent(concat!("storefront/", env!("CARGO_PKG_VERSION")))
                .build()?,
        };

        let credentials: Arc<dyn CredentialProvider> =
            self.credentials.unwrap_or_else(|| Arc::new(EnvCredentials::new()));

        let hosts = self.host_resolver.unwrap_or_else(|| {
            Arc::new(TokenHostResolver::new(
                http.clone(),
                config.token_url.clone(),
                Arc::clone(&signer),
                Arc::clone(&credentials),
            ))
        });

        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(RequestScheduler::new(SchedulerConfig {
                max_parallel: config.max_parallel,
                min_interval: config.min_interval(),
            })?),
        };

        let retry = RetryConfig {
            max_attempts: config.max_attempts,
            initial_delay: config.retry_base_backoff(),
            ..RetryConfig::default()
        };

        Ok(AccurateClient { http, hosts, signer, credentials, scheduler, retry })
    }
}
