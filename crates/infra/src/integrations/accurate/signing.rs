//! Request signing: timestamp in the ERP's zone plus its HMAC signature.
//!
//! The timestamp placed in `X-Api-Timestamp` must be the exact string that
//! was signed, so both are produced together by [`RequestSigner::signed_headers`]
//! and never reused across requests.

use std::sync::Arc;

use chrono_tz::Tz;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use storefront_common::crypto::hmac_sha256_base64;
use storefront_common::time::{parse_timezone, request_timestamp, transaction_date};
use storefront_common::{Clock, SecureString, SystemClock};
use storefront_domain::constants::{HEADER_API_SIGNATURE, HEADER_API_TIMESTAMP};
use tracing::debug;

use super::credentials::Credentials;
use super::errors::AccurateError;

const SIGNATURE_LOG_PREFIX: usize = 12;

/// The three auth headers for one request.
#[derive(Clone, Debug)]
pub struct SignedHeaders {
    authorization: SecureString,
    /// `dd/mm/yyyy HH:MM:SS` in the signer's zone
    pub timestamp: String,
    /// base64 HMAC-SHA256 of `timestamp`
    pub signature: String,
}

impl SignedHeaders {
    /// Insert the auth headers into `headers`, replacing any existing values.
    ///
    /// # Errors
    /// `AccurateError::Configuration` when the token contains characters that
    /// are not valid in a header.
    pub fn apply(&self, headers: &mut HeaderMap) -> Result<(), AccurateError> {
        let mut authorization = HeaderValue::from_str(self.authorization.expose()).map_err(|_| {
            AccurateError::Configuration("API token contains invalid header characters".into())
        })?;
        authorization.set_sensitive(true);

        let timestamp = HeaderValue::from_str(&self.timestamp)
            .map_err(|e| AccurateError::Configuration(format!("invalid timestamp header: {e}")))?;
        let signature = HeaderValue::from_str(&self.signature)
            .map_err(|e| AccurateError::Configuration(format!("invalid signature header: {e}")))?;

        headers.insert(AUTHORIZATION, authorization);
        headers.insert(header_name(HEADER_API_TIMESTAMP)?, timestamp);
        headers.insert(header_name(HEADER_API_SIGNATURE)?, signature);
        Ok(())
    }
}

fn header_name(name: &str) -> Result<HeaderName, AccurateError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| AccurateError::Configuration(format!("invalid header name {name}: {e}")))
}

/// Produces timestamps and signatures for outgoing requests.
#[derive(Clone)]
pub struct RequestSigner {
    clock: Arc<dyn Clock>,
    timezone: Tz,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").field("timezone", &self.timezone).finish()
    }
}

impl RequestSigner {
    /// Signer on the system clock.
    pub fn new(timezone: Tz) -> Self {
        Self::with_clock(Arc::new(SystemClock), timezone)
    }

    /// Signer reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>, timezone: Tz) -> Self {
        Self { clock, timezone }
    }

    /// Resolve `timezone` by IANA name.
    ///
    /// # Errors
    /// `AccurateError::Configuration` for an unknown zone.
    pub fn for_timezone(clock: Arc<dyn Clock>, timezone: &str) -> Result<Self, AccurateError> {
        let tz = parse_timezone(timezone).map_err(|e| AccurateError::Configuration(e.to_string()))?;
        Ok(Self::with_clock(clock, tz))
    }

    /// Zone used for timestamps and transaction dates.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Current wall-clock time as `dd/mm/yyyy HH:MM:SS` in the signer's zone.
    pub fn current_timestamp(&self) -> String {
        request_timestamp(self.clock.now_utc(), self.timezone)
    }

    /// Today's date as `dd/mm/yyyy` in the signer's zone.
    pub fn today(&self) -> String {
        transaction_date(self.clock.now_utc(), self.timezone)
    }

    /// `base64(HMAC-SHA256(secret, timestamp))`
    ///
    /// # Errors
    /// `AccurateError::Configuration` if the MAC rejects the key.
    pub fn sign(timestamp: &str, secret: &SecureString) -> Result<String, AccurateError> {
        hmac_sha256_base64(secret.expose(), timestamp)
            .map_err(|e| AccurateError::Configuration(e.to_string()))
    }

    /// Fresh timestamp, its signature and the bearer header for `credentials`.
    pub fn signed_headers(&self, credentials: &Credentials) -> Result<SignedHeaders, AccurateError> {
        let timestamp = self.current_timestamp();
        let signature = Self::sign(&timestamp, credentials.signature_secret())?;
        debug!(
            %timestamp,
            signature_prefix = signature.get(..SIGNATURE_LOG_PREFIX).unwrap_or_default(),
            "signed request"
        );

        Ok(SignedHeaders {
            authorization: SecureString::new(format!(
                "Bearer {}",
                credentials.api_token().expose()
            )),
            timestamp,
            signature,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Jakarta;
    use storefront_common::MockClock;

    use super::*;

    fn signer_at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> (RequestSigner, MockClock) {
        let clock = MockClock::at(Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap());
        (RequestSigner::with_clock(Arc::new(clock.clone()), Jakarta), clock)
    }

    #[test]
    fn timestamp_is_rendered_in_jakarta() {
        let (signer, _) = signer_at(2024, 1, 15, 3, 4, 5);
        assert_eq!(signer.current_timestamp(), "15/01/2024 10:04:05");
        assert_eq!(signer.today(), "15/01/2024");
    }

    #[test]
    fn sign_is_deterministic() {
        let secret = SecureString::new("test-secret");
        let a = RequestSigner::sign("15/01/2024 10:04:05", &secret).unwrap();
        let b = RequestSigner::sign("15/01/2024 10:04:05", &secret).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "laewObSLiIyTb7Mtrbm+uE4iWN0ZAZpqQxjqsD9rKak=");
    }

    #[test]
    fn headers_carry_the_signed_timestamp() {
        let (signer, clock) = signer_at(2024, 1, 15, 3, 4, 5);
        let creds = Credentials::new("tok", "test-secret").unwrap();

        let first = signer.signed_headers(&creds).unwrap();
        clock.advance(std::time::Duration::from_secs(1));
        let second = signer.signed_headers(&creds).unwrap();

        assert_eq!(first.timestamp, "15/01/2024 10:04:05");
        assert_eq!(
            first.signature,
            RequestSigner::sign(&first.timestamp, creds.signature_secret()).unwrap()
        );
        assert_ne!(first.signature, second.signature);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        first.apply(&mut headers).unwrap();

        assert_eq!(headers.get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(headers[AUTHORIZATION], "Bearer tok");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers["x-api-timestamp"], "15/01/2024 10:04:05");
        assert_eq!(headers["x-api-signature"], first.signature.as_str());
    }

    #[test]
    fn unknown_timezone_is_configuration_error() {
        let result = RequestSigner::for_timezone(Arc::new(SystemClock), "Nowhere/Land");
        assert!(matches!(result, Err(AccurateError::Configuration(_))));
    }
}
