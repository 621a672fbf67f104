//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use storefront_domain::StorefrontError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub StorefrontError);

impl From<InfraError> for StorefrontError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<StorefrontError> for InfraError {
    fn from(value: StorefrontError) -> Self {
        InfraError(value)
    }
}

trait IntoStorefrontError {
    fn into_storefront(self) -> StorefrontError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → StorefrontError */
/* -------------------------------------------------------------------------- */

impl IntoStorefrontError for HttpError {
    fn into_storefront(self) -> StorefrontError {
        if self.is_timeout() {
            return StorefrontError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return StorefrontError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return StorefrontError::InvalidInput(format!("invalid HTTP request: {self}"));
        }

        if self.is_decode() || self.is_body() {
            return StorefrontError::Network(format!("failed to read HTTP body: {self}"));
        }

        StorefrontError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_storefront())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Client;

    use super::*;

    #[test]
    fn malformed_url_maps_to_invalid_input() {
        let err = Client::new().get("http://[::1").build().unwrap_err();
        let mapped: StorefrontError = InfraError::from(err).into();
        assert!(matches!(mapped, StorefrontError::InvalidInput(_)));
    }
}
