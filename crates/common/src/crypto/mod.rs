//! Shared cryptographic primitives.

pub mod signature;

pub use signature::{hmac_sha256_base64, SignatureError};
