//! Accurate ERP integration
//!
//! Every call to the ERP needs three things: the tenant host (discovered once
//! through token verification), fresh auth headers (bearer token plus a
//! timestamp and its HMAC signature), and a slot in the shared request
//! scheduler. [`AccurateClient::call`] composes them; [`AccurateCommands`]
//! layers typed operations on top.
//!
//! ## Example
//!
//! ```rust,no_run
//! use storefront_domain::AccurateConfig;
//! use storefront_infra::integrations::accurate::{AccurateClient, AccurateCommands, CallOptions};
//!
//! # async fn example() -> Result<(), storefront_infra::AccurateError> {
//! let client = AccurateClient::from_config(&AccurateConfig::default())?;
//! let raw = client.call("/accurate/api/customer/detail.do?id=42", CallOptions::get()).await?;
//! println!("{:?}", raw.as_json());
//!
//! let commands = AccurateCommands::new(client);
//! let items = commands.list_items().await?;
//! println!("{} items", items.rows.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod commands;
pub mod credentials;
pub mod errors;
pub mod host;
pub mod signing;

pub use client::{
    AccurateClient, AccurateClientBuilder, AccurateResponse, CallOptions, RequestBody,
};
pub use commands::AccurateCommands;
pub use credentials::{CredentialProvider, Credentials, EnvCredentials, StaticCredentials};
pub use errors::{AccurateError, UpstreamBody};
pub use host::{HostResolver, ResolvedHost, StaticHostResolver, TokenHostResolver};
pub use signing::{RequestSigner, SignedHeaders};
