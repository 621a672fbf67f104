//! HTTP client wrapper.

pub mod client;

pub use client::{BufferedResponse, HttpClient, HttpClientBuilder};
