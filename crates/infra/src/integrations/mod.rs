//! External service integrations

pub mod accurate;
