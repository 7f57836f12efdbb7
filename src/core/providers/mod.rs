//! Upstream service providers.

pub mod azure;
