//! Upstream access for the Microsoft speech services.
//!
//! # Architecture
//!
//! - **auth**: request signing for the translator-app bootstrap endpoint and
//!   authentication header helpers
//! - **token**: the process-wide [`TokenCache`] that exchanges a signed
//!   bootstrap call for a short-lived synthesis [`Credential`]
//! - **endpoints**: the configurable upstream URLs
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! use std::sync::Arc;
//! use voxrelay::core::providers::azure::{AzureEndpoints, TokenCache};
//! use voxrelay::utils::req_manager::ReqManager;
//!
//! let endpoints = AzureEndpoints::default();
//! let manager = Arc::new(ReqManager::new(8)?);
//! let cache = TokenCache::new(endpoints.bootstrap_url.clone(), manager, 60);
//!
//! let credential = cache.get_valid_credential().await?;
//! let url = endpoints.synthesis_url(&credential.region)?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod endpoints;
pub mod token;

// Re-export commonly used types
pub use auth::{SIGNATURE_APP_ID, SIGNATURE_HEADER, build_bearer_token_header, sign, sign_at};
pub use endpoints::AzureEndpoints;
pub use token::{Clock, Credential, MIN_REFRESH_MARGIN_SECS, TokenCache, decode_token_expiry};
