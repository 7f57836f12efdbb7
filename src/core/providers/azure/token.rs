//! Cached synthesis credential with signed bootstrap refresh.
//!
//! [`TokenCache`] holds at most one [`Credential`]. A credential is *fresh*
//! while `now < expires_at - margin`; otherwise the next caller refreshes it
//! by sending a signed POST to the bootstrap endpoint.
//!
//! Refreshes are serialized: callers that find the cache stale queue on a
//! write lock, and whoever gets it second re-checks and reuses the credential
//! the first one fetched. A failed refresh leaves the cache untouched.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::auth::{
    BOOTSTRAP_CONTENT_TYPE, CLIENT_IDENTITY_HEADERS, CLIENT_USER_AGENT, SIGNATURE_HEADER, sign,
};
use super::endpoints::is_valid_region;
use crate::core::tts::{TTSError, TTSResult, truncate_error_body};
use crate::utils::req_manager::ReqManager;

/// Smallest allowed refresh margin in seconds.
pub const MIN_REFRESH_MARGIN_SECS: u64 = 60;

/// Source of the current Unix time in seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp())
}

/// Short-lived authorization for the synthesis endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Compact three-segment token
    pub token: String,
    /// Routing region the token is valid for
    pub region: String,
    /// Unix time (seconds) at which the token expires
    pub expires_at: i64,
}

impl Credential {
    #[inline]
    pub fn is_fresh(&self, now: i64, margin_secs: i64) -> bool {
        now < self.expires_at.saturating_sub(margin_secs)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("region", &self.region)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct BootstrapResponse {
    #[serde(rename = "t")]
    token: Option<String>,
    #[serde(rename = "r")]
    region: Option<String>,
}

/// Reads the `exp` claim from the payload segment of a compact token.
///
/// The payload may use either base64 alphabet, with or without padding.
pub fn decode_token_expiry(token: &str) -> TTSResult<i64> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| {
            TTSError::CredentialAcquisition("Token has no payload segment".to_string())
        })?;

    let trimmed = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .map_err(|e| {
            TTSError::CredentialAcquisition(format!("Token payload is not base64: {e}"))
        })?;

    let claims: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        TTSError::CredentialAcquisition(format!("Token payload is not JSON: {e}"))
    })?;

    claims
        .get("exp")
        .and_then(|exp| exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64)))
        .ok_or_else(|| TTSError::CredentialAcquisition("Token has no exp claim".to_string()))
}

/// Process-wide cache for the synthesis credential.
pub struct TokenCache {
    bootstrap_url: String,
    req_manager: Arc<ReqManager>,
    margin_secs: i64,
    credential: RwLock<Option<Credential>>,
    clock: Clock,
    refreshes: AtomicU64,
}

impl TokenCache {
    /// Create an empty cache. `margin_secs` is raised to
    /// [`MIN_REFRESH_MARGIN_SECS`] if smaller.
    pub fn new(
        bootstrap_url: impl Into<String>,
        req_manager: Arc<ReqManager>,
        margin_secs: u64,
    ) -> Self {
        let margin_secs = margin_secs.max(MIN_REFRESH_MARGIN_SECS).min(i64::MAX as u64) as i64;
        Self {
            bootstrap_url: bootstrap_url.into(),
            req_manager,
            margin_secs,
            credential: RwLock::new(None),
            clock: system_clock(),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn margin_secs(&self) -> i64 {
        self.margin_secs
    }

    /// Number of successful bootstrap refreshes so far.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Returns a credential that stays valid for at least the margin.
    ///
    /// Fresh cached credentials are returned without network traffic.
    /// Otherwise one bootstrap call is made on behalf of all waiting callers.
    pub async fn get_valid_credential(&self) -> TTSResult<Credential> {
        if let Some(credential) = self.fresh(self.credential.read().await.as_ref()) {
            return Ok(credential);
        }

        let mut slot = self.credential.write().await;
        if let Some(credential) = self.fresh(slot.as_ref()) {
            debug!("Credential refreshed by a concurrent caller");
            return Ok(credential);
        }

        let credential = self.fetch_credential().await?;
        *slot = Some(credential.clone());
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        Ok(credential)
    }

    fn fresh(&self, credential: Option<&Credential>) -> Option<Credential> {
        credential
            .filter(|c| c.is_fresh((self.clock)(), self.margin_secs))
            .cloned()
    }

    /// Drop `rejected` from the cache so the next caller refreshes.
    ///
    /// A credential that already replaced `rejected` is kept.
    pub async fn invalidate(&self, rejected: &Credential) {
        let mut slot = self.credential.write().await;
        if slot.as_ref().is_some_and(|c| c.token == rejected.token) {
            *slot = None;
            debug!("Cached credential invalidated after upstream rejection");
        }
    }

    async fn fetch_credential(&self) -> TTSResult<Credential> {
        let signature = sign(&self.bootstrap_url)?;

        debug!(url = %self.bootstrap_url, "Requesting synthesis token");

        let guard = self.req_manager.acquire().await.map_err(|e| {
            TTSError::CredentialAcquisition(format!("HTTP client unavailable: {e}"))
        })?;

        let request = CLIENT_IDENTITY_HEADERS
            .iter()
            .fold(guard.client().post(&self.bootstrap_url), |request, (name, value)| {
                request.header(*name, *value)
            })
            .header(SIGNATURE_HEADER, signature)
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .header(CONTENT_TYPE, BOOTSTRAP_CONTENT_TYPE)
            .body(Vec::new());

        let response = guard.send(request).await.map_err(|e| {
            TTSError::CredentialAcquisition(format!("Bootstrap request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Bootstrap endpoint rejected the request");
            return Err(TTSError::CredentialAcquisition(format!(
                "Bootstrap endpoint returned {}: {}",
                status.as_u16(),
                truncate_error_body(&body)
            )));
        }

        let body: BootstrapResponse = response.json().await.map_err(|e| {
            TTSError::CredentialAcquisition(format!("Bootstrap response is not valid JSON: {e}"))
        })?;
        drop(guard);

        let token = body.token.filter(|t| !t.is_empty()).ok_or_else(|| {
            TTSError::CredentialAcquisition("Bootstrap response has no token".to_string())
        })?;
        let region = body.region.filter(|r| !r.is_empty()).ok_or_else(|| {
            TTSError::CredentialAcquisition("Bootstrap response has no region".to_string())
        })?;
        if !is_valid_region(&region) {
            return Err(TTSError::CredentialAcquisition(format!(
                "Bootstrap returned an unusable region: {region:?}"
            )));
        }
        let expires_at = decode_token_expiry(&token)?;

        let credential = Credential {
            token,
            region,
            expires_at,
        };

        let now = (self.clock)();
        if !credential.is_fresh(now, self.margin_secs) {
            return Err(TTSError::CredentialAcquisition(format!(
                "Bootstrap returned a token expiring in {}s, inside the {}s refresh margin",
                expires_at.saturating_sub(now),
                self.margin_secs
            )));
        }

        info!(
            region = %credential.region,
            expires_in_secs = expires_at.saturating_sub(now),
            "Synthesis token refreshed"
        );

        Ok(credential)
    }
}
