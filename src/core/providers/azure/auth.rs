//! Request signing and authentication headers for the translator-app
//! bootstrap endpoint.
//!
//! The bootstrap endpoint only hands out synthesis tokens to callers that
//! present an `X-MT-Signature` header. The signature is an HMAC-SHA256 over a
//! canonical descriptor of the request:
//!
//! 1. The URL without its scheme, percent-encoded with no safe characters
//! 2. The current UTC time as `"<wkd>, <dd> <mon> <yyyy> <HH:MM:SS>gmt"`, lowercased
//! 3. A random correlation id (a UUID without hyphens)
//!
//! The lowercased concatenation of a fixed application id and these three
//! parts is signed with a fixed key and the result is rendered as
//! `"<app-id>::<base64 digest>::<date>::<correlation id>"`.
//!
//! # Example
//!
//! ```rust
//! use voxrelay::core::providers::azure::{SIGNATURE_APP_ID, sign};
//!
//! let signature = sign("https://dev.microsofttranslator.com/apps/endpoint?api-version=1.0").unwrap();
//! let parts: Vec<&str> = signature.split("::").collect();
//! assert_eq!(parts.len(), 4);
//! assert_eq!(parts[0], SIGNATURE_APP_ID);
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::core::tts::{TTSError, TTSResult};

type HmacSha256 = Hmac<Sha256>;

/// Application identifier that prefixes every signature.
pub const SIGNATURE_APP_ID: &str = "MSTranslatorAndroidApp";

/// Base64-encoded HMAC key used for bootstrap signatures.
pub const SIGNATURE_KEY: &str =
    "oik6PdDdMnOXemTbwvMn9de/h9lFnfBaCWbGMMZqqoSaQaqUOqjVGm5NqsmjcBI1x+sS9ugjB55HEJWRiFXYFw==";

/// Header carrying the request signature on the bootstrap call.
pub const SIGNATURE_HEADER: &str = "X-MT-Signature";

// =============================================================================
// Client identity
// =============================================================================

/// Fixed identity headers the bootstrap endpoint expects from the
/// translator app, as `(name, value)` pairs.
pub const CLIENT_IDENTITY_HEADERS: [(&str, &str); 5] = [
    ("Accept-Language", "zh-Hans"),
    ("X-ClientVersion", "4.0.530a 5fe1dc6c"),
    ("X-UserId", "0f04d16a175c411e"),
    ("X-HomeGeographicRegion", "zh-Hans-CN"),
    ("X-ClientTraceId", "aab069b9-70a7-4844-a734-96cd78d94be9"),
];

/// User agent of the translator app's HTTP stack.
pub const CLIENT_USER_AGENT: &str = "okhttp/4.5.0";

/// Content type declared on the (empty) bootstrap request body.
pub const BOOTSTRAP_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Signs `url` with the current time and a fresh correlation id.
///
/// # Errors
///
/// Returns [`TTSError::InvalidConfiguration`] if the embedded key cannot be
/// decoded.
pub fn sign(url: &str) -> TTSResult<String> {
    sign_at(url, Utc::now(), &Uuid::new_v4().simple().to_string())
}

/// Signs `url` with an explicit timestamp and correlation id.
///
/// Output is fully determined by the inputs.
pub fn sign_at(url: &str, now: DateTime<Utc>, correlation_id: &str) -> TTSResult<String> {
    let encoded_url = urlencoding::encode(strip_scheme(url));
    let date = format_signature_date(now);
    let correlation_id = correlation_id.replace('-', "");

    let message =
        format!("{SIGNATURE_APP_ID}{encoded_url}{date}{correlation_id}").to_lowercase();

    let key = STANDARD
        .decode(SIGNATURE_KEY)
        .map_err(|e| TTSError::InvalidConfiguration(format!("Signature key is not base64: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| TTSError::InvalidConfiguration(format!("Signature key rejected: {e}")))?;
    mac.update(message.as_bytes());
    let digest = STANDARD.encode(mac.finalize().into_bytes());

    Ok(format!("{SIGNATURE_APP_ID}::{digest}::{date}::{correlation_id}"))
}

/// Formats `now` the way the signature expects, e.g. `"mon, 07 oct 2024 08:09:10gmt"`.
pub fn format_signature_date(now: DateTime<Utc>) -> String {
    format!("{}gmt", now.format("%a, %d %b %Y %H:%M:%S")).to_lowercase()
}

#[inline]
fn strip_scheme(url: &str) -> &str {
    url.split_once("://").map_or(url, |(_, rest)| rest)
}

/// Builds the bearer token header value for Azure authentication.
///
/// # Example
///
/// ```rust
/// use voxrelay::core::providers::azure::build_bearer_token_header;
///
/// assert_eq!(build_bearer_token_header("abc"), "Bearer abc");
/// ```
#[inline]
pub fn build_bearer_token_header(token: &str) -> String {
    format!("Bearer {token}")
}
