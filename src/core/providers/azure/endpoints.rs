//! Upstream endpoint configuration.

use serde::{Deserialize, Serialize};

use crate::core::tts::{TTSError, TTSResult};

/// Bootstrap endpoint that hands out synthesis tokens.
pub const DEFAULT_BOOTSTRAP_URL: &str =
    "https://dev.microsofttranslator.com/apps/endpoint?api-version=1.0";

/// Synthesis endpoint; `{region}` is replaced with the routing region of the
/// current credential.
pub const DEFAULT_SYNTHESIS_URL_TEMPLATE: &str =
    "https://{region}.tts.speech.microsoft.com/cognitiveservices/v1";

/// Public voice catalog.
pub const DEFAULT_VOICES_LIST_URL: &str =
    "https://eastus.api.speech.microsoft.com/cognitiveservices/voices/list";

/// Placeholder substituted by [`AzureEndpoints::synthesis_url`].
pub const REGION_PLACEHOLDER: &str = "{region}";

/// The three upstream URLs the service talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureEndpoints {
    pub bootstrap_url: String,
    pub synthesis_url_template: String,
    pub voices_list_url: String,
}

impl Default for AzureEndpoints {
    fn default() -> Self {
        Self {
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            synthesis_url_template: DEFAULT_SYNTHESIS_URL_TEMPLATE.to_string(),
            voices_list_url: DEFAULT_VOICES_LIST_URL.to_string(),
        }
    }
}

/// A region is usable as a host label: non-empty, ASCII alphanumerics and `-`.
pub fn is_valid_region(region: &str) -> bool {
    !region.is_empty() && region.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

impl AzureEndpoints {
    /// Synthesis URL for a routing region.
    ///
    /// ```rust
    /// use voxrelay::core::providers::azure::AzureEndpoints;
    ///
    /// let endpoints = AzureEndpoints::default();
    /// assert_eq!(
    ///     endpoints.synthesis_url("southeastasia").unwrap(),
    ///     "https://southeastasia.tts.speech.microsoft.com/cognitiveservices/v1"
    /// );
    /// ```
    pub fn synthesis_url(&self, region: &str) -> TTSResult<String> {
        if !is_valid_region(region) {
            return Err(TTSError::CredentialAcquisition(format!(
                "Bootstrap returned an unusable region: {region:?}"
            )));
        }
        Ok(self.synthesis_url_template.replace(REGION_PLACEHOLDER, region))
    }
}
