//! Voice catalog: built-in voices merged with the public upstream list.
//!
//! The upstream list is fetched at most once per process. Until a fetch
//! succeeds every call retries it; once one succeeds its result is kept for
//! the life of the catalog. A failed fetch never fails the listing, the
//! built-in voices are always available.

use std::sync::Arc;

use reqwest::header::{CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::base::{TTSError, TTSResult, truncate_error_body};
use crate::utils::req_manager::ReqManager;

/// Locale prefix whose voices are listed first.
pub const DEFAULT_LOCALE_PREFIX: &str = "zh-CN";

const CATALOG_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/107.0.0.0 Safari/537.36 Edg/107.0.1418.26";
const CATALOG_MS_USER_AGENT: &str = "SpeechStudio/2021.05.001";
const CATALOG_ORIGIN: &str = "https://azure.microsoft.com";

/// One selectable voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceDescriptor {
    /// Unique key, e.g. `zh-CN-XiaoxiaoNeural`
    pub short_name: String,
    pub locale: String,
    pub gender: String,
    pub display_name: String,
}

impl VoiceDescriptor {
    fn builtin(short_name: &str, gender: &str, display_name: &str) -> Self {
        Self {
            short_name: short_name.to_string(),
            locale: DEFAULT_LOCALE_PREFIX.to_string(),
            gender: gender.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Voices that are always offered, whatever the upstream catalog says.
pub fn builtin_voices() -> Vec<VoiceDescriptor> {
    vec![
        VoiceDescriptor::builtin("zh-CN-XiaoxiaoNeural", "Female", "Xiaoxiao"),
        VoiceDescriptor::builtin("zh-CN-YunxiNeural", "Male", "Yunxi"),
        VoiceDescriptor::builtin("zh-CN-YunjianNeural", "Male", "Yunjian"),
        VoiceDescriptor::builtin("zh-CN-XiaoyiNeural", "Female", "Xiaoyi"),
        VoiceDescriptor::builtin("zh-CN-YunyangNeural", "Male", "Yunyang"),
        VoiceDescriptor::builtin("zh-CN-XiaohanNeural", "Female", "Xiaohan"),
        VoiceDescriptor::builtin("zh-CN-XiaomoNeural", "Female", "Xiaomo"),
        VoiceDescriptor::builtin("zh-CN-YunfengNeural", "Male", "Yunfeng"),
        VoiceDescriptor::builtin(
            "zh-CN-XiaoxiaoMultilingualNeural",
            "Female",
            "Xiaoxiao Multilingual",
        ),
    ]
}

fn string_field(entry: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| entry.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Parses one upstream catalog entry.
///
/// Returns `None` for non-objects and entries without a short name.
pub fn parse_voice_entry(entry: &Value) -> Option<VoiceDescriptor> {
    if !entry.is_object() {
        return None;
    }

    let short_name = string_field(entry, &["ShortName", "Name"]);
    if short_name.is_empty() {
        return None;
    }

    let display_name = match string_field(entry, &["DisplayName"]) {
        name if name.is_empty() => short_name.clone(),
        name => name,
    };

    Some(VoiceDescriptor {
        locale: string_field(entry, &["Locale"]),
        gender: string_field(entry, &["GenderName", "Gender"]),
        display_name,
        short_name,
    })
}

/// Merges `remote` into `builtin`, first occurrence of a short name wins,
/// and sorts default-locale voices first, then by locale and short name.
pub fn merge_voices(builtin: Vec<VoiceDescriptor>, remote: &[VoiceDescriptor]) -> Vec<VoiceDescriptor> {
    let mut merged = builtin;
    let mut seen: std::collections::HashSet<String> =
        merged.iter().map(|v| v.short_name.clone()).collect();

    for voice in remote {
        if seen.insert(voice.short_name.clone()) {
            merged.push(voice.clone());
        }
    }

    merged.sort_by(|a, b| {
        let rank = |v: &VoiceDescriptor| u8::from(!v.locale.starts_with(DEFAULT_LOCALE_PREFIX));
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.locale.cmp(&b.locale))
            .then_with(|| a.short_name.cmp(&b.short_name))
    });
    merged
}

/// Process-lifetime voice catalog.
pub struct VoiceCatalog {
    voices_list_url: String,
    req_manager: Arc<ReqManager>,
    remote: OnceCell<Vec<VoiceDescriptor>>,
}

impl VoiceCatalog {
    pub fn new(voices_list_url: impl Into<String>, req_manager: Arc<ReqManager>) -> Self {
        Self {
            voices_list_url: voices_list_url.into(),
            req_manager,
            remote: OnceCell::new(),
        }
    }

    /// Whether the upstream list has been fetched successfully.
    pub fn is_cached(&self) -> bool {
        self.remote.initialized()
    }

    /// All available voices. Never fails.
    pub async fn list_voices(&self) -> Vec<VoiceDescriptor> {
        let remote: &[VoiceDescriptor] = match self.remote.get_or_try_init(|| self.fetch_remote()).await {
            Ok(voices) => voices.as_slice(),
            Err(e) => {
                warn!("Voice catalog unavailable, serving built-in voices only: {}", e);
                &[]
            }
        };
        merge_voices(builtin_voices(), remote)
    }

    async fn fetch_remote(&self) -> TTSResult<Vec<VoiceDescriptor>> {
        debug!(url = %self.voices_list_url, "Fetching voice catalog");

        let guard = self
            .req_manager
            .acquire()
            .await
            .map_err(|e| TTSError::CatalogFetch(format!("HTTP client unavailable: {e}")))?;

        let request = guard
            .client()
            .get(&self.voices_list_url)
            .header(USER_AGENT, CATALOG_USER_AGENT)
            .header("X-Ms-Useragent", CATALOG_MS_USER_AGENT)
            .header(CONTENT_TYPE, "application/json")
            .header(ORIGIN, CATALOG_ORIGIN)
            .header(REFERER, CATALOG_ORIGIN);

        let response = guard
            .send(request)
            .await
            .map_err(|e| TTSError::CatalogFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TTSError::CatalogFetch(format!(
                "status {}: {}",
                status.as_u16(),
                truncate_error_body(&body)
            )));
        }

        let entries: Vec<Value> = response
            .json()
            .await
            .map_err(|e| TTSError::CatalogFetch(format!("invalid catalog JSON: {e}")))?;

        let voices: Vec<VoiceDescriptor> = entries.iter().filter_map(parse_voice_entry).collect();
        info!(count = voices.len(), "Voice catalog loaded");
        Ok(voices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn voice(short_name: &str, locale: &str) -> VoiceDescriptor {
        VoiceDescriptor {
            short_name: short_name.to_string(),
            locale: locale.to_string(),
            gender: "Female".to_string(),
            display_name: short_name.to_string(),
        }
    }

    #[test]
    fn test_builtin_voices() {
        let voices = builtin_voices();
        assert_eq!(voices.len(), 9);
        assert!(voices.iter().all(|v| v.locale == "zh-CN"));
        assert_eq!(voices[0].short_name, "zh-CN-XiaoxiaoNeural");
    }

    #[test]
    fn test_parse_voice_entry_fallbacks() {
        let entry = json!({ "Name": " en-US-JennyNeural ", "Locale": "en-US", "Gender": "Female" });
        let parsed = parse_voice_entry(&entry).unwrap();
        assert_eq!(parsed.short_name, "en-US-JennyNeural");
        assert_eq!(parsed.display_name, "en-US-JennyNeural");
        assert_eq!(parsed.gender, "Female");

        let entry = json!({
            "ShortName": "ja-JP-NanamiNeural",
            "Name": "ignored",
            "Locale": "ja-JP",
            "GenderName": "Female",
            "Gender": "ignored",
            "DisplayName": "Nanami",
        });
        let parsed = parse_voice_entry(&entry).unwrap();
        assert_eq!(parsed.short_name, "ja-JP-NanamiNeural");
        assert_eq!(parsed.gender, "Female");
        assert_eq!(parsed.display_name, "Nanami");
    }

    #[test]
    fn test_parse_voice_entry_skips_unusable_entries() {
        assert!(parse_voice_entry(&json!("zh-CN-XiaoxiaoNeural")).is_none());
        assert!(parse_voice_entry(&json!({ "Locale": "en-US" })).is_none());
        assert!(parse_voice_entry(&json!({ "ShortName": "  " })).is_none());
        assert!(parse_voice_entry(&json!({ "ShortName": 42 })).is_none());
    }

    #[test]
    fn test_merge_keeps_builtin_on_conflict() {
        let remote = vec![
            VoiceDescriptor {
                display_name: "Remote Xiaoxiao".to_string(),
                gender: "Unknown".to_string(),
                ..voice("zh-CN-XiaoxiaoNeural", "zh-CN")
            },
            voice("en-US-JennyNeural", "en-US"),
            voice("en-US-JennyNeural", "en-GB"),
        ];
        let merged = merge_voices(builtin_voices(), &remote);

        assert_eq!(merged.len(), 10);
        let xiaoxiao: Vec<_> = merged
            .iter()
            .filter(|v| v.short_name == "zh-CN-XiaoxiaoNeural")
            .collect();
        assert_eq!(xiaoxiao.len(), 1);
        assert_eq!(xiaoxiao[0].display_name, "Xiaoxiao");
        let jenny = merged.iter().find(|v| v.short_name == "en-US-JennyNeural").unwrap();
        assert_eq!(jenny.locale, "en-US");
    }

    #[test]
    fn test_merge_sort_order() {
        let remote = vec![
            voice("fr-FR-DeniseNeural", "fr-FR"),
            voice("zh-CN-shaanxi-XiaoniNeural", "zh-CN-shaanxi"),
            voice("de-DE-KatjaNeural", "de-DE"),
            voice("zh-HK-HiuGaaiNeural", "zh-HK"),
        ];
        let merged = merge_voices(Vec::new(), &remote);
        let names: Vec<&str> = merged.iter().map(|v| v.short_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "zh-CN-shaanxi-XiaoniNeural",
                "de-DE-KatjaNeural",
                "fr-FR-DeniseNeural",
                "zh-HK-HiuGaaiNeural",
            ]
        );
    }

    #[test]
    fn test_merge_sorts_within_locale_by_short_name() {
        let merged = merge_voices(builtin_voices(), &[]);
        let names: Vec<&str> = merged.iter().map(|v| v.short_name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
