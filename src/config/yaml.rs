use serde::Deserialize;
use std::path::PathBuf;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values given here
/// take precedence over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5000
///
/// upstream:
///   bootstrap_url: "https://dev.microsofttranslator.com/apps/endpoint?api-version=1.0"
///   synthesis_url_template: "https://{region}.tts.speech.microsoft.com/cognitiveservices/v1"
///   voices_list_url: "https://eastus.api.speech.microsoft.com/cognitiveservices/voices/list"
///   request_timeout_seconds: 30
///   max_concurrent_requests: 8
///   token_refresh_margin_seconds: 60
///
/// synthesis:
///   max_chars_per_chunk: 1200
///   chunk_concurrency: 1
///   output_format: "audio-24khz-48kbitrate-mono-mp3"
///   default_voice: "zh-CN-XiaoxiaoNeural"
///   default_style: "narration-relaxed"
///
/// retry:
///   max_attempts: 3
///   initial_backoff_ms: 2000
///   max_backoff_ms: 5000
///
/// voices:
///   prefetch: true
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub upstream: Option<UpstreamYaml>,
    pub synthesis: Option<SynthesisYaml>,
    pub retry: Option<RetryYaml>,
    pub voices: Option<VoicesYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Upstream endpoints and HTTP client settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct UpstreamYaml {
    pub bootstrap_url: Option<String>,
    /// Must contain the `{region}` placeholder
    pub synthesis_url_template: Option<String>,
    pub voices_list_url: Option<String>,
    pub request_timeout_seconds: Option<u64>,
    pub max_concurrent_requests: Option<usize>,
    pub token_refresh_margin_seconds: Option<u64>,
}

/// Synthesis settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisYaml {
    pub max_chars_per_chunk: Option<usize>,
    pub chunk_concurrency: Option<usize>,
    pub output_format: Option<String>,
    pub default_voice: Option<String>,
    pub default_style: Option<String>,
}

/// Retry settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RetryYaml {
    pub max_attempts: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
}

/// Voice catalog settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct VoicesYaml {
    /// Fetch the upstream voice list at startup
    pub prefetch: Option<bool>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
        let config: YamlConfig = serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_full_config() {
        let yaml = r#"
server:
  host: "0.0.0.0"
  port: 8080
upstream:
  synthesis_url_template: "http://localhost:9000/{region}/v1"
  max_concurrent_requests: 16
synthesis:
  max_chars_per_chunk: 500
  output_format: "riff-24khz-16bit-mono-pcm"
retry:
  max_attempts: 5
voices:
  prefetch: true
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(8080));

        let upstream = config.upstream.unwrap();
        assert_eq!(
            upstream.synthesis_url_template.as_deref(),
            Some("http://localhost:9000/{region}/v1")
        );
        assert_eq!(upstream.max_concurrent_requests, Some(16));
        assert_eq!(upstream.bootstrap_url, None);

        let synthesis = config.synthesis.unwrap();
        assert_eq!(synthesis.max_chars_per_chunk, Some(500));
        assert_eq!(synthesis.output_format.as_deref(), Some("riff-24khz-16bit-mono-pcm"));

        assert_eq!(config.retry.unwrap().max_attempts, Some(5));
        assert_eq!(config.voices.unwrap().prefetch, Some(true));
    }

    #[test]
    fn test_yaml_empty_config() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.upstream.is_none());
        assert!(config.synthesis.is_none());
    }

    #[test]
    fn test_yaml_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "server:\n  port: 7000\n").unwrap();

        let config = YamlConfig::from_file(&path).unwrap();
        assert_eq!(config.server.unwrap().port, Some(7000));
    }

    #[test]
    fn test_yaml_from_missing_file() {
        let result = YamlConfig::from_file(&PathBuf::from("/nonexistent/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_yaml_invalid_type() {
        let result: Result<YamlConfig, _> = serde_yaml::from_str("server:\n  port: \"not-a-port\"\n");
        assert!(result.is_err());
    }
}
