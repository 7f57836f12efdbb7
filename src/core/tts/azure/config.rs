//! Output formats and SSML generation for the Azure synthesis endpoint.
//!
//! This module contains:
//! - Audio output format identifiers sent in `X-Microsoft-OutputFormat`
//! - XML escaping for text and attribute values
//! - The SSML document sent as the body of every synthesis request

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::tts::base::SynthesisRequest;

/// HTTP header name for Azure TTS output format.
pub const AZURE_OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";

/// Content type of the SSML request body.
pub const SSML_CONTENT_TYPE: &str = "application/ssml+xml";

/// Language declared on the SSML root element.
pub const SSML_LANGUAGE: &str = "zh-CN";

// =============================================================================
// Audio Encoding
// =============================================================================

/// Audio output formats accepted by the synthesis endpoint.
///
/// The wire identifier of each variant is what [`AzureAudioEncoding::as_str`]
/// returns and what [`FromStr`] accepts.
///
/// # Example
///
/// ```rust
/// use voxrelay::core::tts::azure::AzureAudioEncoding;
///
/// let format: AzureAudioEncoding = "audio-24khz-48kbitrate-mono-mp3".parse().unwrap();
/// assert_eq!(format, AzureAudioEncoding::default());
/// assert_eq!(format.content_type(), "audio/mpeg");
/// assert_eq!(format.file_extension(), "mp3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AzureAudioEncoding {
    // =========================================================================
    // MP3
    // =========================================================================
    /// 16kHz, 32kbps MP3 mono
    Audio16Khz32KbitrateMonoMp3,
    /// 16kHz, 64kbps MP3 mono
    Audio16Khz64KbitrateMonoMp3,
    /// 24kHz, 48kbps MP3 mono
    #[default]
    Audio24Khz48KbitrateMonoMp3,
    /// 24kHz, 96kbps MP3 mono
    Audio24Khz96KbitrateMonoMp3,
    /// 48kHz, 96kbps MP3 mono
    Audio48Khz96KbitrateMonoMp3,
    /// 48kHz, 192kbps MP3 mono
    Audio48Khz192KbitrateMonoMp3,

    // =========================================================================
    // Containers
    // =========================================================================
    /// 16kHz, 16-bit PCM in a RIFF (WAV) container
    Riff16Khz16BitMonoPcm,
    /// 24kHz, 16-bit PCM in a RIFF (WAV) container
    Riff24Khz16BitMonoPcm,
    /// 48kHz, 16-bit PCM in a RIFF (WAV) container
    Riff48Khz16BitMonoPcm,
    /// 16kHz Opus in an Ogg container
    Ogg16Khz16BitMonoOpus,
    /// 24kHz Opus in an Ogg container
    Ogg24Khz16BitMonoOpus,
    /// 48kHz Opus in an Ogg container
    Ogg48Khz16BitMonoOpus,
    /// 24kHz Opus in a WebM container
    Webm24Khz16BitMonoOpus,

    // =========================================================================
    // Raw PCM
    // =========================================================================
    /// 16kHz, 16-bit PCM mono
    Raw16Khz16BitMonoPcm,
    /// 24kHz, 16-bit PCM mono
    Raw24Khz16BitMonoPcm,
    /// 48kHz, 16-bit PCM mono
    Raw48Khz16BitMonoPcm,
}

impl AzureAudioEncoding {
    /// All known formats.
    pub const ALL: [AzureAudioEncoding; 16] = [
        Self::Audio16Khz32KbitrateMonoMp3,
        Self::Audio16Khz64KbitrateMonoMp3,
        Self::Audio24Khz48KbitrateMonoMp3,
        Self::Audio24Khz96KbitrateMonoMp3,
        Self::Audio48Khz96KbitrateMonoMp3,
        Self::Audio48Khz192KbitrateMonoMp3,
        Self::Riff16Khz16BitMonoPcm,
        Self::Riff24Khz16BitMonoPcm,
        Self::Riff48Khz16BitMonoPcm,
        Self::Ogg16Khz16BitMonoOpus,
        Self::Ogg24Khz16BitMonoOpus,
        Self::Ogg48Khz16BitMonoOpus,
        Self::Webm24Khz16BitMonoOpus,
        Self::Raw16Khz16BitMonoPcm,
        Self::Raw24Khz16BitMonoPcm,
        Self::Raw48Khz16BitMonoPcm,
    ];

    /// Returns the format string for the `X-Microsoft-OutputFormat` header.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio16Khz32KbitrateMonoMp3 => "audio-16khz-32kbitrate-mono-mp3",
            Self::Audio16Khz64KbitrateMonoMp3 => "audio-16khz-64kbitrate-mono-mp3",
            Self::Audio24Khz48KbitrateMonoMp3 => "audio-24khz-48kbitrate-mono-mp3",
            Self::Audio24Khz96KbitrateMonoMp3 => "audio-24khz-96kbitrate-mono-mp3",
            Self::Audio48Khz96KbitrateMonoMp3 => "audio-48khz-96kbitrate-mono-mp3",
            Self::Audio48Khz192KbitrateMonoMp3 => "audio-48khz-192kbitrate-mono-mp3",
            Self::Riff16Khz16BitMonoPcm => "riff-16khz-16bit-mono-pcm",
            Self::Riff24Khz16BitMonoPcm => "riff-24khz-16bit-mono-pcm",
            Self::Riff48Khz16BitMonoPcm => "riff-48khz-16bit-mono-pcm",
            Self::Ogg16Khz16BitMonoOpus => "ogg-16khz-16bit-mono-opus",
            Self::Ogg24Khz16BitMonoOpus => "ogg-24khz-16bit-mono-opus",
            Self::Ogg48Khz16BitMonoOpus => "ogg-48khz-16bit-mono-opus",
            Self::Webm24Khz16BitMonoOpus => "webm-24khz-16bit-mono-opus",
            Self::Raw16Khz16BitMonoPcm => "raw-16khz-16bit-mono-pcm",
            Self::Raw24Khz16BitMonoPcm => "raw-24khz-16bit-mono-pcm",
            Self::Raw48Khz16BitMonoPcm => "raw-48khz-16bit-mono-pcm",
        }
    }

    /// Returns the MIME content type of the audio this format produces.
    #[inline]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Audio16Khz32KbitrateMonoMp3
            | Self::Audio16Khz64KbitrateMonoMp3
            | Self::Audio24Khz48KbitrateMonoMp3
            | Self::Audio24Khz96KbitrateMonoMp3
            | Self::Audio48Khz96KbitrateMonoMp3
            | Self::Audio48Khz192KbitrateMonoMp3 => "audio/mpeg",
            Self::Riff16Khz16BitMonoPcm | Self::Riff24Khz16BitMonoPcm | Self::Riff48Khz16BitMonoPcm => {
                "audio/wav"
            }
            Self::Ogg16Khz16BitMonoOpus | Self::Ogg24Khz16BitMonoOpus | Self::Ogg48Khz16BitMonoOpus => {
                "audio/ogg"
            }
            Self::Webm24Khz16BitMonoOpus => "audio/webm",
            Self::Raw16Khz16BitMonoPcm | Self::Raw24Khz16BitMonoPcm | Self::Raw48Khz16BitMonoPcm => {
                "audio/pcm"
            }
        }
    }

    /// Returns the file extension used for downloads in this format.
    #[inline]
    pub fn file_extension(&self) -> &'static str {
        match self.content_type() {
            "audio/mpeg" => "mp3",
            "audio/wav" => "wav",
            "audio/ogg" => "ogg",
            "audio/webm" => "webm",
            _ => "pcm",
        }
    }

    /// Whether the chunk outputs of this format can be joined byte-for-byte.
    ///
    /// Containers carry a header per chunk, so joined output holds several
    /// headers. Most players cope with that for Ogg and not at all for WAV.
    #[inline]
    pub fn is_concatenable(&self) -> bool {
        matches!(
            self.content_type(),
            "audio/mpeg" | "audio/pcm" | "audio/ogg"
        )
    }
}

impl fmt::Display for AzureAudioEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AzureAudioEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown output format '{s}'. Supported: {}",
                    Self::ALL.map(|f| f.as_str()).join(", ")
                )
            })
    }
}

impl TryFrom<String> for AzureAudioEncoding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AzureAudioEncoding> for String {
    fn from(value: AzureAudioEncoding) -> Self {
        value.as_str().to_string()
    }
}

// =============================================================================
// SSML Generation
// =============================================================================

/// Escapes special XML characters in text for use in SSML.
///
/// Handles the five predefined XML entities, so the result is safe both as
/// element content and inside a double-quoted attribute value.
///
/// # Example
///
/// ```rust
/// use voxrelay::core::tts::azure::escape_xml;
///
/// assert_eq!(escape_xml("Tom & Jerry"), "Tom &amp; Jerry");
/// assert_eq!(escape_xml("<tag>"), "&lt;tag&gt;");
/// ```
pub fn escape_xml(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}

/// Whether `c` may appear in an XML 1.0 document.
#[inline]
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || (c >= ' ' && !matches!(c, '\u{FFFE}' | '\u{FFFF}'))
}

fn encode_xml(value: &str) -> String {
    let clean: String = value.chars().filter(|c| is_xml_char(*c)).collect();
    escape_xml(&clean)
}

/// Builds the SSML document for one chunk of a synthesis request.
///
/// The text is wrapped in `voice`, `mstts:express-as` and `prosody` elements.
/// Rate and pitch are rendered as percentage modifiers. Every
/// caller-controlled value is escaped, and characters XML cannot carry at all
/// (control characters other than tab and line breaks) are dropped.
///
/// # Example
///
/// ```rust
/// use voxrelay::core::tts::SynthesisRequest;
/// use voxrelay::core::tts::azure::build_ssml;
///
/// let mut request = SynthesisRequest::new("1 < 2");
/// request.rate = -10;
/// let ssml = build_ssml(&request);
/// assert!(ssml.contains(r#"<prosody rate="-10%" pitch="0%">1 &lt; 2</prosody>"#));
/// ```
pub fn build_ssml(request: &SynthesisRequest) -> String {
    let voice = encode_xml(&request.voice_name);
    let style = encode_xml(&request.style);
    let text = encode_xml(&request.text);
    let rate = request.rate;
    let pitch = request.pitch;

    format!(
        r#"<speak xmlns="http://www.w3.org/2001/10/synthesis" xmlns:mstts="http://www.w3.org/2001/mstts" version="1.0" xml:lang="{SSML_LANGUAGE}"><voice name="{voice}"><mstts:express-as style="{style}" styledegree="1.0" role="default"><prosody rate="{rate}%" pitch="{pitch}%">{text}</prosody></mstts:express-as></voice></speak>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // AzureAudioEncoding Tests
    // =========================================================================

    #[test]
    fn test_every_format_parses_from_its_wire_name() {
        for format in AzureAudioEncoding::ALL {
            assert_eq!(format.as_str().parse::<AzureAudioEncoding>(), Ok(format));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive_and_rejects_unknown() {
        assert_eq!(
            "Riff-24khz-16bit-Mono-PCM".parse::<AzureAudioEncoding>(),
            Ok(AzureAudioEncoding::Riff24Khz16BitMonoPcm)
        );
        let err = "audio-1khz-mp3".parse::<AzureAudioEncoding>().unwrap_err();
        assert!(err.contains("audio-1khz-mp3"));
    }

    #[test]
    fn test_content_type_and_extension() {
        let cases = [
            (AzureAudioEncoding::Audio24Khz48KbitrateMonoMp3, "audio/mpeg", "mp3"),
            (AzureAudioEncoding::Riff16Khz16BitMonoPcm, "audio/wav", "wav"),
            (AzureAudioEncoding::Ogg48Khz16BitMonoOpus, "audio/ogg", "ogg"),
            (AzureAudioEncoding::Webm24Khz16BitMonoOpus, "audio/webm", "webm"),
            (AzureAudioEncoding::Raw24Khz16BitMonoPcm, "audio/pcm", "pcm"),
        ];
        for (format, content_type, ext) in cases {
            assert_eq!(format.content_type(), content_type, "{format}");
            assert_eq!(format.file_extension(), ext, "{format}");
        }
    }

    #[test]
    fn test_serde_uses_wire_name() {
        let json = serde_json::to_string(&AzureAudioEncoding::default()).unwrap();
        assert_eq!(json, "\"audio-24khz-48kbitrate-mono-mp3\"");
        let parsed: AzureAudioEncoding = serde_json::from_str("\"ogg-24khz-16bit-mono-opus\"").unwrap();
        assert_eq!(parsed, AzureAudioEncoding::Ogg24Khz16BitMonoOpus);
        assert!(serde_json::from_str::<AzureAudioEncoding>("\"nope\"").is_err());
    }

    // =========================================================================
    // SSML Tests
    // =========================================================================

    #[test]
    fn test_escape_xml_all_entities() {
        assert_eq!(escape_xml(r#"a&b<c>d"e'f"#), "a&amp;b&lt;c&gt;d&quot;e&apos;f");
        assert_eq!(escape_xml("你好"), "你好");
    }

    #[test]
    fn test_build_ssml_structure() {
        let request = SynthesisRequest {
            rate: 10,
            pitch: -5,
            style: "cheerful".to_string(),
            ..SynthesisRequest::new("你好。")
        };
        let ssml = build_ssml(&request);

        assert!(ssml.starts_with(r#"<speak xmlns="http://www.w3.org/2001/10/synthesis""#));
        assert!(ssml.contains(r#"xmlns:mstts="http://www.w3.org/2001/mstts""#));
        assert!(ssml.contains(r#"xml:lang="zh-CN""#));
        assert!(ssml.contains(r#"<voice name="zh-CN-XiaoxiaoNeural">"#));
        assert!(ssml.contains(
            r#"<mstts:express-as style="cheerful" styledegree="1.0" role="default">"#
        ));
        assert!(ssml.contains(r#"<prosody rate="10%" pitch="-5%">你好。</prosody>"#));
        assert!(ssml.ends_with("</voice></speak>"));
    }

    #[test]
    fn test_build_ssml_escapes_text_and_attributes() {
        let request = SynthesisRequest {
            voice_name: r#"bad"voice"#.to_string(),
            style: "a<b".to_string(),
            ..SynthesisRequest::new("</prosody><speak>&")
        };
        let ssml = build_ssml(&request);

        assert!(ssml.contains(r#"<voice name="bad&quot;voice">"#));
        assert!(ssml.contains(r#"style="a&lt;b""#));
        assert!(ssml.contains("&lt;/prosody&gt;&lt;speak&gt;&amp;"));
        assert_eq!(ssml.matches("<speak").count(), 1);
    }

    #[test]
    fn test_build_ssml_drops_characters_xml_cannot_carry() {
        let ssml = build_ssml(&SynthesisRequest::new("a\u{0}b\u{1b}c\td"));
        assert!(ssml.contains(">abc\td</prosody>"));
    }
}
