//! Sentence-aware text chunking.
//!
//! The upstream service rejects very long SSML documents, so input text is
//! split into pieces of at most `max_chars` characters. Splits happen after
//! sentence terminators where possible; a single sentence longer than the
//! limit is hard-split into fixed-size pieces.
//!
//! All lengths are counted in `char`s, never bytes.

/// Characters that end a sentence. A split point falls right after each one.
pub const SENTENCE_TERMINATORS: [char; 5] = ['。', '！', '？', '；', '\n'];

/// Default upper bound on the characters in one chunk.
pub const DEFAULT_MAX_CHARS: usize = 1200;

/// Convert CRLF line endings to LF.
#[inline]
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Split `text` into ordered chunks of at most `max_chars` characters.
///
/// - Empty input yields no chunks.
/// - Sentences are packed greedily: a sentence joins the current chunk while
///   the result stays within the limit.
/// - A sentence longer than `max_chars` is emitted as consecutive pieces of
///   exactly `max_chars` characters, the last one possibly shorter. Packing
///   resumes with an empty buffer afterwards.
/// - Concatenating the chunks gives back the normalized input.
///
/// A `max_chars` of zero is treated as one.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let normalized = normalize_text(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(&normalized) {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len <= max_chars {
            current.push_str(sentence);
            current_len += sentence_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if sentence_len <= max_chars {
            current.push_str(sentence);
            current_len = sentence_len;
            continue;
        }

        let chars: Vec<char> = sentence.chars().collect();
        chunks.extend(chars.chunks(max_chars).map(|piece| piece.iter().collect::<String>()));
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Split text into sentences, each keeping its terminator.
fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(SENTENCE_TERMINATORS)
}
