use std::{sync::OnceLock, time::Duration};

use anyhow::Context;
use reqwest::{blocking::Client, header};
use tracing::debug;

use crate::{AudioFormat, SpeechAudio, SpeechSynthesizer};

pub const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Longest text the endpoint accepts in one request.
const MAX_CHUNK_CHARS: usize = 100;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Speech from Google Translate's public TTS endpoint (MP3).
///
/// The blocking HTTP client is built on first use, from the calling (blocking)
/// thread, never from inside the async runtime.
pub struct GoogleTts {
    client: OnceLock<Client>,
    endpoint: String,
}

impl Default for GoogleTts {
    fn default() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }
}

impl GoogleTts {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            client: OnceLock::new(),
            endpoint: endpoint.into(),
        }
    }

    fn client(&self) -> anyhow::Result<&Client> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        // A concurrent caller may have won the race; either client is fine
        let _ = self.client.set(client);
        self.client
            .get()
            .ok_or_else(|| anyhow::anyhow!("TTS client unavailable"))
    }

    fn fetch_chunk(&self, chunk: &str, lang: &str, idx: usize, total: usize) -> anyhow::Result<Vec<u8>> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();

        let bytes = self
            .client()?
            .get(&self.endpoint)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::REFERER, "https://translate.google.com/")
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .with_context(|| format!("TTS request failed for language '{lang}'"))?
            .error_for_status()?
            .bytes()?;
        Ok(bytes.to_vec())
    }
}

impl SpeechSynthesizer for GoogleTts {
    fn synthesize(&self, text: &str, lang: &str) -> anyhow::Result<SpeechAudio> {
        let chunks = split_chunks(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            anyhow::bail!("No text to speak");
        }

        // MP3 frames are self-delimiting, so the segments can be concatenated
        let mut bytes = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            bytes.extend(self.fetch_chunk(chunk, lang, idx, chunks.len())?);
        }
        debug!(chunks = chunks.len(), bytes = bytes.len(), "speech fetched");

        Ok(SpeechAudio {
            bytes,
            format: AudioFormat::Mp3,
        })
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }
}

/// Pack words into chunks of at most `max` characters.
///
/// Sentence punctuation closes a chunk early once it is at least half full, so
/// pauses fall on natural boundaries. Words longer than `max` are split.
pub fn split_chunks(text: &str, max: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;

        if current_len * 2 >= max && word.ends_with(['.', '!', '?', ';']) {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
