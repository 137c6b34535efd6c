use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{Arc, RwLock},
    time::Instant,
};

use anyhow::Context;
use dashmap::DashMap;
use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{wav::encode_wav, AudioFormat, SpeechAudio, SpeechSynthesizer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceEntry {
    pub config: String,
    pub default_speaker: Option<i64>,
}

// Cached synthesizer and sample rate
struct CachedSynth {
    synth: Arc<RwLock<PiperSpeechSynthesizer>>,
    sample_rate: u32,
    last_accessed: Instant,
}

/// Local Piper voices keyed by locale (`fr_FR`, `de_DE`, ...), read from a
/// `map.json` voice map. Synthesizers are loaded lazily and kept in a small
/// LRU cache.
pub struct PiperVoices {
    voices: HashMap<String, VoiceEntry>,
    cache: DashMap<String, CachedSynth>,
    max_cache_size: usize,
}

impl PiperVoices {
    pub fn new(voices: HashMap<String, VoiceEntry>) -> Self {
        Self {
            voices,
            cache: DashMap::new(),
            max_cache_size: 8,
        }
    }

    /// Load from `models/map.json`.
    ///
    /// Each entry is either a config path string or
    /// `{ "config": "...", "default_speaker": 0 }`.
    pub fn from_mapfile<P: AsRef<Path>>(p: P) -> anyhow::Result<Self> {
        let text = fs::read_to_string(p.as_ref())
            .with_context(|| format!("Failed to load {}", p.as_ref().display()))?;
        let json: serde_json::Value =
            serde_json::from_str(&text).with_context(|| "map.json is not valid JSON")?;

        let obj = json
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("map.json must be a JSON object"))?;

        let mut voices = HashMap::new();
        for (lang, v) in obj {
            let entry = match v {
                serde_json::Value::String(path) => VoiceEntry {
                    config: path.clone(),
                    default_speaker: None,
                },
                serde_json::Value::Object(o) => VoiceEntry {
                    config: o
                        .get("config")
                        .and_then(|x| x.as_str())
                        .ok_or_else(|| anyhow::anyhow!("missing 'config' for key {}", lang))?
                        .to_string(),
                    default_speaker: o.get("default_speaker").and_then(|x| x.as_i64()),
                },
                _ => {
                    return Err(anyhow::anyhow!(
                        "invalid entry for key {} (expected string or object)",
                        lang
                    ))
                }
            };
            voices.insert(lang.clone(), entry);
        }

        Ok(Self::new(voices))
    }

    /// Sorted voice keys.
    pub fn list_languages(&self) -> Vec<String> {
        let mut langs: Vec<String> = self.voices.keys().cloned().collect();
        langs.sort();
        langs
    }

    /// Resolve a voice by exact key, or by language prefix (`fr` -> `fr_FR`).
    pub fn voice_for(&self, lang: &str) -> anyhow::Result<&VoiceEntry> {
        if let Some(v) = self.voices.get(lang) {
            return Ok(v);
        }
        let prefix = format!("{lang}_");
        self.list_languages()
            .into_iter()
            .find(|k| k.starts_with(&prefix))
            .and_then(|k| self.voices.get(&k))
            .ok_or_else(|| anyhow::anyhow!("No Piper voice for language '{lang}'"))
    }

    fn read_sample_rate<P: AsRef<Path>>(cfg_path: P) -> anyhow::Result<u32> {
        let text = fs::read_to_string(cfg_path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", cfg_path.as_ref().display()))?;
        let json: serde_json::Value =
            serde_json::from_str(&text).with_context(|| "Config file is not valid JSON")?;

        let sample_rate = json
            .get("audio")
            .and_then(|a| a.get("sample_rate"))
            .and_then(|sr| sr.as_u64())
            .ok_or_else(|| anyhow::anyhow!("Missing or invalid 'audio.sample_rate' in config"))?;

        Ok(sample_rate as u32)
    }

    fn get_or_create_synth(
        &self,
        cfg_path: &str,
    ) -> anyhow::Result<(Arc<RwLock<PiperSpeechSynthesizer>>, u32)> {
        if let Some(mut cached) = self.cache.get_mut(cfg_path) {
            cached.last_accessed = Instant::now();
            return Ok((cached.synth.clone(), cached.sample_rate));
        }

        let sample_rate = Self::read_sample_rate(cfg_path)?;
        let model = piper_rs::from_config_path(Path::new(cfg_path))
            .map_err(|e| anyhow::anyhow!("piper load error: {e}"))?;
        let synth = Arc::new(RwLock::new(PiperSpeechSynthesizer::new(model)?));
        info!(config = cfg_path, sample_rate, "Piper voice loaded");

        if self.cache.len() >= self.max_cache_size {
            let oldest = self
                .cache
                .iter()
                .min_by_key(|entry| entry.last_accessed)
                .map(|entry| entry.key().clone());
            if let Some(key) = oldest {
                self.cache.remove(&key);
            }
        }

        self.cache.insert(
            cfg_path.to_string(),
            CachedSynth {
                synth: synth.clone(),
                sample_rate,
                last_accessed: Instant::now(),
            },
        );
        Ok((synth, sample_rate))
    }

    /// Synthesize `text`, inserting silence at punctuation.
    pub fn synthesize_samples(&self, text: &str, lang: &str) -> anyhow::Result<(Vec<f32>, u32)> {
        let voice = self.voice_for(lang)?;
        let (synth_arc, sample_rate) = self.get_or_create_synth(&voice.config)?;
        let synth = synth_arc.read().map_err(|_| {
            anyhow::anyhow!("Synthesizer lock poisoned - this indicates a previous panic. Please restart the server.")
        })?;

        let chunks = split_text_with_pauses(text);
        let mut all_samples: Vec<f32> = Vec::new();

        for (i, chunk) in chunks.iter().enumerate() {
            let trimmed = chunk.trim();
            if trimmed.is_empty() {
                continue;
            }

            let iter: PiperSpeechStreamParallel = synth
                .synthesize_parallel(trimmed.to_string(), None)
                .map_err(|e| anyhow::anyhow!("piper synth error: {e}"))?;
            for part in iter {
                all_samples.extend(
                    part.map_err(|e| anyhow::anyhow!("chunk error: {e}"))?
                        .into_vec(),
                );
            }

            if i + 1 < chunks.len() {
                let pause_ms = pause_duration_ms(chunk);
                let pause_samples = (pause_ms as f32 / 1000.0 * sample_rate as f32) as usize;
                all_samples.extend(std::iter::repeat(0.0).take(pause_samples));
            }
        }

        debug!(samples = all_samples.len(), chunks = chunks.len(), "piper synthesis done");
        Ok((all_samples, sample_rate))
    }
}

impl SpeechSynthesizer for PiperVoices {
    fn synthesize(&self, text: &str, lang: &str) -> anyhow::Result<SpeechAudio> {
        if text.trim().is_empty() {
            anyhow::bail!("No text to speak");
        }
        let (samples, sample_rate) = self.synthesize_samples(text, lang)?;
        Ok(SpeechAudio {
            bytes: encode_wav(&samples, sample_rate)?,
            format: AudioFormat::Wav,
        })
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }
}

const ABBREVIATIONS: &[&str] = &[
    "Dr.", "Mr.", "Mrs.", "Ms.", "Prof.", "etc.", "vs.", "e.g.", "i.e.", "a.m.", "p.m.", "Inc.",
    "Ltd.", "Corp.", "M.", "Mme.", "Hr.", "Fr.", "Sr.", "Sra.",
];

/// Split text after sentence and clause punctuation.
///
/// Abbreviations and commas inside numbers (`1,000`) do not split.
fn split_text_with_pauses(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = text.chars().collect();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        current.push(c);

        let split = match c {
            '.' | '!' | '?' => !(c == '.' && ABBREVIATIONS.iter().any(|a| ends_with_word(&current, a))),
            ',' => {
                let digit_before = i > 0 && chars[i - 1].is_ascii_digit();
                let digit_after = i + 1 < chars.len() && chars[i + 1].is_ascii_digit();
                !(digit_before && digit_after)
            }
            ';' | ':' => true,
            _ => false,
        };

        if split {
            if i + 1 < chars.len() && chars[i + 1] == ' ' {
                current.push(' ');
                i += 1;
            }
            chunks.push(std::mem::take(&mut current));
        }
        i += 1;
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(text.to_string());
    }
    chunks
}

fn ends_with_word(current: &str, abbrev: &str) -> bool {
    current.ends_with(abbrev)
        && current[..current.len() - abbrev.len()]
            .chars()
            .last()
            .map_or(true, |c| c.is_whitespace())
}

fn pause_duration_ms(chunk: &str) -> u32 {
    let trimmed = chunk.trim_end();
    if trimmed.ends_with(['.', '!', '?']) {
        400
    } else if trimmed.ends_with([';', ':']) {
        250
    } else if trimmed.ends_with(',') {
        150
    } else {
        100
    }
}
