use std::{
    fs,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use tracing::{debug, info, warn};
use translate_core::{detect_language, ensure_supported, ModelCache, ModelKey, Tone};
use tts_core::{SpeechAudio, SpeechSynthesizer};

use crate::error::ApiError;
use crate::history::{HistoryLog, HistoryRecord};
use crate::validation::{validate_language_pair, validate_translation_request};

/// Public URL prefix under which the static directory is served.
pub const STATIC_URL_PREFIX: &str = "/static";

/// One form submission.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    pub input_text: String,
    pub target_lang: String,
    pub tone: String,
}

#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub translated_text: String,
    pub detected_lang: String,
    pub target_lang: String,
    pub tone: Tone,
    pub audio_url: String,
    pub audio_mime: &'static str,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub supported_langs: Vec<String>,
    /// Reject unsupported source languages before any model is loaded.
    pub strict_source_langs: bool,
    pub static_dir: PathBuf,
    /// Budget for one request. Nothing is written once it has passed.
    pub request_timeout: Duration,
}

/// Detect -> tone -> translate -> speak -> save audio -> log.
pub struct TranslationService {
    models: ModelCache,
    speech: Arc<dyn SpeechSynthesizer>,
    history: HistoryLog,
    options: PipelineOptions,
}

impl TranslationService {
    pub fn new(
        models: ModelCache,
        speech: Arc<dyn SpeechSynthesizer>,
        history: HistoryLog,
        options: PipelineOptions,
    ) -> Self {
        Self {
            models,
            speech,
            history,
            options,
        }
    }

    pub fn models(&self) -> &ModelCache {
        &self.models
    }

    /// Run one request to completion. Blocking.
    ///
    /// The caller stops waiting after `request_timeout`, but a blocking task
    /// cannot be cancelled, so the deadline is checked again before each
    /// side effect. A late request writes neither audio nor history.
    pub fn run(&self, req: &TranslationRequest) -> Result<TranslationOutcome, ApiError> {
        let deadline = Instant::now() + self.options.request_timeout;
        validate_translation_request(&req.input_text, &req.target_lang)?;

        let detected_lang = detect_language(&req.input_text)?;
        if self.options.strict_source_langs {
            ensure_supported(&detected_lang, &self.options.supported_langs)?;
        }
        validate_language_pair(&detected_lang, &req.target_lang)?;

        let tone = Tone::parse(&req.tone);
        let text = tone.apply(&req.input_text);

        let key = ModelKey::new(detected_lang.as_str(), req.target_lang.as_str());
        let model = self.models.get(&key)?;
        let translated_text = model.translate(&text)?;
        debug!(pair = %key, %tone, chars = translated_text.chars().count(), "translated");
        self.check_deadline(deadline)?;

        let audio = self
            .speech
            .synthesize(&translated_text, &req.target_lang)
            .map_err(ApiError::Speech)?;

        self.check_deadline(deadline)?;
        let audio_url = write_audio(&self.options.static_dir, &audio)?;

        self.check_deadline(deadline)?;
        self.history.append(&HistoryRecord::now(
            &text,
            &translated_text,
            &detected_lang,
            &req.target_lang,
            &req.tone,
        ))?;

        info!(pair = %key, audio = %audio_url, "translation complete");
        Ok(TranslationOutcome {
            translated_text,
            detected_lang,
            target_lang: req.target_lang.clone(),
            tone,
            audio_url,
            audio_mime: audio.format.mime_type(),
        })
    }

    fn check_deadline(&self, deadline: Instant) -> Result<(), ApiError> {
        if Instant::now() >= deadline {
            warn!("request deadline passed, discarding result");
            return Err(ApiError::Timeout(self.options.request_timeout.as_secs()));
        }
        Ok(())
    }
}

/// Write `output.<ext>` into `dir`, replacing the previous file, and return its URL.
///
/// The bytes go to a temp file first and are renamed into place, so a reader
/// never sees a partially written file.
pub fn write_audio(dir: &Path, audio: &SpeechAudio) -> io::Result<String> {
    fs::create_dir_all(dir)?;
    let file_name = format!("output.{}", audio.format.extension());
    let tmp = dir.join(format!(".{file_name}.tmp"));
    fs::write(&tmp, &audio.bytes)?;
    fs::rename(&tmp, dir.join(&file_name))?;

    // Version query so browsers do not replay the previous clip
    let version = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    Ok(format!("{STATIC_URL_PREFIX}/{file_name}?v={version}"))
}
