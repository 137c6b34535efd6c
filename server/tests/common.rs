//! Common utilities for integration tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use server::config::ServerConfig;
use server::history::HistoryLog;
use server::pipeline::{PipelineOptions, TranslationService};
use server::{app, AppState};
use tempfile::TempDir;
use translate_core::{ModelKey, ModelLoader, Result, TranslateError, TranslationModel};
use tts_core::{AudioFormat, SpeechAudio, SpeechSynthesizer};

/// Records everything the fakes were asked to do.
#[derive(Default)]
pub struct Recorder {
    pub loads: Mutex<Vec<ModelKey>>,
    pub translations: Mutex<Vec<String>>,
    pub spoken: Mutex<Vec<(String, String)>>,
}

impl Recorder {
    pub fn loads(&self) -> Vec<ModelKey> {
        self.loads.lock().unwrap().clone()
    }

    pub fn translations(&self) -> Vec<String> {
        self.translations.lock().unwrap().clone()
    }
}

struct FakeModel {
    key: ModelKey,
    recorder: Arc<Recorder>,
}

impl TranslationModel for FakeModel {
    fn translate(&self, text: &str) -> Result<String> {
        self.recorder.translations.lock().unwrap().push(text.to_string());
        Ok(format!("[{}] {}", self.key, text))
    }
}

/// Loads a fake model for any pair whose source is supported.
struct FakeLoader {
    recorder: Arc<Recorder>,
}

impl ModelLoader for FakeLoader {
    fn load(&self, key: &ModelKey) -> Result<Arc<dyn TranslationModel>> {
        self.recorder.loads.lock().unwrap().push(key.clone());
        if !["en", "fr", "de", "es", "hi"].contains(&key.src.as_str()) {
            return Err(TranslateError::ModelLoad {
                model: format!("Xenova/opus-mt-{}-{}", key.src, key.tgt),
                source: anyhow::anyhow!("repository not found"),
            });
        }
        Ok(Arc::new(FakeModel {
            key: key.clone(),
            recorder: self.recorder.clone(),
        }))
    }
}

struct FakeSpeech {
    recorder: Arc<Recorder>,
    delay: Option<Duration>,
}

impl SpeechSynthesizer for FakeSpeech {
    fn synthesize(&self, text: &str, lang: &str) -> anyhow::Result<SpeechAudio> {
        self.recorder
            .spoken
            .lock()
            .unwrap()
            .push((text.to_string(), lang.to_string()));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        Ok(SpeechAudio {
            bytes: b"ID3fake-mp3".to_vec(),
            format: AudioFormat::Mp3,
        })
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub recorder: Arc<Recorder>,
    pub dir: TempDir,
}

impl TestApp {
    pub fn static_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("static")
    }

    pub fn history_path(&self) -> std::path::PathBuf {
        self.dir.path().join("translation_history.csv")
    }
}

/// Create a test app backed by fake model and speech backends.
pub fn create_test_app(strict_source_langs: bool) -> TestApp {
    create_test_app_with(strict_source_langs, None, 10)
}

/// Like [`create_test_app`], with slow speech and a custom request timeout.
pub fn create_test_app_with(
    strict_source_langs: bool,
    speech_delay: Option<Duration>,
    request_timeout_secs: u64,
) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let recorder = Arc::new(Recorder::default());

    let config = ServerConfig {
        static_dir: dir.path().join("static"),
        history_path: dir.path().join("translation_history.csv"),
        strict_source_langs,
        request_timeout_secs,
        ..ServerConfig::default()
    };

    let service = TranslationService::new(
        translate_core::ModelCache::new(Arc::new(FakeLoader {
            recorder: recorder.clone(),
        })),
        Arc::new(FakeSpeech {
            recorder: recorder.clone(),
            delay: speech_delay,
        }),
        HistoryLog::new(config.history_path.clone()),
        PipelineOptions {
            supported_langs: config.supported_langs.clone(),
            strict_source_langs,
            static_dir: config.static_dir.clone(),
            request_timeout: config.request_timeout(),
        },
    );

    let state = AppState::new(service, config);
    TestApp {
        router: app(state.clone()),
        state,
        recorder,
        dir,
    }
}

/// URL-encode a form body.
pub fn form_body(fields: &[(&str, &str)]) -> String {
    serde_urlencoded::to_string(fields).expect("form encoding")
}
