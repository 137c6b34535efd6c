// Configuration for the server, read from the environment

use std::{path::PathBuf, time::Duration};

use translate_core::{DEFAULT_REPO_TEMPLATE, DEFAULT_SUPPORTED_LANGS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsBackend {
    Google,
    Piper,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub static_dir: PathBuf,
    pub history_path: PathBuf,
    pub supported_langs: Vec<String>,
    pub strict_source_langs: bool,
    pub model_repo_template: String,
    pub model_cache_dir: Option<PathBuf>,
    /// ONNX Runtime intra-op threads per model session
    pub model_threads: usize,
    pub tts_backend: TtsBackend,
    pub piper_map: PathBuf,
    pub tts_endpoint: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 5000,
            static_dir: PathBuf::from("static"),
            history_path: PathBuf::from("translation_history.csv"),
            supported_langs: DEFAULT_SUPPORTED_LANGS.iter().map(|s| s.to_string()).collect(),
            strict_source_langs: true,
            model_repo_template: DEFAULT_REPO_TEMPLATE.to_string(),
            model_cache_dir: None,
            model_threads: 2,
            tts_backend: TtsBackend::Google,
            piper_map: PathBuf::from("models/map.json"),
            tts_endpoint: tts_core::google::DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let supported_langs = std::env::var("SUPPORTED_LANGS")
            .ok()
            .map(|v| parse_list(&v))
            .filter(|langs| !langs.is_empty())
            .unwrap_or(defaults.supported_langs);

        let strict_source_langs = std::env::var("STRICT_SOURCE_LANGS")
            .ok()
            .and_then(|v| parse_bool(&v))
            .unwrap_or(defaults.strict_source_langs);

        let model_threads = std::env::var("MODEL_THREADS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.model_threads);

        let tts_backend = match std::env::var("TTS_BACKEND").as_deref() {
            Ok("piper") => TtsBackend::Piper,
            _ => TtsBackend::Google,
        };

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port,
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            history_path: std::env::var("HISTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.history_path),
            supported_langs,
            strict_source_langs,
            model_repo_template: std::env::var("MODEL_REPO_TEMPLATE")
                .unwrap_or(defaults.model_repo_template),
            model_cache_dir: std::env::var("MODEL_CACHE_DIR").ok().map(PathBuf::from),
            model_threads,
            tts_backend,
            piper_map: std::env::var("PIPER_MAP")
                .map(PathBuf::from)
                .unwrap_or(defaults.piper_map),
            tts_endpoint: std::env::var("TTS_ENDPOINT").unwrap_or(defaults.tts_endpoint),
            request_timeout_secs,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serve_port_5000_with_strict_sources() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.supported_langs, vec!["en", "fr", "de", "es", "hi"]);
        assert!(cfg.strict_source_langs);
        assert_eq!(cfg.history_path, PathBuf::from("translation_history.csv"));
        assert_eq!(cfg.tts_backend, TtsBackend::Google);
        assert_eq!(cfg.model_threads, 2);
    }

    #[test]
    fn parse_list_trims_and_drops_blanks() {
        assert_eq!(parse_list(" en, FR ,,de "), vec!["en", "fr", "de"]);
        assert!(parse_list(" , ").is_empty());
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
