use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, warn};

use server::config::{ServerConfig, TtsBackend};
use server::history::HistoryLog;
use server::pipeline::{PipelineOptions, TranslationService};
use server::{app, AppState};
use translate_core::{MarianOnnxLoader, ModelCache};
use tts_core::{GoogleTts, PiperVoices, SpeechSynthesizer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let _ = dotenv::dotenv();

    async_main().await
}

async fn async_main() -> anyhow::Result<()> {
    info!("Starting translation server...");

    let config = ServerConfig::from_env();

    let speech: Arc<dyn SpeechSynthesizer> = match config.tts_backend {
        TtsBackend::Google => {
            info!("Using Google TTS at {}", config.tts_endpoint);
            Arc::new(GoogleTts::with_endpoint(config.tts_endpoint.clone()))
        }
        TtsBackend::Piper => {
            let voices = PiperVoices::from_mapfile(&config.piper_map)?;
            info!("Loaded {} Piper voices from {}", voices.list_languages().len(), config.piper_map.display());
            Arc::new(voices)
        }
    };
    info!("Speech output format: {}", speech.format().mime_type());

    let loader = MarianOnnxLoader::new(
        config.model_repo_template.clone(),
        config.model_cache_dir.clone(),
    )
    .with_intra_threads(config.model_threads);
    let models = ModelCache::new(Arc::new(loader));

    if !config.strict_source_langs {
        warn!("STRICT_SOURCE_LANGS disabled: unsupported source languages fail at model load");
    }

    let service = TranslationService::new(
        models,
        speech,
        HistoryLog::new(config.history_path.clone()),
        PipelineOptions {
            supported_langs: config.supported_langs.clone(),
            strict_source_langs: config.strict_source_langs,
            static_dir: config.static_dir.clone(),
            request_timeout: config.request_timeout(),
        },
    );

    std::fs::create_dir_all(&config.static_dir)?;
    info!(
        "Server configuration loaded: port={}, supported={:?}, models={}, timeout={}s",
        config.port,
        config.supported_langs,
        config.model_repo_template,
        config.request_timeout_secs
    );

    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port).parse()?;
    let app = app(AppState::new(service, config));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT.")
    })?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
