use thiserror::Error;

/// Errors raised while detecting, loading or running a translation model.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("Could not detect the language of the input text")]
    Detection,

    #[error("Detected language '{0}' is not supported.")]
    UnsupportedLanguage(String),

    #[error("Failed to load model {model}: {source}")]
    ModelLoad {
        model: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Translation failed: {0}")]
    Translation(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TranslateError>;
