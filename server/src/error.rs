use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use translate_core::TranslateError;

use crate::page::{self, PageView};

/// Failures of the translation pipeline, one variant per class of cause.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Detected language '{0}' is not supported.")]
    UnsupportedLanguage(String),

    #[error("Could not detect the language of the input text")]
    Detection,

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Speech synthesis error: {0}")]
    Speech(#[source] anyhow::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::UnsupportedLanguage(_) | ApiError::Detection => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::ModelLoad(_) | ApiError::Speech(_) => StatusCode::BAD_GATEWAY,
            ApiError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Translation(_) | ApiError::Io(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable name, rendered on the result element.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::UnsupportedLanguage(_) => "unsupported_language",
            ApiError::Detection => "detection",
            ApiError::ModelLoad(_) => "model_load",
            ApiError::Translation(_) => "translation",
            ApiError::Speech(_) => "speech",
            ApiError::Io(_) => "io",
            ApiError::Timeout(_) => "timeout",
            ApiError::InternalError(_) => "internal",
        }
    }

    /// Render `view` with this error in the result area.
    pub fn into_page(self, mut view: PageView) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "{}", self);
        } else {
            tracing::warn!(kind = self.kind(), "{}", self);
        }
        view.result = format!("Error: {self}");
        view.error_kind = Some(self.kind());
        view.audio_file = None;
        (status, Html(page::render(&view))).into_response()
    }
}

impl From<TranslateError> for ApiError {
    fn from(e: TranslateError) -> Self {
        match e {
            TranslateError::Detection => ApiError::Detection,
            TranslateError::UnsupportedLanguage(lang) => ApiError::UnsupportedLanguage(lang),
            TranslateError::ModelLoad { model, source } => {
                ApiError::ModelLoad(format!("{model}: {source:#}"))
            }
            TranslateError::Translation(e) => ApiError::Translation(format!("{e:#}")),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_page(PageView::default())
    }
}
