use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, Request, State},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::page::{self, PageView};
use crate::pipeline::{TranslationOutcome, TranslationRequest, TranslationService, STATIC_URL_PREFIX};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TranslationService>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(service: TranslationService, config: ServerConfig) -> Self {
        Self {
            service: Arc::new(service),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TranslateForm {
    input_text: String,
    target_lang: String,
    #[serde(default)]
    tone: String,
}

/// Build the router: the form page, health probe and static audio files.
pub fn app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);

    Router::new()
        .route("/", get(index).post(translate))
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .nest_service(STATIC_URL_PREFIX, static_files)
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    let header = axum::http::HeaderValue::from_str(&request_id).ok();
    if let Some(value) = header.clone() {
        request.headers_mut().insert("x-request-id", value);
    }
    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn index() -> Html<String> {
    Html(page::render(&PageView::default()))
}

pub async fn translate(
    State(state): State<AppState>,
    form: Result<Form<TranslateForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => return ApiError::InvalidInput(rejection.body_text()).into_response(),
    };

    let view = PageView {
        input_text: form.input_text.clone(),
        target_lang: form.target_lang.clone(),
        tone: form.tone.clone(),
        ..Default::default()
    };
    let req = TranslationRequest {
        input_text: form.input_text,
        target_lang: form.target_lang,
        tone: form.tone,
    };

    info!(
        target_lang = %req.target_lang,
        tone = %req.tone,
        chars = req.input_text.chars().count(),
        "translation request received"
    );

    match run_pipeline(&state, req).await {
        Ok(outcome) => {
            let view = PageView {
                result: outcome.translated_text,
                audio_file: Some(outcome.audio_url),
                audio_mime: Some(outcome.audio_mime),
                ..view
            };
            Html(page::render(&view)).into_response()
        }
        Err(e) => e.into_page(view),
    }
}

/// Run the blocking pipeline off the async runtime, bounded by the request timeout.
async fn run_pipeline(
    state: &AppState,
    req: TranslationRequest,
) -> Result<TranslationOutcome, ApiError> {
    let service = state.service.clone();
    let result = tokio::time::timeout(
        state.config.request_timeout(),
        tokio::task::spawn_blocking(move || service.run(&req)),
    )
    .await;

    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => {
            error!("Task join error: {join_err}");
            Err(ApiError::InternalError(format!("Task join error: {join_err}")))
        }
        Err(_) => Err(ApiError::Timeout(state.config.request_timeout().as_secs())),
    }
}
