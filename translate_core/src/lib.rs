pub mod cache;
pub mod detect;
pub mod error;
pub mod marian;
pub mod model;
pub mod tone;

pub use cache::ModelCache;
pub use detect::{detect_language, ensure_supported, DEFAULT_SUPPORTED_LANGS};
pub use error::{Result, TranslateError};
pub use marian::{MarianOnnxLoader, MarianOnnxModel};
pub use model::{ModelKey, ModelLoader, TranslationModel, DEFAULT_REPO_TEMPLATE};
pub use tone::Tone;
