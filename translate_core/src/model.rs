use std::{fmt, sync::Arc};

use crate::error::Result;

/// Default hub repository layout for opus-mt models exported to ONNX.
pub const DEFAULT_REPO_TEMPLATE: &str = "Xenova/opus-mt-{src}-{tgt}";

/// One translation direction, e.g. `en` -> `fr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    pub src: String,
    pub tgt: String,
}

impl ModelKey {
    pub fn new(src: impl Into<String>, tgt: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            tgt: tgt.into(),
        }
    }

    /// Fill `{src}` and `{tgt}` in a repository template.
    pub fn repo_id(&self, template: &str) -> String {
        template.replace("{src}", &self.src).replace("{tgt}", &self.tgt)
    }
}

impl fmt::Display for ModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.src, self.tgt)
    }
}

/// A loaded tokenizer + model for one direction.
pub trait TranslationModel: Send + Sync {
    fn translate(&self, text: &str) -> Result<String>;
}

/// Builds model pairs. Called by [`crate::ModelCache`] on a miss.
pub trait ModelLoader: Send + Sync {
    fn load(&self, key: &ModelKey) -> Result<Arc<dyn TranslationModel>>;
}
