//! Marian (opus-mt) translation on ONNX Runtime.
//!
//! A model repository holds `tokenizer.json`, `config.json` and the encoder and
//! decoder graphs under `onnx/`. The encoder runs once per request; the decoder
//! is run greedily, one token at a time, until `eos_token_id` or `max_length`.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context;
use ndarray::{s, Array2, ArrayD, Ix3};
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::error::{Result, TranslateError};
use crate::model::{ModelKey, ModelLoader, TranslationModel, DEFAULT_REPO_TEMPLATE};

const ENCODER_FILE: &str = "onnx/encoder_model.onnx";
const DECODER_FILE: &str = "onnx/decoder_model.onnx";

/// Generation settings read from the repository's `config.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub decoder_start_token_id: u32,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_max_length() -> usize {
    512
}

impl GenerationConfig {
    pub fn from_file<P: AsRef<Path>>(p: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(p.as_ref())
            .with_context(|| format!("Failed to read {}", p.as_ref().display()))?;
        serde_json::from_str(&text).with_context(|| "config.json is not a valid Marian config")
    }
}

/// Loads Marian pairs from the Hugging Face hub (or its local cache).
#[derive(Debug, Clone)]
pub struct MarianOnnxLoader {
    repo_template: String,
    cache_dir: Option<PathBuf>,
    intra_threads: usize,
}

impl Default for MarianOnnxLoader {
    fn default() -> Self {
        Self {
            repo_template: DEFAULT_REPO_TEMPLATE.to_string(),
            cache_dir: None,
            intra_threads: 2,
        }
    }
}

impl MarianOnnxLoader {
    pub fn new(repo_template: impl Into<String>, cache_dir: Option<PathBuf>) -> Self {
        Self {
            repo_template: repo_template.into(),
            cache_dir,
            ..Default::default()
        }
    }

    pub fn with_intra_threads(mut self, n: usize) -> Self {
        self.intra_threads = n.max(1);
        self
    }

    fn fetch(&self, repo_id: &str) -> anyhow::Result<MarianFiles> {
        let mut builder = hf_hub::api::sync::ApiBuilder::new();
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        let api = builder.build()?;
        let repo = api.model(repo_id.to_string());

        Ok(MarianFiles {
            tokenizer: repo.get("tokenizer.json")?,
            config: repo.get("config.json")?,
            encoder: repo.get(ENCODER_FILE)?,
            decoder: repo.get(DECODER_FILE)?,
        })
    }

    fn session(&self, path: &Path) -> anyhow::Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.intra_threads)?
            .commit_from_file(path)?;
        Ok(session)
    }

    fn load_inner(&self, repo_id: &str) -> anyhow::Result<MarianOnnxModel> {
        let files = self.fetch(repo_id)?;
        debug!(repo = repo_id, encoder = %files.encoder.display(), "model files ready");

        let tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| anyhow::anyhow!("tokenizer load: {e}"))?;
        let generation = GenerationConfig::from_file(&files.config)?;
        let encoder = self.session(&files.encoder)?;
        let decoder = self.session(&files.decoder)?;

        Ok(MarianOnnxModel {
            tokenizer,
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            generation,
        })
    }
}

struct MarianFiles {
    tokenizer: PathBuf,
    config: PathBuf,
    encoder: PathBuf,
    decoder: PathBuf,
}

impl ModelLoader for MarianOnnxLoader {
    fn load(&self, key: &ModelKey) -> Result<Arc<dyn TranslationModel>> {
        let repo_id = key.repo_id(&self.repo_template);
        let model = self
            .load_inner(&repo_id)
            .map_err(|source| TranslateError::ModelLoad {
                model: repo_id.clone(),
                source,
            })?;
        info!(repo = %repo_id, "Marian model loaded");
        Ok(Arc::new(model))
    }
}

/// Tokenizer plus encoder/decoder sessions for one direction.
pub struct MarianOnnxModel {
    tokenizer: Tokenizer,
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    generation: GenerationConfig,
}

impl MarianOnnxModel {
    fn encode(&self, input_ids: &Array2<i64>, attention_mask: &Array2<i64>) -> anyhow::Result<ArrayD<f32>> {
        let encoder = self
            .encoder
            .lock()
            .map_err(|_| anyhow::anyhow!("encoder session lock poisoned"))?;
        let outputs = encoder.run(ort::inputs![
            "input_ids" => Tensor::from_array(input_ids.clone())?,
            "attention_mask" => Tensor::from_array(attention_mask.clone())?
        ]?)?;
        let hidden = outputs["last_hidden_state"]
            .try_extract_tensor::<f32>()?
            .to_owned();
        Ok(hidden)
    }

    fn next_token(
        &self,
        decoder: &Session,
        generated: &[i64],
        attention_mask: &Array2<i64>,
        hidden: &ArrayD<f32>,
    ) -> anyhow::Result<u32> {
        let steps = generated.len();
        let decoder_ids = Array2::from_shape_vec((1, steps), generated.to_vec())?;
        let outputs = decoder.run(ort::inputs![
            "encoder_attention_mask" => Tensor::from_array(attention_mask.clone())?,
            "input_ids" => Tensor::from_array(decoder_ids)?,
            "encoder_hidden_states" => Tensor::from_array(hidden.clone())?
        ]?)?;
        let logits = outputs["logits"]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()?;
        let last = logits.slice(s![0, steps - 1, ..]);

        let pad = self.generation.pad_token_id as usize;
        let (best, _) = last
            .iter()
            .enumerate()
            .filter(|(id, _)| *id != pad)
            .fold((0usize, f32::NEG_INFINITY), |acc, (id, &score)| {
                if score > acc.1 {
                    (id, score)
                } else {
                    acc
                }
            });
        Ok(best as u32)
    }

    fn generate(&self, text: &str) -> anyhow::Result<String> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        if ids.is_empty() {
            return Ok(String::new());
        }

        let len = ids.len();
        let input_ids = Array2::from_shape_vec((1, len), ids)?;
        let attention_mask = Array2::<i64>::ones((1, len));
        let hidden = self.encode(&input_ids, &attention_mask)?;

        let decoder = self
            .decoder
            .lock()
            .map_err(|_| anyhow::anyhow!("decoder session lock poisoned"))?;

        let mut generated = vec![i64::from(self.generation.decoder_start_token_id)];
        while generated.len() < self.generation.max_length {
            let next = self.next_token(&decoder, &generated, &attention_mask, &hidden)?;
            if next == self.generation.eos_token_id {
                break;
            }
            generated.push(i64::from(next));
        }

        let output_ids: Vec<u32> = generated[1..].iter().map(|&id| id as u32).collect();
        debug!(input_tokens = len, output_tokens = output_ids.len(), "greedy decode finished");
        self.tokenizer
            .decode(&output_ids, true)
            .map_err(|e| anyhow::anyhow!("detokenize: {e}"))
    }
}

impl TranslationModel for MarianOnnxModel {
    fn translate(&self, text: &str) -> Result<String> {
        Ok(self.generate(text)?)
    }
}
