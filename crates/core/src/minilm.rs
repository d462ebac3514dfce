//! all-MiniLM-L6-v2 from a local directory holding `config.json`,
//! `tokenizer.json` and `model.safetensors`.

use crate::embeddings::{Embedder, DEFAULT_EMBEDDING_DIMENSIONS};
use crate::error::EmbedError;
use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{debug, info};

pub const DEFAULT_BATCH_SIZE: usize = 32;
const MAX_SEQUENCE_LEN: usize = 256;
const PAD_TOKEN_ID: u32 = 0;

#[derive(Debug, Clone)]
pub struct SentenceEmbedderConfig {
    pub model_dir: PathBuf,
    pub batch_size: usize,
}

impl SentenceEmbedderConfig {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
    batch_size: usize,
}

impl SentenceEmbedder {
    pub fn load(config: &SentenceEmbedderConfig) -> Result<Self, EmbedError> {
        let device = Device::Cpu;
        let model_dir = &config.model_dir;
        info!(model_dir = %model_dir.display(), "loading sentence embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|error| {
            EmbedError::ModelLoad(format!(
                "failed to load tokenizer from {}: {error}",
                tokenizer_path.display()
            ))
        })?;

        let bert_config = read_config(&model_dir.join("config.json"))?;
        let dimensions = bert_config.hidden_size;

        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(EmbedError::ModelLoad(format!(
                "missing weights file {}",
                weights_path.display()
            )));
        }
        // SAFETY: the weights file is opened read-only and not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device) }
            .map_err(|error| EmbedError::ModelLoad(error.to_string()))?;
        let model = BertModel::load(vb, &bert_config)
            .map_err(|error| EmbedError::ModelLoad(error.to_string()))?;

        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions,
            batch_size: config.batch_size.max(1),
        })
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|error| EmbedError::Inference(format!("tokenization failed: {error}")))?;

        let seq_len = encodings
            .iter()
            .map(|encoding| encoding.get_ids().len().min(MAX_SEQUENCE_LEN))
            .max()
            .unwrap_or(0)
            .max(1);

        let mut ids = Vec::with_capacity(texts.len() * seq_len);
        let mut mask = Vec::with_capacity(texts.len() * seq_len);
        for encoding in &encodings {
            let len = encoding.get_ids().len().min(MAX_SEQUENCE_LEN);
            ids.extend_from_slice(&encoding.get_ids()[..len]);
            mask.extend_from_slice(&encoding.get_attention_mask()[..len]);
            ids.extend(std::iter::repeat(PAD_TOKEN_ID).take(seq_len - len));
            mask.extend(std::iter::repeat(0u32).take(seq_len - len));
        }

        let shape = (texts.len(), seq_len);
        let input_ids = Tensor::from_vec(ids, shape, &self.device)?;
        let attention_mask = Tensor::from_vec(mask, shape, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        Ok(pooled.to_vec2::<f32>()?)
    }
}

#[async_trait]
impl Embedder for SentenceEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_no, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = batch_no + 1, size = batch.len(), "embedding batch");
            vectors.extend(self.embed_batch(batch)?);
        }
        Ok(vectors)
    }
}

fn read_config(path: &Path) -> Result<BertConfig, EmbedError> {
    let raw = std::fs::read_to_string(path).map_err(|error| {
        EmbedError::ModelLoad(format!("failed to read {}: {error}", path.display()))
    })?;
    let config: BertConfig = serde_json::from_str(&raw).map_err(|error| {
        EmbedError::ModelLoad(format!("invalid model config {}: {error}", path.display()))
    })?;
    if config.hidden_size != DEFAULT_EMBEDDING_DIMENSIONS {
        debug!(
            hidden_size = config.hidden_size,
            "model width differs from the MiniLM default"
        );
    }
    Ok(config)
}

fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbedError> {
    let mask = attention_mask.to_dtype(hidden.dtype())?.unsqueeze(2)?;
    let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
    let lengths = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
    let mean = summed.broadcast_div(&lengths)?;
    let norm = mean
        .sqr()?
        .sum_keepdim(1)?
        .sqrt()?
        .clamp(1e-12, f64::MAX)?;
    Ok(mean.broadcast_div(&norm)?.to_dtype(DType::F32)?)
}
