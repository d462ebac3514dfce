use anyhow::Context;
use clap::{Args, ValueEnum};
use docqa_core::{
    CacheKeyPolicy, CharacterNgramEmbedder, DocumentCache, Embedder, FlatL2Index, GeminiClient,
    GeminiConfig, GeminiEmbedder, GeminiEmbedderConfig, LazyEmbedder, PipelineOptions,
    QueryPipeline, SentenceEmbedder, SentenceEmbedderConfig, DEFAULT_CACHE_CAPACITY,
    DEFAULT_EMBEDDING_DIMENSIONS, DEFAULT_GEMINI_EMBEDDING_ENDPOINT, DEFAULT_GEMINI_ENDPOINT,
    GEMINI_EMBEDDING_DIMENSIONS,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub type AppPipeline = QueryPipeline<GeminiClient, FlatL2Index>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbeddingBackend {
    /// all-MiniLM-L6-v2 loaded from a local model directory.
    Minilm,
    /// Hashed character trigrams; no model files needed.
    Ngram,
    /// Remote text-embedding-004 through the Gemini API.
    Gemini,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheKeyArg {
    ContentHash,
    FileName,
}

impl From<CacheKeyArg> for CacheKeyPolicy {
    fn from(value: CacheKeyArg) -> Self {
        match value {
            CacheKeyArg::ContentHash => Self::ContentHash,
            CacheKeyArg::FileName => Self::FileName,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// API key for the generation endpoint
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Generation endpoint URL
    #[arg(long, env = "GEMINI_API_URL", default_value = DEFAULT_GEMINI_ENDPOINT)]
    pub gemini_api_url: String,

    /// Output token budget per generation call
    #[arg(long, env = "LLM_MAX_OUTPUT_TOKENS", default_value = "150")]
    pub max_output_tokens: u32,

    /// Embedding backend
    #[arg(long, env = "EMBEDDING_BACKEND", value_enum, default_value = "minilm")]
    pub embedding_backend: EmbeddingBackend,

    /// Directory holding config.json, tokenizer.json and model.safetensors
    #[arg(long, env = "EMBEDDING_MODEL_DIR", default_value = "models/all-MiniLM-L6-v2")]
    pub embedding_model_dir: PathBuf,

    /// Texts per embedding forward pass
    #[arg(long, env = "EMBEDDING_BATCH_SIZE", default_value = "32")]
    pub embedding_batch_size: usize,

    /// Embedding endpoint for the gemini backend
    #[arg(long, env = "GEMINI_EMBEDDING_URL", default_value = DEFAULT_GEMINI_EMBEDDING_ENDPOINT)]
    pub gemini_embedding_url: String,

    /// Concurrent requests for the gemini embedding backend
    #[arg(long, env = "EMBEDDING_CONCURRENCY", default_value = "8")]
    pub embedding_concurrency: usize,

    /// Words per chunk
    #[arg(long, env = "CHUNK_MAX_WORDS", default_value = "500")]
    pub chunk_max_words: usize,

    /// Chunks retrieved per contextual question
    #[arg(long, env = "RETRIEVAL_TOP_K", default_value = "3")]
    pub top_k: usize,

    /// Concurrent chunk-summary calls
    #[arg(long, env = "SUMMARY_CONCURRENCY", default_value = "8")]
    pub summary_concurrency: usize,

    /// Documents remembered by the summary and embedding caches
    #[arg(long, env = "CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: usize,

    /// How cached documents are identified
    #[arg(long, env = "CACHE_KEY_POLICY", value_enum, default_value = "content-hash")]
    pub cache_key_policy: CacheKeyArg,
}

impl PipelineArgs {
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            max_words: self.chunk_max_words,
            top_k: self.top_k,
            summary_concurrency: self.summary_concurrency,
            cache_key_policy: self.cache_key_policy.into(),
        }
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            endpoint: self.gemini_api_url.clone(),
            api_key: self.gemini_api_key.clone(),
            max_output_tokens: self.max_output_tokens,
        }
    }

    pub fn embedder(&self) -> Arc<LazyEmbedder> {
        match self.embedding_backend {
            EmbeddingBackend::Minilm => {
                let config = SentenceEmbedderConfig {
                    model_dir: self.embedding_model_dir.clone(),
                    batch_size: self.embedding_batch_size,
                };
                Arc::new(LazyEmbedder::new(DEFAULT_EMBEDDING_DIMENSIONS, move || {
                    Ok(Arc::new(SentenceEmbedder::load(&config)?) as Arc<dyn Embedder>)
                }))
            }
            EmbeddingBackend::Ngram => Arc::new(LazyEmbedder::new(DEFAULT_EMBEDDING_DIMENSIONS, || {
                Ok(Arc::new(CharacterNgramEmbedder::default()) as Arc<dyn Embedder>)
            })),
            EmbeddingBackend::Gemini => {
                let config = GeminiEmbedderConfig {
                    endpoint: self.gemini_embedding_url.clone(),
                    api_key: self.gemini_api_key.clone(),
                    dimensions: GEMINI_EMBEDDING_DIMENSIONS,
                    concurrency: self.embedding_concurrency,
                };
                Arc::new(LazyEmbedder::new(GEMINI_EMBEDDING_DIMENSIONS, move || {
                    Ok(Arc::new(GeminiEmbedder::new(config.clone())?) as Arc<dyn Embedder>)
                }))
            }
        }
    }

    pub fn build_pipeline(&self, embedder: Arc<LazyEmbedder>) -> anyhow::Result<AppPipeline> {
        anyhow::ensure!(self.chunk_max_words > 0, "CHUNK_MAX_WORDS must be at least 1");
        anyhow::ensure!(self.top_k > 0, "RETRIEVAL_TOP_K must be at least 1");

        let dimension = embedder.dimensions();
        let pipeline = QueryPipeline::new(
            embedder,
            FlatL2Index::new(dimension),
            GeminiClient::new(self.gemini_config()).context("invalid GEMINI_API_URL")?,
            self.options(),
        )
        .context("embedder and index disagree on dimension")?
        .with_cache(DocumentCache::new(self.cache_capacity));

        info!(
            backend = ?self.embedding_backend,
            dimension,
            max_words = self.chunk_max_words,
            top_k = self.top_k,
            cache_capacity = self.cache_capacity,
            "pipeline configured"
        );
        Ok(pipeline)
    }
}
