pub mod cache;
pub mod chunking;
pub mod classifier;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod fetch;
pub mod gemini_embeddings;
pub mod llm;
pub mod minilm;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod stores;
pub mod traits;

pub use cache::{digest_bytes, DocumentCache, DocumentKey, DEFAULT_CACHE_CAPACITY};
pub use chunking::{chunk_words, ChunkingConfig, DEFAULT_MAX_WORDS};
pub use classifier::classify_query;
pub use embeddings::{CharacterNgramEmbedder, Embedder, LazyEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{EmbedError, IngestError, LlmError, PipelineError, SearchError};
pub use extractor::{extract_page_texts, extract_text, PageText, PdfExtractor};
pub use fetch::DocumentFetcher;
pub use gemini_embeddings::{
    GeminiEmbedder, GeminiEmbedderConfig, DEFAULT_GEMINI_EMBEDDING_ENDPOINT,
    GEMINI_EMBEDDING_DIMENSIONS,
};
pub use llm::{build_prompt, GeminiClient, GeminiConfig, DEFAULT_GEMINI_ENDPOINT};
pub use minilm::{SentenceEmbedder, SentenceEmbedderConfig};
pub use models::{
    CacheKeyPolicy, Chunk, Document, Neighbor, PipelineOptions, QueryIntent, ReportFormat, Stage,
    PDF_MEDIA_TYPE,
};
pub use orchestrator::QueryPipeline;
pub use report::render_report;
pub use stores::FlatL2Index;
pub use traits::{TextGenerator, VectorIndex};
