use crate::cache::{DocumentCache, DocumentKey};
use crate::chunking::{chunk_words, ChunkingConfig};
use crate::classifier::classify_query;
use crate::embeddings::Embedder;
use crate::error::{EmbedError, IngestError, PipelineError};
use crate::extractor::extract_text;
use crate::models::{Chunk, Document, PipelineOptions, QueryIntent, Stage};
use crate::traits::{TextGenerator, VectorIndex};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const CHUNK_SUMMARY_TASK: &str = "summarize";

struct PreparedDocument {
    chunks: Vec<Chunk>,
}

pub struct QueryPipeline<G, V>
where
    G: TextGenerator,
    V: VectorIndex,
{
    embedder: Arc<dyn Embedder>,
    // Held from reset through the last search of a request.
    index: Mutex<V>,
    generator: G,
    cache: DocumentCache,
    options: PipelineOptions,
}

impl<G, V> QueryPipeline<G, V>
where
    G: TextGenerator,
    V: VectorIndex + Send + Sync,
{
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: V,
        generator: G,
        options: PipelineOptions,
    ) -> Result<Self, EmbedError> {
        if index.dimension() != embedder.dimensions() {
            return Err(EmbedError::DimensionMismatch {
                expected: index.dimension(),
                actual: embedder.dimensions(),
            });
        }

        Ok(Self {
            embedder,
            index: Mutex::new(index),
            generator,
            cache: DocumentCache::default(),
            options,
        })
    }

    pub fn with_cache(mut self, cache: DocumentCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    pub async fn indexed_len(&self) -> usize {
        self.index.lock().await.len()
    }

    pub async fn answer_batch(
        &self,
        document: &Document,
        questions: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        let prepared = self.prepare(document)?;
        let vectors = self.embed_chunks(&prepared.chunks).await?;

        let mut index = self.index.lock().await;
        rebuild_index(&mut *index, &vectors)?;

        let mut answers = Vec::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            debug!(position, "answering question");
            answers.push(self.answer(&*index, &prepared, question, None).await?);
        }

        info!(questions = questions.len(), stage = %Stage::Done, "batch answered");
        Ok(answers)
    }

    pub async fn analyze(&self, document: &Document, query: &str) -> Result<String, PipelineError> {
        let key = DocumentKey::for_document(document, self.options.cache_key_policy);
        let prepared = self.prepare(document)?;

        let dimension = self.embedder.dimensions();
        let vectors = match self.cache.embeddings(&key, dimension, prepared.chunks.len()) {
            Some(vectors) => {
                debug!(key = key.as_str(), "embedding cache hit");
                vectors
            }
            None => {
                let vectors = self.embed_chunks(&prepared.chunks).await?;
                self.cache.put_embeddings(key.clone(), &vectors);
                vectors
            }
        };

        let mut index = self.index.lock().await;
        rebuild_index(&mut *index, &vectors)?;

        let insights = self.answer(&*index, &prepared, query, Some(&key)).await?;
        info!(stage = %Stage::Done, "analysis finished");
        Ok(insights)
    }

    pub async fn summarize_document(&self, text: &str) -> Result<String, PipelineError> {
        let chunks = chunk_words(text, ChunkingConfig::from(&self.options))?;
        self.summarize_chunks(&chunks).await
    }

    fn prepare(&self, document: &Document) -> Result<PreparedDocument, PipelineError> {
        debug!(stage = %Stage::Extracting, media_type = %document.media_type, bytes = document.bytes.len());
        let text = extract_text(document)?;
        if text.trim().is_empty() {
            return Err(IngestError::EmptyDocument.into());
        }

        debug!(stage = %Stage::Chunking, chars = text.len());
        let chunks = chunk_words(&text, ChunkingConfig::from(&self.options))?;
        info!(chunks = chunks.len(), max_words = self.options.max_words, "document chunked");

        Ok(PreparedDocument { chunks })
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, PipelineError> {
        debug!(stage = %Stage::Embedding, chunks = chunks.len());
        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(EmbedError::Inference(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            ))
            .into());
        }
        Ok(vectors)
    }

    async fn answer(
        &self,
        index: &V,
        prepared: &PreparedDocument,
        query: &str,
        cache_key: Option<&DocumentKey>,
    ) -> Result<String, PipelineError> {
        let intent = classify_query(query);
        debug!(stage = %Stage::Classifying, ?intent);

        let context = match intent {
            QueryIntent::Summary => self.document_summary(prepared, cache_key).await?,
            QueryIntent::Contextual => self.retrieve_context(index, prepared, query).await?,
        };

        debug!(stage = %Stage::Synthesizing, context_chars = context.len());
        Ok(self.generator.generate(&context, query).await?)
    }

    async fn document_summary(
        &self,
        prepared: &PreparedDocument,
        cache_key: Option<&DocumentKey>,
    ) -> Result<String, PipelineError> {
        if let Some(key) = cache_key {
            if let Some(summary) = self.cache.summary(key) {
                debug!(key = key.as_str(), "summary cache hit");
                return Ok(summary);
            }
        }

        let summary = self.summarize_chunks(&prepared.chunks).await?;
        if let Some(key) = cache_key {
            self.cache.put_summary(key.clone(), summary.clone());
        }
        Ok(summary)
    }

    async fn summarize_chunks(&self, chunks: &[Chunk]) -> Result<String, PipelineError> {
        let limit = self.options.summary_concurrency.max(1);
        debug!(stage = %Stage::Summarizing, chunks = chunks.len(), limit);

        let requests: Vec<_> = chunks
            .iter()
            .map(|chunk| self.generator.generate(&chunk.text, CHUNK_SUMMARY_TASK))
            .collect();
        let partials: Vec<String> = stream::iter(requests)
            .buffered(limit)
            .try_collect()
            .await?;

        Ok(partials
            .into_iter()
            .filter(|partial| !partial.is_empty())
            .collect::<Vec<_>>()
            .join(" "))
    }

    async fn retrieve_context(
        &self,
        index: &V,
        prepared: &PreparedDocument,
        query: &str,
    ) -> Result<String, PipelineError> {
        debug!(stage = %Stage::Retrieving, top_k = self.options.top_k);
        let query_vector = self.embedder.embed_one(query).await?;
        let neighbors = index.search(&query_vector, self.options.top_k)?;

        let texts = neighbors
            .iter()
            .map(|neighbor| {
                prepared
                    .chunks
                    .get(neighbor.ordinal)
                    .map(|chunk| chunk.text.as_str())
                    .ok_or(PipelineError::OrphanedNeighbor {
                        ordinal: neighbor.ordinal,
                        chunk_count: prepared.chunks.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(texts.join(" "))
    }
}

fn rebuild_index<V: VectorIndex>(index: &mut V, vectors: &[Vec<f32>]) -> Result<(), PipelineError> {
    debug!(stage = %Stage::Indexing, vectors = vectors.len());
    index.reset();
    index.add(vectors)?;
    Ok(())
}
