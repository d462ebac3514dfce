use crate::error::EmbedError;
use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::info;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbedError::Inference("model returned no vector".to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

type Loader = Box<dyn Fn() -> Result<Arc<dyn Embedder>, EmbedError> + Send + Sync>;

pub struct LazyEmbedder {
    dimensions: usize,
    loader: Loader,
    model: OnceLock<Arc<dyn Embedder>>,
}

impl LazyEmbedder {
    pub fn new<F>(dimensions: usize, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Embedder>, EmbedError> + Send + Sync + 'static,
    {
        Self {
            dimensions,
            loader: Box::new(loader),
            model: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<&Arc<dyn Embedder>, EmbedError> {
        if let Some(model) = self.model.get() {
            return Ok(model);
        }

        let loaded = (self.loader)()?;
        if loaded.dimensions() != self.dimensions {
            return Err(EmbedError::DimensionMismatch {
                expected: self.dimensions,
                actual: loaded.dimensions(),
            });
        }
        info!(dimensions = self.dimensions, "embedding model loaded");

        // A concurrent first call may have filled the cell already.
        let _ = self.model.set(loaded);
        self.model
            .get()
            .ok_or_else(|| EmbedError::ModelLoad("model cell left empty".to_string()))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.get().is_some()
    }
}

#[async_trait]
impl Embedder for LazyEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        let model = self.get()?.clone();
        model.embed(texts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn embedder_is_deterministic() {
        let embedder = CharacterNgramEmbedder::default();
        let text = vec!["Hydraulic pressure and flow".to_string()];
        assert_eq!(
            embedder.embed(&text).await.unwrap(),
            embedder.embed(&text).await.unwrap()
        );
    }

    #[tokio::test]
    async fn embedder_outputs_expected_length() {
        let embedder = CharacterNgramEmbedder { dimensions: 32 };
        let vector = embedder.embed_one("abc").await.unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let embedder = CharacterNgramEmbedder::default();
        let texts = vec!["first text".to_string(), "second text".to_string()];
        let batch = embedder.embed(&texts).await.unwrap();
        assert_eq!(batch[1], embedder.embed_one("second text").await.unwrap());
    }

    #[tokio::test]
    async fn lazy_embedder_loads_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let lazy = LazyEmbedder::new(16, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CharacterNgramEmbedder { dimensions: 16 }) as Arc<dyn Embedder>)
        });

        assert!(!lazy.is_loaded());
        lazy.embed_one("one").await.unwrap();
        lazy.embed_one("two").await.unwrap();
        assert!(lazy.is_loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lazy_embedder_rejects_wrong_dimension() {
        let lazy = LazyEmbedder::new(8, || {
            Ok(Arc::new(CharacterNgramEmbedder { dimensions: 16 }) as Arc<dyn Embedder>)
        });
        assert!(matches!(
            lazy.get(),
            Err(EmbedError::DimensionMismatch {
                expected: 8,
                actual: 16
            })
        ));
    }

    #[test]
    fn lazy_embedder_surfaces_load_failure() {
        let lazy = LazyEmbedder::new(8, || Err(EmbedError::ModelLoad("missing".to_string())));
        assert!(matches!(lazy.get(), Err(EmbedError::ModelLoad(_))));
        assert!(!lazy.is_loaded());
    }
}
