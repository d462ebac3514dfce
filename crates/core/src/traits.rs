use crate::{LlmError, Neighbor, SearchError};
use async_trait::async_trait;

pub trait VectorIndex {
    fn dimension(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reset(&mut self);

    fn add(&mut self, vectors: &[Vec<f32>]) -> Result<(), SearchError>;

    fn search(&self, query_vector: &[f32], k: usize) -> Result<Vec<Neighbor>, SearchError>;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, context: &str, task: &str) -> Result<String, LlmError>;
}
