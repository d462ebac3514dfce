use async_trait::async_trait;
use docqa_core::{
    Document, DocumentFetcher, PipelineError, QueryPipeline, TextGenerator, VectorIndex,
};

/// What the HTTP layer needs from the question-answering pipeline.
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Fetches the PDF behind `document_url` and answers every question.
    async fn run_batch(
        &self,
        document_url: &str,
        questions: &[String],
    ) -> Result<Vec<String>, PipelineError>;

    /// Answers one query against an uploaded document.
    async fn analyze(&self, document: Document, query: &str) -> Result<String, PipelineError>;
}

pub struct DocumentService<G, V>
where
    G: TextGenerator,
    V: VectorIndex,
{
    pipeline: QueryPipeline<G, V>,
    fetcher: DocumentFetcher,
}

impl<G, V> DocumentService<G, V>
where
    G: TextGenerator,
    V: VectorIndex,
{
    pub fn new(pipeline: QueryPipeline<G, V>, fetcher: DocumentFetcher) -> Self {
        Self { pipeline, fetcher }
    }
}

#[async_trait]
impl<G, V> AnswerService for DocumentService<G, V>
where
    G: TextGenerator,
    V: VectorIndex + Send + Sync,
{
    async fn run_batch(
        &self,
        document_url: &str,
        questions: &[String],
    ) -> Result<Vec<String>, PipelineError> {
        let document = self.fetcher.fetch_pdf(document_url).await?;
        self.pipeline.answer_batch(&document, questions).await
    }

    async fn analyze(&self, document: Document, query: &str) -> Result<String, PipelineError> {
        self.pipeline.analyze(&document, query).await
    }
}
