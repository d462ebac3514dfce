use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("document is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("document has no extractable text")]
    EmptyDocument,

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid document url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("failed to fetch document from {url}: {details}")]
    Fetch {
        url: String,
        status: Option<u16>,
        details: String,
    },
}

impl IngestError {
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Fetch { status, .. } => status.is_some_and(|code| (400..500).contains(&code)),
            _ => true,
        }
    }
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("embedding inference failed: {0}")]
    Inference(String),

    #[error("embedding dimension {actual} != {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid embedding endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl EmbedError {
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Http(_))
    }
}

impl From<candle_core::Error> for EmbedError {
    fn from(error: candle_core::Error) -> Self {
        Self::Inference(error.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("vector dimension {actual} != index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("generation endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from generation endpoint: {0}")]
    InvalidResponse(String),

    #[error("invalid generation endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Document(#[from] IngestError),

    #[error(transparent)]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Index(#[from] SearchError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("index ordinal {ordinal} has no chunk (document has {chunk_count} chunks)")]
    OrphanedNeighbor { ordinal: usize, chunk_count: usize },
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
