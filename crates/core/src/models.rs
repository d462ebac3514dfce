use std::fmt;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub media_type: String,
    pub file_name: Option<String>,
}

impl Document {
    pub fn new(bytes: impl Into<Vec<u8>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
            file_name: None,
        }
    }

    pub fn pdf(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(bytes, PDF_MEDIA_TYPE)
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type.starts_with(PDF_MEDIA_TYPE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryIntent {
    Summary,
    Contextual,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKeyPolicy {
    #[default]
    ContentHash,
    FileName,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_words: usize,
    pub top_k: usize,
    pub summary_concurrency: usize,
    pub cache_key_policy: CacheKeyPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_words: 500,
            top_k: 3,
            summary_concurrency: 8,
            cache_key_policy: CacheKeyPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extracting,
    Chunking,
    Embedding,
    Indexing,
    Classifying,
    Summarizing,
    Retrieving,
    Synthesizing,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extracting => "extracting",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::Indexing => "indexing",
            Self::Classifying => "classifying",
            Self::Summarizing => "summarizing",
            Self::Retrieving => "retrieving",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Csv,
    Plain,
}

impl ReportFormat {
    pub fn parse_lenient(value: &str) -> Self {
        match value {
            "markdown" => Self::Markdown,
            "csv" => Self::Csv,
            _ => Self::Plain,
        }
    }
}
