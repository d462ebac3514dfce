use crate::error::IngestError;
use crate::models::{Chunk, PipelineOptions};

pub const DEFAULT_MAX_WORDS: usize = 500;

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

impl From<&PipelineOptions> for ChunkingConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            max_words: value.max_words,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(self) -> Result<Self, IngestError> {
        if self.max_words == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_words must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

pub fn chunk_words(text: &str, config: ChunkingConfig) -> Result<Vec<Chunk>, IngestError> {
    let config = config.validate()?;

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::with_capacity(config.max_words);

    for word in text.split_whitespace() {
        current.push(word);
        if current.len() >= config.max_words {
            chunks.push(make_chunk(chunks.len(), &current));
            current.clear();
        }
    }

    if !current.is_empty() {
        chunks.push(make_chunk(chunks.len(), &current));
    }

    Ok(chunks)
}

fn make_chunk(index: usize, words: &[&str]) -> Chunk {
    Chunk {
        index,
        text: words.join(" "),
        word_count: words.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn six_hundred_fifty_words_make_three_chunks() {
        let chunks = chunk_words(&words(650), ChunkingConfig { max_words: 300 }).unwrap();
        let sizes: Vec<_> = chunks.iter().map(|chunk| chunk.word_count).collect();
        assert_eq!(sizes, vec![300, 300, 50]);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn chunks_reproduce_the_token_stream() {
        let text = "alpha  beta\n\ngamma\tdelta epsilon\u{a0}zeta eta  theta iota";
        for max_words in 1..=10 {
            let chunks = chunk_words(text, ChunkingConfig { max_words }).unwrap();
            let rejoined: Vec<&str> = chunks
                .iter()
                .flat_map(|chunk| chunk.text.split_whitespace())
                .collect();
            let original: Vec<&str> = text.split_whitespace().collect();
            assert_eq!(rejoined, original, "max_words={max_words}");

            let (last, rest) = chunks.split_last().unwrap();
            assert!(rest.iter().all(|chunk| chunk.word_count == max_words));
            assert!(last.word_count >= 1 && last.word_count <= max_words);
        }
    }

    #[test]
    fn exact_multiple_has_no_trailing_chunk() {
        let chunks = chunk_words(&words(600), ChunkingConfig { max_words: 300 }).unwrap();
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = words(1234);
        let config = ChunkingConfig { max_words: 97 };
        assert_eq!(
            chunk_words(&text, config).unwrap(),
            chunk_words(&text, config).unwrap()
        );
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(chunk_words("  \n\t ", ChunkingConfig::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn zero_max_words_is_rejected() {
        assert!(matches!(
            chunk_words("a b", ChunkingConfig { max_words: 0 }),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }
}
