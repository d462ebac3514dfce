use crate::classifier::classify_query;
use crate::error::LlmError;
use crate::models::QueryIntent;
use crate::traits::TextGenerator;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use url::Url;

pub const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 150;
pub const PROMPT_CONTEXT_CHARS: usize = 2_000;

const ANSWER_POINTER: &str = "/candidates/0/content/parts/0/text";

pub fn build_prompt(context: &str, task: &str) -> String {
    let excerpt = truncate_chars(context, PROMPT_CONTEXT_CHARS);
    match classify_query(task) {
        QueryIntent::Summary => format!(
            "{} the following text concisely in at most 100 words:\n{excerpt}",
            capitalize(task)
        ),
        QueryIntent::Contextual => format!(
            "Answer the query based on the text in at most 100 words:\nText: {excerpt}\nQuery: {task}"
        ),
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn extract_answer(body: &Value) -> Option<&str> {
    body.pointer(ANSWER_POINTER).and_then(Value::as_str)
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub max_output_tokens: u32,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }
}

pub struct GeminiClient {
    url: Url,
    max_output_tokens: u32,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, LlmError> {
        let url = Url::parse_with_params(&config.endpoint, &[("key", &config.api_key)])?;
        Ok(Self {
            url,
            max_output_tokens: config.max_output_tokens,
            client: Client::new(),
        })
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "maxOutputTokens": self.max_output_tokens },
        });

        let response = self
            .client
            .post(self.url.clone())
            .header("content-type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "generation endpoint error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|error| LlmError::InvalidResponse(error.to_string()))?;

        match extract_answer(&body) {
            Some(text) => {
                debug!(chars = text.len(), "generation completed");
                Ok(text.to_string())
            }
            None => {
                warn!("generation response has no candidate text; answering with an empty string");
                Ok(String::new())
            }
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, context: &str, task: &str) -> Result<String, LlmError> {
        self.complete(&build_prompt(context, task)).await
    }
}
