use crate::error::IngestError;
use crate::models::Document;
use reqwest::Client;
use tracing::info;
use url::Url;

pub struct DocumentFetcher {
    client: Client,
}

impl Default for DocumentFetcher {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl DocumentFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn fetch_pdf(&self, url: &str) -> Result<Document, IngestError> {
        let parsed = Url::parse(url)?;
        let file_name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|error| fetch_error(url, None, error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_error(
                url,
                Some(status.as_u16()),
                format!("server returned {status}"),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|error| fetch_error(url, None, error.to_string()))?;
        info!(url = %url, bytes = bytes.len(), "document fetched");

        let document = Document::pdf(bytes.to_vec());
        Ok(match file_name {
            Some(name) => document.with_file_name(name),
            None => document,
        })
    }
}

fn fetch_error(url: &str, status: Option<u16>, details: String) -> IngestError {
    IngestError::Fetch {
        url: url.to_string(),
        status,
        details,
    }
}
