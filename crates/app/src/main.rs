mod api;
mod config;
mod service;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::PipelineArgs;
use docqa_core::{Document, DocumentFetcher, PDF_MEDIA_TYPE};
use service::DocumentService;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docqa", version, about = "Question answering over PDF and text documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        /// Interface to bind.
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,
        /// Port to bind.
        #[arg(long, env = "PORT", default_value = "8000")]
        port: u16,
    },
    /// Answer questions about one document and print the answers.
    Ask {
        /// Local file path or http(s) URL of a PDF.
        document: String,
        /// Question to answer; repeat for several.
        #[arg(long = "question", short = 'q', required = true)]
        questions: Vec<String>,
        /// Media type of a local file; guessed from the extension when omitted.
        #[arg(long)]
        media_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let embedder = cli.pipeline.embedder();

    match cli.command {
        Command::Serve { host, port } => {
            // Load the model before accepting traffic.
            embedder
                .get()
                .context("failed to load the embedding model")?;
            let pipeline = cli.pipeline.build_pipeline(embedder)?;
            let service = Arc::new(DocumentService::new(pipeline, DocumentFetcher::default()));
            let app = api::create_router(service);

            let listener = tokio::net::TcpListener::bind((host.as_str(), port))
                .await
                .with_context(|| format!("failed to bind {host}:{port}"))?;
            info!(
                version = env!("CARGO_PKG_VERSION"),
                address = %listener.local_addr()?,
                "listening"
            );

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("server error")?;
        }
        Command::Ask {
            document,
            questions,
            media_type,
        } => {
            let pipeline = cli.pipeline.build_pipeline(embedder)?;
            let document = if is_remote(&document) {
                DocumentFetcher::default().fetch_pdf(&document).await?
            } else {
                load_local_document(Path::new(&document), media_type).await?
            };

            let answers = pipeline.answer_batch(&document, &questions).await?;
            for (question, answer) in questions.iter().zip(&answers) {
                println!("Q: {question}");
                println!("A: {answer}");
                println!();
            }
        }
    }

    Ok(())
}

fn is_remote(document: &str) -> bool {
    document.starts_with("http://") || document.starts_with("https://")
}

async fn load_local_document(path: &Path, media_type: Option<String>) -> anyhow::Result<Document> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let media_type = media_type.unwrap_or_else(|| guess_media_type(path).to_string());

    let document = Document::new(bytes, media_type);
    Ok(match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => document.with_file_name(name),
        None => document,
    })
}

fn guess_media_type(path: &Path) -> &'static str {
    let is_pdf = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        PDF_MEDIA_TYPE
    } else {
        "text/plain"
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(%error, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_follows_the_extension() {
        assert_eq!(guess_media_type(Path::new("policy.PDF")), PDF_MEDIA_TYPE);
        assert_eq!(guess_media_type(Path::new("notes.txt")), "text/plain");
        assert_eq!(guess_media_type(Path::new("README")), "text/plain");
    }

    #[test]
    fn urls_are_fetched_not_read() {
        assert!(is_remote("https://example.org/a.pdf"));
        assert!(!is_remote("docs/a.pdf"));
    }

    #[test]
    fn ask_requires_a_question() {
        let parsed = Cli::try_parse_from(["docqa", "--gemini-api-key", "k", "ask", "a.pdf"]);
        assert!(parsed.is_err());
    }
}
