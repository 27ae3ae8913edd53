use std::sync::Arc;

use consult_logging::consult_debug;
use scraper::Html;
use thiserror::Error;

use crate::decode::{decode_text, media_type};
use crate::fetch::Fetcher;
use crate::filename::attachment_filename;
use crate::persist::{AtomicFileWriter, PersistError};
use crate::FetchError;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("download failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not save attachment: {0}")]
    Persist(#[from] PersistError),
    #[error("no text extraction for {content_type}")]
    Unsupported { content_type: String },
    #[error("attachment contains no text")]
    Empty,
}

/// Recovers plain text from one attachment url.
#[async_trait::async_trait]
pub trait AttachmentExtractor: Send + Sync {
    async fn extract_text(&self, url: &str) -> Result<String, ExtractError>;
}

/// Downloads attachments, optionally keeps a copy on disk, and extracts text
/// from the formats it can read (plain text variants and HTML).
pub struct DownloadingExtractor {
    fetcher: Arc<dyn Fetcher>,
    writer: Option<AtomicFileWriter>,
}

impl DownloadingExtractor {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            writer: None,
        }
    }

    /// Keep every downloaded attachment as `{id}.{ext}` under the writer's directory.
    pub fn saving_to(mut self, writer: AtomicFileWriter) -> Self {
        self.writer = Some(writer);
        self
    }
}

#[async_trait::async_trait]
impl AttachmentExtractor for DownloadingExtractor {
    async fn extract_text(&self, url: &str) -> Result<String, ExtractError> {
        let output = self.fetcher.fetch(url).await?;
        let content_type = output
            .metadata
            .content_type
            .as_deref()
            .map(media_type)
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if let Some(writer) = &self.writer {
            let name = attachment_filename(url, extension_for(&content_type));
            let path = writer.write_bytes(&name, &output.bytes)?;
            consult_debug!("saved attachment {} to {}", url, path.display());
        }

        let text = match content_type.as_str() {
            "text/html" | "application/xhtml+xml" => {
                let decoded = decode_text(&output.bytes, output.metadata.content_type.as_deref());
                html_text(&decoded.text)
            }
            ct if ct.starts_with("text/") => {
                decode_text(&output.bytes, output.metadata.content_type.as_deref()).text
            }
            _ => return Err(ExtractError::Unsupported { content_type }),
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(text.to_string())
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        "text/html" | "application/xhtml+xml" => "html",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        "application/vnd.oasis.opendocument.text" => "odt",
        _ => "bin",
    }
}

fn html_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    doc.root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
