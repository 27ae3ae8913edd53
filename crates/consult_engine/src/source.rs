use std::sync::Arc;

use consult_core::{ListingPage, Record};
use consult_logging::{consult_debug, consult_warn};
use url::Url;

use crate::attachments::AttachmentExtractor;
use crate::decode::decode_text;
use crate::fetch::Fetcher;
use crate::filename::{attachment_stem, html_snapshot_name};
use crate::persist::AtomicFileWriter;
use crate::site::{parse_consultation, parse_listing, parse_response, ConsultationPage, SECTION_SEPARATOR};
use crate::{FailureKind, FetchError};

/// A paginated listing of items on the site.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(&self, page: u32) -> Result<ListingPage, FetchError>;

    /// Fetches one listed item. `with_attachments` asks for attachment text
    /// extraction; attachment failures are recorded on the record, never returned.
    async fn fetch_item(&self, identifier: &str, with_attachments: bool) -> Result<Record, FetchError>;
}

async fn fetch_page(fetcher: &dyn Fetcher, url: &str) -> Result<String, FetchError> {
    let output = fetcher.fetch(url).await?;
    let decoded = decode_text(&output.bytes, output.metadata.content_type.as_deref());
    if decoded.lossy {
        consult_warn!(
            "{} is not valid {}; undecodable bytes were replaced",
            url,
            decoded.encoding_label
        );
    }
    Ok(decoded.text)
}

fn join(base: &Url, path: &str) -> Result<Url, FetchError> {
    base.join(path)
        .map_err(|err| FetchError::new(FailureKind::InvalidUrl, format!("{path}: {err}")))
}

/// Responses to one consultation, listed by date.
pub struct ResponseSource {
    fetcher: Arc<dyn Fetcher>,
    base: Url,
    consultation: String,
    extractor: Option<Arc<dyn AttachmentExtractor>>,
}

impl ResponseSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, base: Url, consultation: impl Into<String>) -> Self {
        Self {
            fetcher,
            base,
            consultation: consultation.into(),
            extractor: None,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn AttachmentExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn listing_url(&self, page: u32) -> Result<Url, FetchError> {
        join(
            &self.base,
            &format!("/{}/reacties/datum/{page}", self.consultation),
        )
    }

    async fn extract_attachments(&self, record: &mut Record) {
        let Some(extractor) = &self.extractor else {
            return;
        };
        let mut texts = Vec::new();
        let mut errors = Vec::new();
        for url in &record.attachments {
            match extractor.extract_text(url).await {
                Ok(text) => texts.push(text),
                Err(err) => {
                    consult_warn!("attachment {} of {}: {}", url, record.identifier, err);
                    errors.push(format!("{}: {err}", attachment_stem(url)));
                }
            }
        }
        if !texts.is_empty() {
            record.attachment_text = Some(texts.join(SECTION_SEPARATOR));
        }
        if !errors.is_empty() {
            record.attachment_error = Some(errors.join("; "));
        }
    }
}

#[async_trait::async_trait]
impl ListingSource for ResponseSource {
    async fn fetch_listing(&self, page: u32) -> Result<ListingPage, FetchError> {
        let url = self.listing_url(page)?;
        let html = fetch_page(self.fetcher.as_ref(), url.as_str()).await?;
        Ok(parse_listing(&html, &self.base))
    }

    async fn fetch_item(&self, identifier: &str, with_attachments: bool) -> Result<Record, FetchError> {
        let html = fetch_page(self.fetcher.as_ref(), identifier).await?;
        let parsed = parse_response(&html, &self.base);

        let mut record = Record::new(identifier);
        record.fields = parsed.fields;
        record.inline_text = parsed.inline_text;
        record.attachments = parsed.attachments;

        if with_attachments && !record.attachments.is_empty() {
            let stems: Vec<String> = record.attachments.iter().map(|u| attachment_stem(u)).collect();
            record.fields.insert("attachment".to_string(), stems.join(","));
            self.extract_attachments(&mut record).await;
        }
        consult_debug!(
            "response {}: {} fields, {} attachments",
            identifier,
            record.fields.len(),
            record.attachments.len()
        );
        Ok(record)
    }
}

/// The catalogue of closed consultations.
pub struct CatalogueSource {
    fetcher: Arc<dyn Fetcher>,
    base: Url,
    html_writer: Option<AtomicFileWriter>,
}

impl CatalogueSource {
    pub fn new(fetcher: Arc<dyn Fetcher>, base: Url) -> Self {
        Self {
            fetcher,
            base,
            html_writer: None,
        }
    }

    /// Store each fetched consultation page; the file name lands in `fields["html"]`.
    pub fn saving_html(mut self, writer: AtomicFileWriter) -> Self {
        self.html_writer = Some(writer);
        self
    }

    pub fn listing_url(&self, page: u32) -> Result<Url, FetchError> {
        join(&self.base, &format!("/geslotenconsultaties/{page}"))
    }
}

#[async_trait::async_trait]
impl ListingSource for CatalogueSource {
    async fn fetch_listing(&self, page: u32) -> Result<ListingPage, FetchError> {
        let url = self.listing_url(page)?;
        let html = fetch_page(self.fetcher.as_ref(), url.as_str()).await?;
        Ok(parse_listing(&html, &self.base))
    }

    async fn fetch_item(&self, identifier: &str, _with_attachments: bool) -> Result<Record, FetchError> {
        let html = fetch_page(self.fetcher.as_ref(), identifier).await?;
        let mut record = Record::new(identifier);

        match parse_consultation(&html) {
            ConsultationPage::Unavailable => {
                consult_warn!("{} answered with the maintenance page", identifier);
                return Ok(record);
            }
            ConsultationPage::Available { fields } => record.fields = fields,
        }

        if let Some(writer) = &self.html_writer {
            let name = html_snapshot_name(identifier, self.base.as_str());
            // Snapshot failures are not fatal.
            match writer.write(&name, &html) {
                Ok(_) => {
                    record.fields.insert("html".to_string(), name);
                }
                Err(err) => consult_warn!("could not save {}: {}", name, err),
            }
        }
        Ok(record)
    }
}
