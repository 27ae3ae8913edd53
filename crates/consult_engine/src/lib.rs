//! Consultation engine: HTTP fetching, site parsing, persistence, export and
//! the runner that executes collector effects.
mod attachments;
mod decode;
mod export;
mod fetch;
mod filename;
mod persist;
mod retry;
mod runner;
mod site;
mod source;
mod store;
mod types;

pub use attachments::{AttachmentExtractor, DownloadingExtractor, ExtractError};
pub use decode::{decode_text, media_type, DecodedText};
pub use export::{export_records, ExportError, ExportOptions, ExportSummary};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{attachment_filename, attachment_stem, html_snapshot_name};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use runner::{CollectorRunner, Pacing, RunError, RunStatus, RunSummary};
pub use site::{
    parse_consultation, parse_listing, parse_response, ConsultationPage, ResponsePage,
    DEFAULT_BASE_URL, SECTION_SEPARATOR,
};
pub use source::{CatalogueSource, ListingSource, ResponseSource};
pub use store::{RonStateStore, StateStore, StoreError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput};
