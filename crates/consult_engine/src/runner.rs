use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use consult_core::{update, CollectorState, CollectorView, CrawlState, Effect, Msg, StopReason};
use consult_logging::{consult_debug, consult_info, consult_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::source::ListingSource;
use crate::store::{StateStore, StoreError};

/// Delay after every request, whatever its latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub item_delay: Duration,
    pub page_delay: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(100),
            page_delay: Duration::from_millis(500),
        }
    }
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            item_delay: Duration::ZERO,
            page_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("state store: {0}")]
    Store(#[from] StoreError),
    #[error("{consecutive} consecutive listing pages failed (last: {})", .last_failure.as_deref().unwrap_or("unknown"))]
    FetchFailures {
        consecutive: usize,
        last_failure: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub view: CollectorView,
    pub state: CrawlState,
}

/// Executes collector effects: one request at a time, paced, checkpointed
/// through the store, and stoppable through the cancellation token.
pub struct CollectorRunner {
    source: Arc<dyn ListingSource>,
    store: Arc<dyn StateStore>,
    pacing: Pacing,
    cancel: CancellationToken,
}

impl CollectorRunner {
    pub fn new(source: Arc<dyn ListingSource>, store: Arc<dyn StateStore>) -> Self {
        Self {
            source,
            store,
            pacing: Pacing::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, state: CollectorState) -> Result<RunSummary, RunError> {
        let (mut state, effects) = update(state, Msg::Start);
        let mut queue: VecDeque<Effect> = effects.into();
        let mut stop = None;

        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                Effect::LoadState => {
                    let loaded = self.store.load()?.unwrap_or_default();
                    consult_info!("resuming with {} known records", loaded.len());
                    Msg::StateLoaded(loaded)
                }
                Effect::FetchListing { page } => self.fetch_listing(page).await,
                Effect::FetchItem {
                    identifier,
                    with_attachments,
                } => self.fetch_item(identifier, with_attachments).await,
                Effect::WriteCheckpoint => {
                    self.store.save(state.crawl_state())?;
                    let view = state.view();
                    consult_info!(
                        "checkpoint after page {}: {} records",
                        view.page,
                        view.records
                    );
                    continue;
                }
                Effect::Finalize => {
                    if let Some(report) = state.finalize() {
                        consult_info!(
                            "{} records, {} edges, {} clusters ({} singletons, {} without text, largest {})",
                            report.records,
                            report.edges,
                            report.clusters,
                            report.singletons,
                            report.without_text,
                            report.largest
                        );
                    }
                    self.store.save(state.crawl_state())?;
                    continue;
                }
                Effect::Stop { reason } => {
                    stop = Some(reason);
                    continue;
                }
            };

            let (next, effects) = update(state, msg);
            state = next;
            queue.extend(effects);
        }

        if let Some(StopReason::FetchFailures { consecutive }) = stop {
            return Err(RunError::FetchFailures {
                consecutive,
                last_failure: state.last_failure().map(str::to_string),
            });
        }

        let status = match stop {
            Some(StopReason::Interrupted) => RunStatus::Interrupted,
            _ => RunStatus::Finished,
        };
        let view = state.view();
        Ok(RunSummary {
            status,
            view,
            state: state.into_crawl_state(),
        })
    }

    async fn fetch_listing(&self, page: u32) -> Msg {
        if self.cancel.is_cancelled() {
            return Msg::InterruptRequested;
        }
        let result = tokio::select! {
            result = self.source.fetch_listing(page) => result,
            _ = self.cancel.cancelled() => return Msg::InterruptRequested,
        };
        match &result {
            Ok(listing) => consult_info!(
                "page {}{}: {} items listed",
                page,
                listing.last_page.map(|last| format!("/{last}")).unwrap_or_default(),
                listing.item_ids.len()
            ),
            Err(err) => consult_warn!("listing page {} failed: {}", page, err),
        }
        self.pause(self.pacing.page_delay).await;
        Msg::ListingFetched {
            page,
            result: result.map_err(Into::into),
        }
    }

    async fn fetch_item(&self, identifier: String, with_attachments: bool) -> Msg {
        if self.cancel.is_cancelled() {
            return Msg::InterruptRequested;
        }
        let result = tokio::select! {
            result = self.source.fetch_item(&identifier, with_attachments) => result,
            _ = self.cancel.cancelled() => return Msg::InterruptRequested,
        };
        match &result {
            Ok(_) => consult_debug!("fetched {}", identifier),
            Err(err) => consult_warn!("item {} failed: {}", identifier, err),
        }
        self.pause(self.pacing.item_delay).await;
        Msg::ItemFetched {
            identifier,
            result: result.map_err(Into::into),
        }
    }

    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.cancel.cancelled() => {}
        }
    }
}
