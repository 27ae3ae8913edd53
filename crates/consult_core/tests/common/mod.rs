#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};

use consult_core::{
    update, CollectorState, CrawlState, Effect, FetchFailure, ListingPage, Msg, Record, StopReason,
};

pub fn init_logging() {
    consult_logging::initialize_for_tests();
}

/// In-memory stand-in for the consultation site.
#[derive(Debug, Default, Clone)]
pub struct FakeSite {
    pub pages: Vec<Vec<String>>,
    pub texts: HashMap<String, String>,
    pub failing_pages: HashSet<u32>,
    pub failing_items: HashSet<String>,
}

impl FakeSite {
    /// `pages[i]` lists the identifiers on page `i + 1`; every item's text is
    /// "submission about <id>" unless overridden in `texts`.
    pub fn new(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|ids| ids.iter().map(|id| id.to_string()).collect())
                .collect(),
            ..Self::default()
        }
    }

    pub fn listing(&self, page: u32) -> Result<ListingPage, FetchFailure> {
        if self.failing_pages.contains(&page) {
            return Err(FetchFailure::new("connection reset"));
        }
        let item_ids = self
            .pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default();
        Ok(ListingPage {
            item_ids,
            last_page: Some(self.pages.len() as u32),
        })
    }

    pub fn item(&self, identifier: &str) -> Result<Record, FetchFailure> {
        if self.failing_items.contains(identifier) {
            return Err(FetchFailure::new("timeout"));
        }
        let text = self
            .texts
            .get(identifier)
            .cloned()
            .unwrap_or_else(|| format!("submission about {identifier}"));
        Ok(Record::new(identifier)
            .with_field("Naam", "J. Jansen")
            .with_field("Datum", "1 maart 2021")
            .with_inline_text(text))
    }
}

#[derive(Debug)]
pub struct DriveOutcome {
    pub state: CollectorState,
    pub item_requests: Vec<String>,
    pub listing_requests: Vec<u32>,
    pub checkpoints: usize,
    pub stop: Option<StopReason>,
    pub finalized: bool,
}

/// Executes effects the way the engine runner does, against `site` and an
/// in-memory store. `interrupt_after_items` raises an interrupt before the
/// next fetch once that many items were requested.
pub fn drive(
    state: CollectorState,
    site: &FakeSite,
    store: &mut Option<CrawlState>,
    interrupt_after_items: Option<usize>,
) -> DriveOutcome {
    let mut item_requests = Vec::new();
    let mut listing_requests = Vec::new();
    let mut checkpoints = 0;
    let mut stop = None;
    let mut finalized = false;

    let (mut state, effects) = update(state, Msg::Start);
    let mut queue: VecDeque<Effect> = effects.into();
    while let Some(effect) = queue.pop_front() {
        let interrupt = interrupt_after_items.is_some_and(|limit| item_requests.len() >= limit);
        let msg = match effect {
            Effect::LoadState => Msg::StateLoaded(store.clone().unwrap_or_default()),
            Effect::FetchListing { .. } | Effect::FetchItem { .. } if interrupt => {
                Msg::InterruptRequested
            }
            Effect::FetchListing { page } => {
                listing_requests.push(page);
                Msg::ListingFetched {
                    page,
                    result: site.listing(page),
                }
            }
            Effect::FetchItem { identifier, .. } => {
                item_requests.push(identifier.clone());
                Msg::ItemFetched {
                    result: site.item(&identifier),
                    identifier,
                }
            }
            Effect::WriteCheckpoint => {
                *store = Some(state.crawl_state().clone());
                checkpoints += 1;
                continue;
            }
            Effect::Finalize => {
                state.finalize();
                *store = Some(state.crawl_state().clone());
                finalized = true;
                break;
            }
            Effect::Stop { reason } => {
                stop = Some(reason);
                break;
            }
        };
        let (next, effects) = update(state, msg);
        state = next;
        queue.extend(effects);
    }

    DriveOutcome {
        state,
        item_requests,
        listing_requests,
        checkpoints,
        stop,
        finalized,
    }
}

pub fn identifiers(state: &CrawlState) -> Vec<String> {
    state
        .records()
        .iter()
        .map(|r| r.identifier.clone())
        .collect()
}
