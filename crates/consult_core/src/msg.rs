use crate::{CrawlState, Record};

/// One page of a paginated listing: the item identifiers it links to and the
/// page bound advertised by its pagination block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingPage {
    pub item_ids: Vec<String>,
    pub last_page: Option<u32>,
}

impl ListingPage {
    pub fn has_more(&self, page: u32) -> bool {
        self.last_page.is_some_and(|last| page < last)
    }
}

/// A fetch that still failed after the collaborator's retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub reason: String,
}

impl FetchFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin the run; only meaningful while loading.
    Start,
    /// Prior state was read (an empty state when nothing was persisted yet).
    StateLoaded(CrawlState),
    ListingFetched {
        page: u32,
        result: Result<ListingPage, FetchFailure>,
    },
    ItemFetched {
        identifier: String,
        result: Result<Record, FetchFailure>,
    },
    /// The user asked to stop; honoured before the next fetch.
    InterruptRequested,
    NoOp,
}
