use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use consult_core::{CollectorConfig, CollectorState, CrawlState, ListingPage, Phase, Record};
use consult_engine::{
    CollectorRunner, FailureKind, FetchError, ListingSource, Pacing, RunError, RunStatus,
    StateStore, StoreError,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn network_error() -> FetchError {
    // FetchError::new is crate-private; build through the public fields.
    FetchError {
        kind: FailureKind::Network,
        message: "connection reset".to_string(),
    }
}

struct FakeSource {
    pages: Vec<Vec<String>>,
    failing_pages: HashSet<u32>,
    requested: Mutex<Vec<String>>,
    cancel_after_items: Option<(usize, CancellationToken)>,
}

impl FakeSource {
    fn new(pages: &[&[&str]]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|ids| ids.iter().map(|id| id.to_string()).collect())
                .collect(),
            failing_pages: HashSet::new(),
            requested: Mutex::new(Vec::new()),
            cancel_after_items: None,
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ListingSource for FakeSource {
    async fn fetch_listing(&self, page: u32) -> Result<ListingPage, FetchError> {
        if self.failing_pages.contains(&page) {
            return Err(network_error());
        }
        Ok(ListingPage {
            item_ids: self.pages.get(page as usize - 1).cloned().unwrap_or_default(),
            last_page: Some(self.pages.len() as u32),
        })
    }

    async fn fetch_item(&self, identifier: &str, _with_attachments: bool) -> Result<Record, FetchError> {
        let mut requested = self.requested.lock().unwrap();
        requested.push(identifier.to_string());
        if let Some((after, token)) = &self.cancel_after_items {
            if requested.len() >= *after {
                token.cancel();
            }
        }
        Ok(Record::new(identifier)
            .with_field("Naam", "J. Jansen")
            .with_inline_text(format!("zienswijze over het voorstel nummer {identifier}")))
    }
}

#[derive(Default)]
struct MemoryStore {
    state: Mutex<Option<CrawlState>>,
    saves: Mutex<usize>,
    corrupt: bool,
    failing_saves: bool,
}

impl MemoryStore {
    fn with(records: &[&str]) -> Self {
        let state = CrawlState::from_records(records.iter().map(|id| Record::new(*id)).collect()).unwrap();
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    fn saved(&self) -> Option<CrawlState> {
        self.state.lock().unwrap().clone()
    }

    fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<CrawlState>, StoreError> {
        if self.corrupt {
            return Err(StoreError::Corrupt {
                path: "memory".into(),
                reason: "garbage".to_string(),
            });
        }
        Ok(self.saved())
    }

    fn save(&self, state: &CrawlState) -> Result<(), StoreError> {
        *self.saves.lock().unwrap() += 1;
        if self.failing_saves {
            return Err(StoreError::Serialize("disk full".to_string()));
        }
        *self.state.lock().unwrap() = Some(state.clone());
        Ok(())
    }
}

fn collector(config: CollectorConfig) -> CollectorState {
    CollectorState::new(config).unwrap()
}

fn identifiers(state: &CrawlState) -> Vec<String> {
    state.records().iter().map(|r| r.identifier.clone()).collect()
}

fn runner(source: Arc<FakeSource>, store: Arc<MemoryStore>) -> CollectorRunner {
    CollectorRunner::new(source, store).with_pacing(Pacing::none())
}

#[tokio::test]
async fn full_run_collects_every_page_and_clusters() {
    consult_logging::initialize_for_tests();
    let source = Arc::new(FakeSource::new(&[&["a", "b"], &["c"]]));
    let store = Arc::new(MemoryStore::default());

    let summary = runner(source.clone(), store.clone())
        .run(collector(CollectorConfig::default()))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Finished);
    assert_eq!(summary.view.phase, Phase::Finished);
    assert_eq!(source.requested(), vec!["a", "b", "c"]);

    let saved = store.saved().expect("final state persisted");
    assert_eq!(identifiers(&saved), vec!["a", "b", "c"]);
    assert!(saved.records().iter().all(|r| r.cluster_id.is_some()));
    assert!(saved.records().iter().all(|r| r.field("Naam").is_none()));
    assert_eq!(saved, summary.state);
}

#[tokio::test]
async fn resumed_run_skips_known_identifiers() {
    let source = Arc::new(FakeSource::new(&[&["a", "b"], &["c", "a"]]));
    let store = Arc::new(MemoryStore::with(&["a", "c"]));

    let summary = runner(source.clone(), store.clone())
        .run(collector(CollectorConfig::default()))
        .await
        .unwrap();

    assert_eq!(source.requested(), vec!["b"]);
    assert_eq!(summary.view.stats.items_skipped, 3);
    assert_eq!(identifiers(&store.saved().unwrap()), vec!["a", "c", "b"]);
}

#[tokio::test]
async fn checkpoints_follow_the_batch_interval() {
    let source = Arc::new(FakeSource::new(&[&["a"], &["b"], &["c"], &["d"], &["e"]]));
    let store = Arc::new(MemoryStore::default());
    let config = CollectorConfig {
        checkpoint_interval: 2,
        ..CollectorConfig::default()
    };

    let summary = runner(source, store.clone()).run(collector(config)).await.unwrap();

    // After batches 2 and 4, then the final write.
    assert_eq!(summary.view.stats.checkpoints, 2);
    assert_eq!(store.saves(), 3);
}

#[tokio::test]
async fn interrupt_checkpoints_and_next_run_finishes_the_rest() {
    let token = CancellationToken::new();
    let mut first = FakeSource::new(&[&["a", "b", "c"], &["d"]]);
    first.cancel_after_items = Some((2, token.clone()));
    let store = Arc::new(MemoryStore::default());

    let summary = runner(Arc::new(first), store.clone())
        .with_cancellation(token)
        .run(collector(CollectorConfig::default()))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Interrupted);
    assert_eq!(identifiers(&store.saved().unwrap()), vec!["a", "b"]);

    let second = Arc::new(FakeSource::new(&[&["a", "b", "c"], &["d"]]));
    let summary = runner(second.clone(), store.clone())
        .run(collector(CollectorConfig::default()))
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Finished);
    assert_eq!(second.requested(), vec!["c", "d"]);
    assert_eq!(identifiers(&store.saved().unwrap()), vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn repeated_listing_failures_fail_after_checkpoint() {
    let mut source = FakeSource::new(&[&["a", "b"], &["c"], &["d"], &["e"]]);
    source.failing_pages = [2, 3, 4].into_iter().collect();
    let store = Arc::new(MemoryStore::default());

    let err = runner(Arc::new(source), store.clone())
        .run(collector(CollectorConfig::default()))
        .await
        .unwrap_err();

    match err {
        RunError::FetchFailures {
            consecutive,
            last_failure,
        } => {
            assert_eq!(consecutive, 3);
            assert!(last_failure.unwrap().starts_with("page 4"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(identifiers(&store.saved().unwrap()), vec!["a", "b"]);
}

#[tokio::test]
async fn corrupt_state_is_fatal_and_not_overwritten() {
    let source = Arc::new(FakeSource::new(&[&["a"]]));
    let store = Arc::new(MemoryStore {
        corrupt: true,
        ..MemoryStore::default()
    });

    let err = runner(source.clone(), store.clone())
        .run(collector(CollectorConfig::default()))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Store(StoreError::Corrupt { .. })));
    assert_eq!(store.saves(), 0);
    assert!(source.requested().is_empty());
}

#[tokio::test]
async fn failed_checkpoint_write_stops_the_run() {
    let source = Arc::new(FakeSource::new(&[&["a"], &["b"], &["c"], &["d"]]));
    let store = Arc::new(MemoryStore {
        failing_saves: true,
        ..MemoryStore::default()
    });
    let config = CollectorConfig {
        checkpoint_interval: 1,
        ..CollectorConfig::default()
    };

    let err = runner(source.clone(), store.clone())
        .run(collector(config))
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::Store(StoreError::Serialize(_))), "{err:?}");
    assert_eq!(store.saves(), 1);
    assert_eq!(source.requested(), vec!["a"]);
    assert_eq!(store.saved(), None);
}

#[tokio::test]
async fn pacing_waits_after_every_page_and_item() {
    let source = Arc::new(FakeSource::new(&[&["a", "b"], &["c"]]));
    let store = Arc::new(MemoryStore::default());
    let pacing = Pacing {
        item_delay: Duration::from_millis(20),
        page_delay: Duration::from_millis(50),
    };

    let started = Instant::now();
    let summary = CollectorRunner::new(source.clone(), store)
        .with_pacing(pacing)
        .run(collector(CollectorConfig::default()))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(summary.status, RunStatus::Finished);
    assert_eq!(source.requested(), vec!["a", "b", "c"]);
    // Two listing pages and three items.
    let minimum = Duration::from_millis(2 * 50 + 3 * 20);
    assert!(elapsed >= minimum, "run took {elapsed:?}, expected at least {minimum:?}");
}
