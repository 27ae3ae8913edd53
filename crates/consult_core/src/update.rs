use crate::{CollectorState, Effect, ListingPage, Msg, Phase, StopReason};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages that do not fit the current phase are ignored, which keeps a late
/// or duplicated collaborator response from corrupting the run.
pub fn update(mut state: CollectorState, msg: Msg) -> (CollectorState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => match state.phase {
            Phase::Loading => vec![Effect::LoadState],
            _ => Vec::new(),
        },
        Msg::StateLoaded(crawl) => {
            if state.phase != Phase::Loading {
                return (state, Vec::new());
            }
            state.crawl = crawl;
            state.phase = Phase::Collecting;
            vec![Effect::FetchListing { page: state.page }]
        }
        Msg::ListingFetched { page, result } => {
            if state.phase != Phase::Collecting || page != state.page || !state.pending.is_empty()
            {
                return (state, Vec::new());
            }
            match result {
                Ok(listing) => on_listing(&mut state, listing),
                Err(failure) => {
                    state.stats.pages_failed += 1;
                    state.consecutive_failures += 1;
                    state.last_failure = Some(format!("page {page}: {}", failure.reason));
                    if state.consecutive_failures >= state.config.max_failed_batches {
                        state.phase = Phase::Failed;
                        let reason = StopReason::FetchFailures {
                            consecutive: state.consecutive_failures,
                        };
                        stop_with_checkpoint(&mut state, reason)
                    } else {
                        complete_batch(&mut state)
                    }
                }
            }
        }
        Msg::ItemFetched { identifier, result } => {
            if state.phase != Phase::Collecting {
                return (state, Vec::new());
            }
            match result {
                Ok(record) => {
                    let record = state.admit(identifier, record);
                    if state.crawl.insert(record) {
                        state.stats.items_fetched += 1;
                        state.dirty = true;
                    } else {
                        state.stats.items_skipped += 1;
                    }
                }
                Err(failure) => {
                    // Not recorded as known, so the next run fetches it again.
                    state.stats.items_failed += 1;
                    state.last_failure = Some(format!("{identifier}: {}", failure.reason));
                }
            }
            next_item_or_complete(&mut state)
        }
        Msg::InterruptRequested => match state.phase {
            Phase::Loading => {
                state.phase = Phase::Stopped;
                vec![Effect::Stop {
                    reason: StopReason::Interrupted,
                }]
            }
            Phase::Collecting => {
                // Items of the abandoned batch stay unknown and are re-fetched on resume.
                state.pending.clear();
                state.phase = Phase::Stopped;
                stop_with_checkpoint(&mut state, StopReason::Interrupted)
            }
            _ => Vec::new(),
        },
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn on_listing(state: &mut CollectorState, listing: ListingPage) -> Vec<Effect> {
    state.stats.pages_fetched += 1;
    state.consecutive_failures = 0;
    if state.last_page.is_none() {
        let advertised = listing.last_page.unwrap_or(state.page);
        state.last_page = Some(advertised.max(state.page));
    }

    let fresh = state
        .crawl
        .unknown(listing.item_ids.iter().map(String::as_str));
    state.stats.items_skipped += listing.item_ids.len() - fresh.len();
    state.pending.extend(fresh);
    next_item_or_complete(state)
}

fn next_item_or_complete(state: &mut CollectorState) -> Vec<Effect> {
    match state.pending.pop_front() {
        Some(identifier) => vec![Effect::FetchItem {
            identifier,
            with_attachments: state.config.download_attachments,
        }],
        None => complete_batch(state),
    }
}

fn complete_batch(state: &mut CollectorState) -> Vec<Effect> {
    state.batches += 1;
    let mut effects = Vec::with_capacity(2);
    if state.batches % state.config.checkpoint_interval == 0 {
        push_checkpoint(state, &mut effects);
    }

    // Without a bound the first page has not arrived yet; ask for it again.
    let Some(last_page) = state.last_page else {
        effects.push(Effect::FetchListing { page: state.page });
        return effects;
    };

    match state.page.checked_add(1).filter(|next| *next <= last_page) {
        Some(next) => {
            state.page = next;
            effects.push(Effect::FetchListing { page: next });
        }
        None => {
            state.phase = Phase::Finalizing;
            effects.push(Effect::Finalize);
        }
    }
    effects
}

fn stop_with_checkpoint(state: &mut CollectorState, reason: StopReason) -> Vec<Effect> {
    let mut effects = Vec::with_capacity(2);
    push_checkpoint(state, &mut effects);
    effects.push(Effect::Stop { reason });
    effects
}

fn push_checkpoint(state: &mut CollectorState, effects: &mut Vec<Effect>) {
    if state.dirty {
        state.dirty = false;
        state.stats.checkpoints += 1;
        effects.push(Effect::WriteCheckpoint);
    }
}
