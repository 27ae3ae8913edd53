/// Side effects requested by [`crate::update`]; executed in order by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Read the last persisted state (absent state is a valid empty start).
    LoadState,
    FetchListing { page: u32 },
    FetchItem {
        identifier: String,
        with_attachments: bool,
    },
    /// Persist the accumulated state atomically. Failure is fatal.
    WriteCheckpoint,
    /// Run the finalizing pass, then persist the final state.
    Finalize,
    /// End the run without finalizing.
    Stop { reason: StopReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    FetchFailures { consecutive: usize },
}
