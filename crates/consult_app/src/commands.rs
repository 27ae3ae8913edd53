use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use chrono::{SecondsFormat, Utc};
use consult_core::{CollectorState, CollectorView};
use consult_engine::{
    ensure_output_dir, export_records, AtomicFileWriter, CatalogueSource, CollectorRunner,
    DownloadingExtractor, ExportOptions, Fetcher, ListingSource, ReqwestFetcher, ResponseSource,
    RetryingFetcher, RonStateStore, RunStatus, StateStore,
};
use consult_logging::{consult_info, consult_warn};
use tokio_util::sync::CancellationToken;

use crate::settings::Settings;

/// Exit status of a run stopped with Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

pub async fn responses(settings: &Settings, consultation: &str) -> Result<ExitCode> {
    ensure!(
        !consultation.is_empty() && !consultation.contains(['/', '?', '#']),
        "consultation name must be the bare url segment, got {consultation:?}"
    );
    settings.validate()?;
    let state = CollectorState::new(settings.collector.clone())?;
    ensure_output_dir(&settings.data_dir)?;

    let fetcher: Arc<dyn Fetcher> = Arc::new(RetryingFetcher::new(
        ReqwestFetcher::new(settings.fetch_settings()),
        settings.retry_policy(),
    ));
    let mut source = ResponseSource::new(fetcher, settings.base_url()?, consultation);
    if settings.collector.download_attachments {
        let attachment_fetcher: Arc<dyn Fetcher> = Arc::new(RetryingFetcher::new(
            ReqwestFetcher::new(settings.fetch_settings().for_attachments()),
            settings.retry_policy(),
        ));
        let extractor = DownloadingExtractor::new(attachment_fetcher)
            .saving_to(AtomicFileWriter::new(settings.attachments_dir()));
        source = source.with_extractor(Arc::new(extractor));
    }

    let store = RonStateStore::new(settings.responses_state(consultation));
    consult_info!(
        "collecting responses to {} into {}",
        consultation,
        store.path().display()
    );
    collect(settings, Arc::new(source), store, state).await
}

pub async fn consultations(settings: &Settings) -> Result<ExitCode> {
    settings.validate()?;
    let state = CollectorState::new(settings.collector.clone())?;
    ensure_output_dir(&settings.data_dir)?;

    let fetcher: Arc<dyn Fetcher> = Arc::new(RetryingFetcher::new(
        ReqwestFetcher::new(settings.fetch_settings()),
        settings.retry_policy(),
    ));
    let mut source = CatalogueSource::new(fetcher, settings.base_url()?);
    if settings.save_html {
        source = source.saving_html(AtomicFileWriter::new(settings.html_dir()));
    }

    let store = RonStateStore::new(settings.consultations_state());
    consult_info!("collecting consultations into {}", store.path().display());
    collect(settings, Arc::new(source), store, state).await
}

async fn collect(
    settings: &Settings,
    source: Arc<dyn ListingSource>,
    store: RonStateStore,
    state: CollectorState,
) -> Result<ExitCode> {
    let path = store.path().to_path_buf();
    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let runner = CollectorRunner::new(source, Arc::new(store))
        .with_pacing(settings.pacing())
        .with_cancellation(cancel);
    let summary = runner
        .run(state)
        .await
        .with_context(|| format!("collecting into {}", path.display()))?;

    print_summary(&summary.view, &path);
    Ok(match summary.status {
        RunStatus::Finished => ExitCode::SUCCESS,
        RunStatus::Interrupted => {
            println!("Interrupted; run the same command again to resume.");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    })
}

fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            consult_warn!("interrupt received; saving progress before stopping");
            cancel.cancel();
        }
    });
}

pub fn cluster(settings: &Settings, state_path: &Path) -> Result<ExitCode> {
    let cluster_settings = settings.validate()?;
    let store = RonStateStore::new(state_path);
    let Some(mut state) = store.load()? else {
        bail!("no state file at {}", state_path.display());
    };

    let report = state.recluster(&cluster_settings);
    store.save(&state)?;

    println!(
        "{} records: {} clusters ({} singletons, {} without text), {} edges, largest {}",
        report.records,
        report.clusters,
        report.singletons,
        report.without_text,
        report.edges,
        report.largest
    );
    Ok(ExitCode::SUCCESS)
}

pub fn export(state_path: &Path, out: Option<&Path>) -> Result<ExitCode> {
    let store = RonStateStore::new(state_path);
    let Some(state) = store.load()? else {
        bail!("no state file at {}", state_path.display());
    };

    let out_dir = out.map(Path::to_path_buf).unwrap_or_else(|| {
        state_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    });
    let stem = state_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "records".to_string());
    let options = ExportOptions {
        output_filename: format!("{stem}.csv"),
        manifest_filename: Some(format!("{stem}.manifest.json")),
        exported_utc: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    };

    let summary = export_records(state.records(), &out_dir, &options)?;
    println!(
        "Exported {} records in {} clusters to {}",
        summary.record_count,
        summary.cluster_count,
        summary.output_path.display()
    );
    Ok(ExitCode::SUCCESS)
}

fn print_summary(view: &CollectorView, path: &Path) {
    let stats = &view.stats;
    println!(
        "Pages: {} visited, {} failed",
        stats.pages_fetched, stats.pages_failed
    );
    println!(
        "Items: {} new, {} already known, {} failed",
        stats.items_fetched, stats.items_skipped, stats.items_failed
    );
    println!(
        "Records: {} stored in {} ({} checkpoints)",
        view.records,
        path.display(),
        stats.checkpoints
    );
    if let Some(report) = &view.report {
        println!(
            "Clusters: {} ({} singletons, largest {})",
            report.clusters, report.singletons, report.largest
        );
    }
}
