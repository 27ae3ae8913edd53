//! `consult`: collect responses to Dutch government consultations and group
//! near-duplicate submissions.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use consult_logging::{consult_error, LogDestination, LogSettings};

mod commands;
mod settings;

use settings::{Overrides, Settings};

#[derive(Parser)]
#[command(name = "consult")]
#[command(about = "Resumable consultation crawler with near-duplicate clustering")]
#[command(version)]
struct Cli {
    /// RON settings file; command-line flags take precedence
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log to the terminal only, without writing consult.log
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(flatten)]
    options: CommonOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct CommonOptions {
    /// Directory for state files, attachments and saved pages
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Site root
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Shingle length in words
    #[arg(short = 'n', long, global = true)]
    ngram: Option<usize>,

    /// Minimum Jaccard similarity for two records to be linked
    #[arg(short, long, global = true)]
    threshold: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect the responses to one consultation, resuming earlier runs
    Responses {
        /// Consultation name as it appears in its url
        consultation: String,

        /// Keep the respondent name field
        #[arg(long)]
        include_name: bool,

        /// Do not download attachments
        #[arg(long)]
        no_attachments: bool,

        /// Skip the clustering pass at the end
        #[arg(long)]
        no_clusters: bool,

        /// Completed listing pages between checkpoints
        #[arg(long)]
        checkpoint_interval: Option<usize>,
    },

    /// Collect metadata of all closed consultations
    Consultations {
        /// Keep a copy of every consultation page
        #[arg(long)]
        save_html: bool,

        /// Completed listing pages between checkpoints
        #[arg(long)]
        checkpoint_interval: Option<usize>,
    },

    /// Recompute clusters of a stored state without network access
    Cluster {
        /// State file written by `responses` or `consultations`
        state: PathBuf,
    },

    /// Write a stored state as CSV plus a JSON manifest
    Export {
        /// State file written by `responses` or `consultations`
        state: PathBuf,

        /// Output directory (defaults to the state file's directory)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let destination = if cli.no_log_file {
        LogDestination::Terminal
    } else {
        LogDestination::Both
    };
    consult_logging::initialize(&LogSettings {
        destination,
        ..LogSettings::default().with_verbosity(cli.verbose)
    });

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            consult_error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    let common = cli.options;
    let mut overrides = Overrides {
        data_dir: common.data_dir,
        base_url: common.base_url,
        n: common.ngram,
        threshold: common.threshold,
        ..Overrides::default()
    };

    match cli.command {
        Commands::Responses {
            consultation,
            include_name,
            no_attachments,
            no_clusters,
            checkpoint_interval,
        } => {
            overrides.include_name = include_name.then_some(true);
            overrides.download_attachments = no_attachments.then_some(false);
            overrides.compute_clusters = no_clusters.then_some(false);
            overrides.checkpoint_interval = checkpoint_interval;
            settings.apply(overrides);
            commands::responses(&settings, &consultation).await
        }
        Commands::Consultations {
            save_html,
            checkpoint_interval,
        } => {
            overrides.save_html = save_html.then_some(true);
            // Consultation pages carry metadata only.
            overrides.download_attachments = Some(false);
            overrides.compute_clusters = Some(false);
            overrides.checkpoint_interval = checkpoint_interval;
            settings.apply(overrides);
            commands::consultations(&settings).await
        }
        Commands::Cluster { state } => {
            settings.apply(overrides);
            commands::cluster(&settings, &state)
        }
        Commands::Export { state, out } => commands::export(&state, out.as_deref()),
    }
}
