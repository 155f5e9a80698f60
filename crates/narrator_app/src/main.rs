mod config;
mod document;
mod effects;
mod logging;
mod persistence;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use engine_logging::{engine_error, engine_info};
use narrator_engine::{EngineHandle, FileBlobStore};

use crate::config::AppConfig;
use crate::document::{HostDocument, JsonFileDocument};
use crate::effects::EffectRunner;
use crate::session::{Session, SessionOutcome};

/// Follow a narration job's progress and merge its results into a local document.
#[derive(Debug, Parser)]
#[command(name = "narrator", version, about)]
struct Cli {
    /// RON config file; defaults to ./narrator.ron when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend job to follow.
    #[arg(long)]
    job: Option<String>,
    /// JSON document that receives reconciled narration.
    #[arg(long)]
    document: Option<PathBuf>,
    #[arg(long, env = "NARRATOR_CHANNEL_URL")]
    channel_url: Option<String>,
    #[arg(long, env = "NARRATOR_MANIFEST_URL")]
    manifest_url: Option<String>,
    /// Keep following after the job reaches a terminal status.
    #[arg(long)]
    follow: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.channel_url {
        config.channel_url = url;
    }
    if let Some(url) = cli.manifest_url {
        config.manifest_base_url = url;
    }
    logging::initialize(config.log_destination, config.level_filter()?);

    let document: Option<Box<dyn HostDocument>> = match &cli.document {
        Some(path) => Some(Box::new(
            JsonFileDocument::open(path).with_context(|| format!("opening {path:?}"))?,
        )),
        None => None,
    };

    let engine =
        EngineHandle::new(config.engine_settings()).context("starting the IO engine")?;
    let store = FileBlobStore::new(config.state_dir.clone());
    let runner = EffectRunner::new(engine, document, Box::new(store), config.cache_key.clone());

    engine_info!(
        "narrator starting: job={:?} channel={}",
        cli.job,
        config.channel_url
    );
    let outcome = Session::new(runner, cli.follow).run(cli.job);
    engine_info!("narrator finished: {:?}", outcome);

    Ok(match outcome {
        SessionOutcome::Completed | SessionOutcome::ResumedFromCache => ExitCode::SUCCESS,
        SessionOutcome::NothingToTrack => {
            engine_error!("Nothing to do: pass --job, or --document with a cached identity");
            ExitCode::from(2)
        }
        SessionOutcome::JobEnded(_) | SessionOutcome::ManifestUnavailable => ExitCode::FAILURE,
    })
}
