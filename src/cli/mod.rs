pub mod preview;

use std::path::{Path, PathBuf};

use ansi_term::Colour;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use preview::{print_checkpoint, print_preview};
use tracing::level_filters::LevelFilter;

use crate::{
    config::{Config, CONFIG_TEMPLATE_FILE, DEFAULT_CONFIG_FILE},
    errors::SyncError,
    sink::{toggl::TogglClient, SyncPacing, UploadEvent},
    source::arbtt::ArbttStats,
    storage::checkpoint::CheckpointStore,
    sync::{collect_pending, run_sync},
    utils::{
        clock::DefaultClock,
        dir::{create_application_default_path, default_checkpoint_path},
        logging::{enable_logging, SYNC_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "arbtt2toggl", version, long_about = None)]
#[command(about = "Uploads activity tracked by arbtt into Toggl Track", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Option<Commands>,
    #[arg(
        long,
        global = true,
        help = "Configuration file. By default secrets.yaml in the current directory"
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Checkpoint file. By default ~/.arbtt/last_run"
    )]
    checkpoint: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Upload everything recorded since the last sync. Default command")]
    Sync,
    #[command(about = "Show entries the next sync would upload without uploading them")]
    Preview,
    #[command(about = "Show when the last successful sync happened")]
    Checkpoint,
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        SYNC_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    let checkpoint = CheckpointStore::new(args.checkpoint.map_or_else(default_checkpoint_path, Ok)?);
    let config_path = args
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    match args.commands.unwrap_or(Commands::Sync) {
        Commands::Sync => {
            let config = load_config(&config_path).await?;
            let source = ArbttStats::from_config(&config)?;
            let uploader = TogglClient::new(&config);
            run_sync(
                &source,
                &uploader,
                &checkpoint,
                &DefaultClock,
                SyncPacing::default(),
                &print_upload_event,
            )
            .await
            .context("Sync failed, checkpoint was left unchanged")?;
            println!("{}", Colour::Green.paint("Done!"));
            Ok(())
        }
        Commands::Preview => {
            let config = load_config(&config_path).await?;
            let source = ArbttStats::from_config(&config)?;
            let pending = collect_pending(&source, &checkpoint, &DefaultClock).await?;
            print_preview(&config, &pending);
            Ok(())
        }
        Commands::Checkpoint => {
            print_checkpoint(checkpoint.path(), checkpoint.load_opt().await?);
            Ok(())
        }
    }
}

fn print_upload_event(event: UploadEvent) {
    match event {
        UploadEvent::Started { entries } => println!("Adding {entries} entries to Toggl..."),
        UploadEvent::RateLimited { backoff } => println!(
            "Rate limit exceeded. Sleeping for {} seconds.",
            backoff.as_secs_f64()
        ),
    }
}

fn missing_config_hint(path: &Path) -> String {
    format!(
        "Create it from the template: cp {CONFIG_TEMPLATE_FILE} {}",
        path.display()
    )
}

/// A missing configuration is the most common first-run problem, so it gets a hint on top of the
/// error. The error still travels up to `main`, which exits with a failure status.
async fn load_config(path: &Path) -> Result<Config> {
    let result = Config::load(path).await;
    if let Err(SyncError::ConfigMissing { path }) = &result {
        eprintln!(
            "{}",
            Colour::Red.paint(format!("Configuration file {} not found.", path.display()))
        );
        eprintln!("{}", missing_config_hint(path));
    }
    Ok(result?)
}
