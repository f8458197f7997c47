use std::path::PathBuf;

use anyhow::Context;
use camera_organizer::app::events::OrganizerEvent;
use camera_organizer::app::{CopyController, OrganizerState, ScanController};
use camera_organizer::config::{self, AppConfig};
use camera_organizer::core::{DateGroups, DateSource, JobState};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "camera-organizer", version, about = "Sort camera card dumps into date-based folder trees")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a source folder and list its date groups.
    Scan {
        /// Folder to scan recursively for camera media.
        source: PathBuf,
        /// Which timestamp drives the grouping.
        #[arg(long, value_enum)]
        date_source: Option<DateSourceArg>,
    },
    /// Scan a source folder and copy selected date groups into a target.
    Organize {
        /// Folder to scan recursively for camera media.
        source: PathBuf,
        /// Destination root the job folder is created under.
        target: PathBuf,
        /// Name of the copy job (and of its destination folder).
        #[arg(long)]
        name: Option<String>,
        /// Restrict the copy to these dates (default: all groups).
        #[arg(long, num_args = 1..)]
        dates: Vec<String>,
        /// Which timestamp drives the grouping.
        #[arg(long, value_enum)]
        date_source: Option<DateSourceArg>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DateSourceArg {
    /// Filesystem timestamps.
    Filesystem,
    /// Embedded capture metadata, falling back to filesystem timestamps.
    Metadata,
}

impl From<DateSourceArg> for DateSource {
    fn from(arg: DateSourceArg) -> Self {
        match arg {
            DateSourceArg::Filesystem => DateSource::Filesystem,
            DateSourceArg::Metadata => DateSource::Metadata,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut app_config = AppConfig::load().unwrap_or_default();
    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            source,
            date_source,
        } => {
            let policy = date_source.map(Into::into).unwrap_or(app_config.date_source);
            let groups = run_scan(source.clone(), policy).await?;

            let mut state = OrganizerState::new();
            state.apply_scan_results(source.clone(), groups);
            for date in state.date_groups() {
                println!("{date}  ({} files)", state.file_count(date));
                for path in state.image_files_for_preview(date, app_config.preview_count) {
                    println!("    {}", path.display());
                }
            }

            app_config.last_source_folder = source.to_string_lossy().into_owned();
            config::settings::save_config(&app_config).ok();
        }
        Command::Organize {
            source,
            target,
            name,
            dates,
            date_source,
        } => {
            let policy = date_source.map(Into::into).unwrap_or(app_config.date_source);
            let groups = run_scan(source.clone(), policy).await?;

            let mut state = OrganizerState::new();
            state.apply_scan_results(source.clone(), groups);

            let selected: Vec<String> = if dates.is_empty() {
                state.date_groups().iter().map(|d| d.to_string()).collect()
            } else {
                dates
            };

            let mut batch = Vec::new();
            let mut removed: Vec<(String, Vec<PathBuf>)> = Vec::new();
            for date in &selected {
                let files = state
                    .remove_group(date)
                    .with_context(|| format!("No date group '{date}' in {}", source.display()))?;
                batch.extend(files.iter().cloned());
                removed.push((date.clone(), files));
            }

            let job_name =
                name.unwrap_or_else(|| format!("import_{}", Local::now().format("%Y%m%d_%H%M%S")));
            let outcome = run_copy(&job_name, batch, target.clone()).await;

            if let Err(err) = outcome {
                // The copy did not finish; hand the groups back so a retry
                // sees them again.
                for (date, files) in removed {
                    state.restore_group(date, files);
                }
                return Err(err);
            }
            println!(
                "Copied {} date group(s) into {}",
                selected.len(),
                target.join(&job_name).display()
            );

            app_config.last_source_folder = source.to_string_lossy().into_owned();
            app_config.last_target_folder = target.to_string_lossy().into_owned();
            config::settings::save_config(&app_config).ok();
        }
    }
    Ok(())
}

/// Runs one scan to completion, surfacing progress through tracing.
async fn run_scan(source: PathBuf, date_source: DateSource) -> anyhow::Result<DateGroups> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let controller = ScanController::new(event_tx);
    controller.start_scan(source, date_source);

    while let Some(event) = event_rx.recv().await {
        match event {
            OrganizerEvent::ScanProgress { processed, total } => {
                tracing::info!("Scanning... {}/{}", processed, total);
            }
            OrganizerEvent::ScanCompleted { groups, .. } => return Ok(groups),
            OrganizerEvent::ScanFailed(message) => anyhow::bail!("Scan failed: {message}"),
            OrganizerEvent::ScanCancelled => anyhow::bail!("Scan was cancelled"),
            _ => {}
        }
    }
    anyhow::bail!("Event channel closed before the scan finished")
}

/// Runs one copy job to completion.
async fn run_copy(job_name: &str, files: Vec<PathBuf>, target: PathBuf) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let controller = CopyController::new(event_tx);
    let handle = controller
        .start_copy(job_name, files, target)
        .with_context(|| format!("Could not start copy job '{job_name}'"))?;

    while let Some(event) = event_rx.recv().await {
        match event {
            OrganizerEvent::CopyProgress {
                job,
                current,
                total,
            } => {
                tracing::info!("{}: {}/{}", job, current, total);
            }
            OrganizerEvent::CopyStateChanged { job, state } if state == JobState::Cancelled => {
                handle.join().await.ok();
                anyhow::bail!("Copy job '{job}' was cancelled");
            }
            OrganizerEvent::CopyCompleted { .. } => {
                handle.join().await.ok();
                return Ok(());
            }
            OrganizerEvent::CopyFailed { job, message } => {
                handle.join().await.ok();
                anyhow::bail!("Copy job '{job}' failed: {message}");
            }
            _ => {}
        }
    }
    anyhow::bail!("Event channel closed before the copy finished")
}
