//! `vtc` command-line client for the GPU transcode worker.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use vtc_client::UploadSource;
use vtc_models::{fallback_catalog, JobId, PresetChoice, QualityLevel};
use vtc_orchestrator::logging::init_tracing;
use vtc_orchestrator::{
    select_preset, ChannelObserver, CleanupOutcome, JobEvent, OrchestratorConfig, TranscodeRequest,
    TranscodeWorkflow,
};

/// GPU transcode orchestration client
#[derive(Parser, Debug)]
#[command(name = "vtc", author, version, about, long_about = None)]
struct Cli {
    /// Expose Prometheus metrics on this address
    #[arg(long, global = true, value_name = "ADDR")]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit a video for transcoding
    Submit {
        /// Local video file
        file: PathBuf,
        /// Preset name, or "auto"
        #[arg(long, default_value = "auto")]
        preset: String,
        /// Local output path
        #[arg(long)]
        output: Option<String>,
        /// Source duration in minutes, used for local preset selection
        #[arg(long)]
        duration: Option<f64>,
        /// Skip thumbnail generation
        #[arg(long)]
        no_thumbnail: bool,
        /// Track the job until it finishes
        #[arg(long)]
        watch: bool,
    },
    /// Show a job snapshot
    Status { job_id: String },
    /// Track jobs until they finish
    Watch {
        #[arg(required = true)]
        job_ids: Vec<String>,
    },
    /// Show worker capacity
    System,
    /// List the worker's presets
    Presets,
    /// Check worker health
    Health,
    /// Queue administration
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
    /// Generate a thumbnail for a local video
    Thumbnail {
        path: String,
        /// Local thumbnail path
        #[arg(long)]
        output: Option<String>,
    },
    /// Delete a temporary upload
    Cleanup { path: String },
    /// Suggest a preset without contacting the worker
    Suggest {
        size_mb: f64,
        duration_min: f64,
        /// Detected quality: high, medium or low
        #[arg(long, value_parser = parse_quality)]
        quality: Option<QualityLevel>,
    },
}

#[derive(Subcommand, Debug)]
enum QueueAction {
    /// Show queue counts
    Stats,
    /// Remove all waiting jobs
    Clear,
}

fn parse_quality(raw: &str) -> Result<QualityLevel, String> {
    match raw.to_ascii_lowercase().as_str() {
        "high" => Ok(QualityLevel::High),
        "medium" => Ok(QualityLevel::Medium),
        "low" => Ok(QualityLevel::Low),
        "unknown" => Ok(QualityLevel::Unknown),
        other => Err(format!("unknown quality level: {}", other)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr {
        vtc_orchestrator::metrics::install_prometheus(addr)?;
        info!("Metrics listening on {}", addr);
    }

    let workflow = TranscodeWorkflow::from_config(OrchestratorConfig::from_env())
        .context("Failed to build transcode workflow")?;
    let client = workflow.client().clone();

    match cli.command {
        Commands::Submit {
            file,
            preset,
            output,
            duration,
            no_thumbnail,
            watch,
        } => {
            let preset: PresetChoice = preset.parse()?;
            let mut request =
                TranscodeRequest::new(UploadSource::from_path(file)).with_preset(preset);
            if let Some(output) = output {
                request = request.with_output_path(output);
            }
            if let Some(minutes) = duration {
                request = request.with_duration_minutes(minutes);
            }
            if no_thumbnail {
                request = request.without_thumbnail();
            }

            let handle = workflow.submit(request).await?;
            println!("job {}", handle.job_id());
            if !watch {
                return Ok(());
            }

            let mut progress = handle.subscribe();
            let printer = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let p = progress.borrow_and_update().clone();
                    println!("{} {} {}%", p.id, p.state, p.progress);
                }
            });

            let outcome = handle.wait().await;
            printer.abort();
            let outcome = outcome?;

            println!(
                "completed: output={} ratio={}",
                outcome.output_path.as_deref().unwrap_or("-"),
                outcome
                    .compression_ratio
                    .map(|r| format!("{:.2}", r))
                    .unwrap_or_else(|| "-".to_string())
            );
            if let Some(thumbnail) = outcome.thumbnail {
                match (thumbnail.url, thumbnail.error) {
                    (Some(url), _) => println!("thumbnail: {}", url),
                    (None, Some(error)) => println!("thumbnail failed: {}", error),
                    (None, None) => {}
                }
            }
            if let Some(cleanup) = outcome.cleanup {
                println!("cleanup: {:?}", cleanup);
            }
        }
        Commands::Status { job_id } => {
            let job = client.get_status(&JobId::from(job_id)).await?;
            print_json(&job)?;
        }
        Commands::Watch { job_ids } => {
            let total = job_ids.len();
            let ids = job_ids.into_iter().map(JobId::from).collect();
            let (observer, mut events) = ChannelObserver::new();
            let group = workflow
                .tracker()
                .watch_multiple_jobs(ids, Arc::new(observer))?;

            let mut failed = 0usize;
            while let Some(event) = events.recv().await {
                match event {
                    JobEvent::Progress(p) => println!("{} {} {}%", p.id, p.state, p.progress),
                    JobEvent::Completed(job) => {
                        println!("{} completed {}", job.id, job.output_path().unwrap_or("-"))
                    }
                    JobEvent::Failed(failure) => {
                        failed += 1;
                        println!("{} failed: {}", failure.job_id, failure.reason);
                    }
                }
            }
            group.wait().await;

            if failed > 0 {
                bail!("{} of {} jobs failed", failed, total);
            }
        }
        Commands::System => print_json(&client.get_system_status().await?)?,
        Commands::Presets => {
            let presets = match client.get_presets().await {
                Ok(presets) if !presets.is_empty() => presets,
                Ok(_) => fallback_catalog(),
                Err(e) => {
                    warn!("Preset catalog unavailable, showing built-in presets: {}", e);
                    fallback_catalog()
                }
            };
            print_json(&presets)?;
        }
        Commands::Health => {
            if !client.health_check().await {
                bail!("transcode service at {} is unhealthy", client.config().base_url);
            }
            println!("healthy");
        }
        Commands::Queue { action } => match action {
            QueueAction::Stats => print_json(&client.queue_stats().await?)?,
            QueueAction::Clear => println!("cleared {}", client.clear_queue().await?),
        },
        Commands::Thumbnail { path, output } => {
            let outcome = workflow.thumbnails().generate(&path, output.as_deref()).await;
            match (outcome.success, outcome.path, outcome.url, outcome.error) {
                (true, Some(path), url, _) => {
                    println!("{}", path);
                    if let Some(url) = url {
                        println!("{}", url);
                    }
                }
                (_, _, _, error) => bail!(
                    "thumbnail failed: {}",
                    error.unwrap_or_else(|| "unknown error".to_string())
                ),
            }
        }
        Commands::Cleanup { path } => match workflow.cleanup().delete(&path).await {
            CleanupOutcome::Deleted => println!("deleted"),
            CleanupOutcome::AlreadyGone => println!("already gone"),
            CleanupOutcome::Rejected { reason } => bail!("refused: {}", reason),
            CleanupOutcome::Failed { error } => bail!("cleanup failed: {}", error),
        },
        Commands::Suggest {
            size_mb,
            duration_min,
            quality,
        } => println!("{}", select_preset(size_mb, duration_min, quality)),
    }

    Ok(())
}
