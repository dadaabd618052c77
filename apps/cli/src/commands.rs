//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::info;
use url::Url;

use prospector_core::{ProgressHub, process_csv, run_pipeline};
use prospector_core::runner::{PipelineRequest, RunnerConfig};
use prospector_extractor::{HttpPageSource, PageSource, extract_from_page};
use prospector_shared::{
    AppConfig, BatchConfig, ProgressEvent, config_file_path, init_config, load_config,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Prospector — phone enrichment for collected business listings.
#[derive(Parser)]
#[command(
    name = "prospector",
    version,
    about = "Enrich collected business listings with phone numbers.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract the phone number from a single listing page.
    Url {
        /// Listing page URL.
        url: String,
    },

    /// Enrich every record in a collector CSV.
    Csv {
        /// Collector CSV file to enrich.
        file: PathBuf,

        /// Maximum extraction jobs in flight at once.
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// Per-job deadline in seconds.
        #[arg(long)]
        timeout: Option<u64>,

        /// Pacing delay per completed job, in milliseconds.
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Run the full pipeline: collect listings, then enrich them.
    Pipeline {
        /// Search area center latitude.
        #[arg(long)]
        lat: f64,

        /// Search area center longitude.
        #[arg(long)]
        lon: f64,

        /// Business keyword to search for.
        #[arg(short, long)]
        keyword: String,

        /// Search radius in kilometers.
        #[arg(short, long, default_value = "2.0")]
        radius: f64,

        /// Chain phone enrichment after collection.
        #[arg(long)]
        phones: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "prospector=info",
        1 => "prospector=debug",
        _ => "prospector=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Url { url } => cmd_url(&url).await,
        Command::Csv {
            file,
            concurrency,
            timeout,
            pacing_ms,
        } => cmd_csv(&file, concurrency, timeout, pacing_ms).await,
        Command::Pipeline {
            lat,
            lon,
            keyword,
            radius,
            phones,
        } => cmd_pipeline(lat, lon, &keyword, radius, phones).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

/// Merge config-file values with CLI flag overrides.
fn batch_config(
    config: &AppConfig,
    concurrency: Option<usize>,
    timeout: Option<u64>,
    pacing_ms: Option<u64>,
) -> BatchConfig {
    let mut batch = BatchConfig::from(config);
    if let Some(concurrency) = concurrency {
        batch.concurrency = concurrency;
    }
    if let Some(timeout) = timeout {
        batch.job_timeout_secs = timeout;
    }
    if let Some(pacing_ms) = pacing_ms {
        batch.pacing_ms = pacing_ms;
    }
    batch
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_url(url: &str) -> Result<()> {
    let config = load_config()?;
    let parsed = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    let deadline = std::time::Duration::from_secs(config.defaults.job_timeout_secs);

    info!(%parsed, "extracting phone from page");

    let source = HttpPageSource::new()?;
    let attempt = async {
        let mut session = source.session().await?;
        session.navigate(&parsed).await?;
        session.wait_stable().await?;
        Ok::<_, prospector_shared::ProspectorError>(extract_from_page(
            session.as_ref(),
            &config.locale,
        ))
    };

    let found = tokio::time::timeout(deadline, attempt)
        .await
        .map_err(|_| prospector_shared::ProspectorError::Timeout {
            elapsed_secs: deadline.as_secs(),
        })??;

    match found {
        Some(phone) => println!("{phone}"),
        None => println!("no phone number found"),
    }
    Ok(())
}

async fn cmd_csv(
    file: &PathBuf,
    concurrency: Option<usize>,
    timeout: Option<u64>,
    pacing_ms: Option<u64>,
) -> Result<()> {
    let config = load_config()?;
    let batch = batch_config(&config, concurrency, timeout, pacing_ms);

    info!(
        file = %file.display(),
        concurrency = batch.concurrency,
        "enriching collector CSV"
    );

    let source: Arc<dyn PageSource> = Arc::new(HttpPageSource::new()?);
    let hub = ProgressHub::new();
    let observer = spawn_progress_observer(&hub);

    let result = process_csv(file, source, &batch, &hub).await;

    // Closing the last sender ends the observer loop.
    drop(hub);
    let _ = observer.await;

    let (output, summary) = result?;

    println!();
    println!("  Enrichment complete!");
    println!("  Records:      {}", summary.total);
    println!("  With phone:   {}", summary.with_phone);
    println!("  Success rate: {:.1}%", summary.success_rate);
    println!("  Output:       {}", output.display());
    println!();

    Ok(())
}

async fn cmd_pipeline(lat: f64, lon: f64, keyword: &str, radius: f64, phones: bool) -> Result<()> {
    let config = load_config()?;
    let batch = BatchConfig::from(&config);

    let cwd = std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    let runner = RunnerConfig::from_app_config(&config, cwd);

    let request = PipelineRequest {
        latitude: lat,
        longitude: lon,
        keyword: keyword.to_string(),
        radius_km: radius,
        include_phones: phones,
    };

    info!(keyword, radius, phones, "starting pipeline run");

    let source: Arc<dyn PageSource> = Arc::new(HttpPageSource::new()?);
    let hub = ProgressHub::new();
    let observer = spawn_progress_observer(&hub);

    let result = run_pipeline(&request, &runner, source, &batch, &hub).await;

    drop(hub);
    let _ = observer.await;

    let outcome = result?;

    println!();
    println!("  Pipeline complete!");
    println!("  File:     {}", outcome.file_name);
    println!("  Places:   {}", outcome.place_count);
    println!("  Phones:   {}", outcome.phone_count);
    if let Some(summary) = &outcome.summary {
        println!("  Success:  {:.1}%", summary.success_rate);
    }
    println!("  Finished: {}", outcome.finished_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config file created: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let path = config_file_path()?;

    println!("# Config file: {}", path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress observer
// ---------------------------------------------------------------------------

/// Subscribe to the hub and drive an indicatif bar until the run ends.
fn spawn_progress_observer(hub: &ProgressHub) -> JoinHandle<()> {
    let mut rx = hub.subscribe();

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    bar.enable_steady_tick(std::time::Duration::from_millis(80));

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ProgressEvent::Progress {
                    current,
                    total,
                    percentage,
                    ..
                }) => {
                    bar.set_length(total as u64);
                    bar.set_position(current as u64);
                    bar.set_message(format!("{percentage}%"));
                }
                Ok(ProgressEvent::Log { message }) => {
                    bar.println(message);
                }
                Ok(ProgressEvent::Complete { .. }) => {
                    bar.finish_and_clear();
                    break;
                }
                Ok(ProgressEvent::Error { message }) => {
                    bar.abandon_with_message(message);
                    break;
                }
                // A lagged observer keeps going from the newest events.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    bar.finish_and_clear();
                    break;
                }
            }
        }
    })
}
