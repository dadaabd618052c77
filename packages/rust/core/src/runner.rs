//! End-to-end pipeline runs: collector process plus optional enrichment.
//!
//! The upstream listing collector is an external executable. The runner
//! starts it, streams its stdout to observers, enforces a wall-clock limit
//! over the whole run, picks up the CSV it produced, and optionally chains
//! the phone-enrichment batch under whatever time remains.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{Instant, timeout};
use tracing::{info, instrument, warn};

use prospector_extractor::PageSource;
use prospector_shared::{AppConfig, BatchConfig, BatchSummary, ProspectorError, Result};

use crate::batch::process_csv;
use crate::broadcast::ProgressHub;
use crate::records::load_records;

/// Prefix the collector uses for its output files.
const COLLECTOR_FILE_PREFIX: &str = "prospects_";

/// Parameters for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub keyword: String,
    pub radius_km: f64,
    /// Chain phone enrichment after collection.
    pub include_phones: bool,
}

/// Runner settings, merged from config plus the working directory the
/// collector runs in and writes its CSV to.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub collector_cmd: String,
    pub collect_timeout: Duration,
    pub full_timeout: Duration,
    pub workdir: PathBuf,
}

impl RunnerConfig {
    pub fn from_app_config(config: &AppConfig, workdir: PathBuf) -> Self {
        Self {
            collector_cmd: config.pipeline.collector_cmd.clone(),
            collect_timeout: Duration::from_secs(config.pipeline.collect_timeout_mins * 60),
            full_timeout: Duration::from_secs(config.pipeline.full_timeout_mins * 60),
            workdir,
        }
    }
}

/// Final report of a completed pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub file_name: String,
    pub file_path: PathBuf,
    /// Listings collected.
    pub place_count: usize,
    /// Listings with any phone number, original or extracted.
    pub phone_count: usize,
    pub finished_at: DateTime<Utc>,
    /// Present only when enrichment ran.
    pub summary: Option<BatchSummary>,
}

/// Run the collector and, when requested, the enrichment batch.
///
/// One wall-clock limit covers the whole run: the collection limit for a
/// collection-only run, the longer full limit when enrichment is included.
/// An elapsed limit kills the collector and fails with a timeout distinct
/// from an ordinary process failure.
#[instrument(skip_all, fields(keyword = %request.keyword, phones = request.include_phones))]
pub async fn run_pipeline(
    request: &PipelineRequest,
    config: &RunnerConfig,
    source: Arc<dyn PageSource>,
    batch: &BatchConfig,
    hub: &ProgressHub,
) -> Result<PipelineOutcome> {
    let limit = if request.include_phones {
        config.full_timeout
    } else {
        config.collect_timeout
    };
    let limit_mins = limit.as_secs() / 60;
    let started = Instant::now();

    let run = async {
        run_collector(request, config, limit, limit_mins, hub).await?;

        let collected = find_latest_csv(&config.workdir, &request.keyword)?;
        info!(file = %collected.display(), "collector output located");

        let (final_path, summary) = if request.include_phones {
            let remaining = limit.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Err(ProspectorError::ProcessTimeout { limit_mins });
            }
            match timeout(remaining, process_csv(&collected, source, batch, hub)).await {
                Ok(done) => {
                    let (path, summary) = done?;
                    (path, Some(summary))
                }
                Err(_) => return Err(ProspectorError::ProcessTimeout { limit_mins }),
            }
        } else {
            (collected, None)
        };

        let records = load_records(&final_path)?;
        let phone_count = records.iter().filter(|r| r.has_phone()).count();

        let file_name = final_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        Ok(PipelineOutcome {
            file_name,
            file_path: final_path,
            place_count: records.len(),
            phone_count,
            finished_at: Utc::now(),
            summary,
        })
    };

    match run.await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            if e.is_fatal() {
                hub.error(e.to_string());
            }
            Err(e)
        }
    }
}

/// Start the collector, stream its stdout to observers, and wait for it
/// under the run's wall-clock limit.
async fn run_collector(
    request: &PipelineRequest,
    config: &RunnerConfig,
    limit: Duration,
    limit_mins: u64,
    hub: &ProgressHub,
) -> Result<()> {
    hub.log(format!(
        "iniciando recolección: '{}' en radio de {} km",
        request.keyword, request.radius_km
    ));

    let mut child = Command::new(&config.collector_cmd)
        .arg("--lat")
        .arg(request.latitude.to_string())
        .arg("--lon")
        .arg(request.longitude.to_string())
        .arg("--query")
        .arg(&request.keyword)
        .arg("--radius")
        .arg(request.radius_km.to_string())
        .current_dir(&config.workdir)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            ProspectorError::Process(format!("cannot start '{}': {e}", config.collector_cmd))
        })?;

    // Relay collector output as it appears rather than after exit.
    let relay = child.stdout.take().map(|stdout| {
        let hub = hub.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                hub.log(line);
            }
        })
    });

    let waited = timeout(limit, child.wait()).await;

    if waited.is_err() {
        warn!(limit_mins, "collector exceeded the run limit, killing it");
        if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to kill timed-out collector");
        }
    }

    // The pipe closes once the child is gone, so the relay always finishes.
    if let Some(relay) = relay {
        let _ = relay.await;
    }

    let status = match waited {
        Ok(waited) => {
            waited.map_err(|e| ProspectorError::Process(format!("collector failed: {e}")))?
        }
        Err(_) => return Err(ProspectorError::ProcessTimeout { limit_mins }),
    };

    if !status.success() {
        return Err(ProspectorError::Process(format!(
            "collector exited with {status}"
        )));
    }
    Ok(())
}

/// Find the newest collector CSV for `keyword` in `dir`.
///
/// The collector names its files `prospects_<keyword>_...csv` with spaces
/// in the keyword replaced by underscores. When no keyword-specific file
/// exists, fall back to the newest `prospects_` file of any keyword.
pub fn find_latest_csv(dir: &Path, keyword: &str) -> Result<PathBuf> {
    let keyword_prefix = format!("{COLLECTOR_FILE_PREFIX}{}", keyword.replace(' ', "_"));

    if let Some(path) = newest_with_prefix(dir, &keyword_prefix)? {
        return Ok(path);
    }
    if let Some(path) = newest_with_prefix(dir, COLLECTOR_FILE_PREFIX)? {
        return Ok(path);
    }
    Err(ProspectorError::Process(format!(
        "no collector output found in {}",
        dir.display()
    )))
}

fn newest_with_prefix(dir: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| ProspectorError::io(dir, e))?;

    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| ProspectorError::io(dir, e))?;
        let path = entry.path();

        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if !name.starts_with(prefix) || !name.ends_with(".csv") {
            continue;
        }

        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .map_err(|e| ProspectorError::io(&path, e))?;

        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    Ok(newest.map(|(_, path)| path))
}
