//! Batch enrichment orchestration.
//!
//! Ties the record store, the worker pool, and the progress relay together:
//! load records, run them through the pool, compute the summary strictly
//! after the barrier, and emit the terminal event.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, instrument};

use prospector_extractor::PageSource;
use prospector_shared::{BatchConfig, BatchSummary, ProspectorError, Record, Result};

use crate::broadcast::ProgressHub;
use crate::pool::run_batch;
use crate::records::{load_records, output_path, save_records};

/// Enrich a batch of records and report the aggregate outcome.
///
/// The summary is computed from the final record set after every dispatched
/// job has completed. The terminal `Complete` event is not published here:
/// the caller owns persistence, and `Complete` must come after everything
/// that can still fail the run.
pub async fn enrich_batch(
    records: Vec<Record>,
    source: Arc<dyn PageSource>,
    config: &BatchConfig,
    hub: &ProgressHub,
) -> Result<(Vec<Record>, BatchSummary)> {
    if records.is_empty() {
        return Err(ProspectorError::validation("batch contains no records"));
    }
    if !records.iter().any(|r| r.is_eligible()) {
        return Err(ProspectorError::validation(
            "no records eligible for extraction: every record already has a phone or lacks a source url",
        ));
    }

    let enriched = run_batch(records, source, config, hub).await;
    let summary = BatchSummary::from_records(&enriched);

    info!(
        total = summary.total,
        with_phone = summary.with_phone,
        success_rate = format!("{:.1}%", summary.success_rate),
        "batch enrichment complete"
    );

    Ok((enriched, summary))
}

/// Enrich a collector CSV end to end and write the `_with_phones` output.
///
/// `Complete` is published only once the output file is written, so it is
/// strictly the last event of a successful run. Fatal failures are mirrored
/// onto the hub as an `Error` event so remote observers see the same
/// outcome as the caller.
#[instrument(skip_all, fields(input = %input.display()))]
pub async fn process_csv(
    input: &Path,
    source: Arc<dyn PageSource>,
    config: &BatchConfig,
    hub: &ProgressHub,
) -> Result<(PathBuf, BatchSummary)> {
    let run = async {
        let records = load_records(input)?;
        hub.log(format!(
            "cargados {} registros de {}",
            records.len(),
            input.display()
        ));

        let (enriched, summary) = enrich_batch(records, source, config, hub).await?;

        let output = output_path(input);
        save_records(&output, &enriched)?;

        hub.complete(summary.clone());
        Ok::<_, ProspectorError>((output, summary))
    };

    match run.await {
        Ok(done) => Ok(done),
        Err(e) => {
            hub.error(e.to_string());
            Err(e)
        }
    }
}
