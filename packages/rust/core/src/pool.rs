//! Bounded-concurrency worker pool for extraction jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use url::Url;

use prospector_extractor::{Locator, PageSource};
use prospector_shared::{BatchConfig, FailureReason, JobOutcome, Record, Stage};

use crate::broadcast::ProgressHub;
use crate::job::ExtractionJob;

/// Shared mutable batch state. The record vector and the processed counter
/// are guarded by a single lock so folding an outcome and emitting its
/// progress tick stay consistent.
struct BatchState {
    records: Vec<Record>,
    processed: usize,
}

/// Run extraction jobs over `records` under the configured concurrency cap.
///
/// Records that already have a phone or lack a source page are skipped
/// without dispatch. Every dispatched job reaches a terminal outcome and
/// emits exactly one progress tick; failures degrade to an empty result.
/// Returns only after every dispatched job has completed.
#[instrument(skip_all, fields(records = records.len()))]
pub async fn run_batch(
    records: Vec<Record>,
    source: Arc<dyn PageSource>,
    config: &BatchConfig,
    hub: &ProgressHub,
) -> Vec<Record> {
    let eligible: Vec<(usize, String)> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.is_eligible())
        .map(|(i, r)| (i, r.source_url.clone()))
        .collect();
    let total = eligible.len();

    info!(
        total_records = records.len(),
        eligible = total,
        concurrency = config.concurrency,
        "starting extraction batch"
    );

    let state = Arc::new(Mutex::new(BatchState {
        records,
        processed: 0,
    }));
    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let locator = Arc::new(Locator::new(&config.locale));
    let deadline = Duration::from_secs(config.job_timeout_secs);
    let pacing = Duration::from_millis(config.pacing_ms);

    let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(total);

    for (index, raw_url) in eligible {
        let state = state.clone();
        let source = source.clone();
        let locator = locator.clone();
        let locale = config.locale.clone();
        let hub = hub.clone();
        let semaphore = semaphore.clone();

        handles.push(tokio::spawn(async move {
            let permit = semaphore.acquire_owned().await.expect("semaphore closed");

            let outcome = match Url::parse(&raw_url) {
                Ok(url) => {
                    ExtractionJob::new(url, deadline)
                        .run(source.as_ref(), &locator, &locale)
                        .await
                }
                Err(e) => JobOutcome::Failed(FailureReason::Navigation(format!(
                    "invalid source url '{raw_url}': {e}"
                ))),
            };

            {
                let mut state = state.lock().await;
                if let JobOutcome::Phone(phone) = &outcome {
                    state.records[index].extracted_phone = phone.clone();
                }
                state.processed += 1;
                hub.progress(state.processed, total, Stage::Phones);
            }

            // Pace the next use of this capacity slot, not a global clock.
            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }

            drop(permit);
        }));
    }

    // Full synchronization barrier: no early return, no partial results.
    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "extraction task aborted");
            let mut state = state.lock().await;
            state.processed += 1;
            hub.progress(state.processed, total, Stage::Phones);
        }
    }

    let state = Arc::into_inner(state).expect("batch tasks still running");
    let state = state.into_inner();

    info!(
        processed = state.processed,
        "extraction batch complete"
    );

    state.records
}
