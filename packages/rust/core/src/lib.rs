//! Prospector core: extraction jobs, the worker pool, batch orchestration,
//! pipeline runs, and the progress relay.
//!
//! The typical entry points are [`process_csv`] for enriching an existing
//! collector file and [`run_pipeline`] for a full collect-then-enrich run.
//! Both publish their status through a [`ProgressHub`].

pub mod batch;
pub mod broadcast;
pub mod job;
pub mod pool;
pub mod records;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{enrich_batch, process_csv};
pub use broadcast::ProgressHub;
pub use job::ExtractionJob;
pub use pool::run_batch;
pub use records::{load_records, output_path, save_records};
pub use runner::{PipelineOutcome, PipelineRequest, RunnerConfig, find_latest_csv, run_pipeline};
