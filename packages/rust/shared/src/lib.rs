//! Shared types, error model, and configuration for Prospector.
//!
//! This crate is the foundation depended on by all other Prospector crates.
//! It provides:
//! - [`ProspectorError`] — the unified error type
//! - Domain types ([`Record`], [`ProgressEvent`], [`BatchSummary`], [`JobOutcome`])
//! - Configuration ([`AppConfig`], [`BatchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BatchConfig, DefaultsConfig, LocaleConfig, PipelineConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{ProspectorError, Result};
pub use types::{BatchSummary, FailureReason, JobOutcome, ProgressEvent, Record, Stage};
