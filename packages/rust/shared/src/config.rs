//! Application configuration for Prospector.
//!
//! User config lives at `~/.prospector/prospector.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ProspectorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "prospector.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".prospector";

// ---------------------------------------------------------------------------
// Config structs (matching prospector.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Enrichment defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Phone-number locale settings.
    #[serde(default)]
    pub locale: LocaleConfig,

    /// Pipeline process orchestration settings.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum extraction jobs in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-job deadline in seconds.
    #[serde(default = "default_job_timeout")]
    pub job_timeout_secs: u64,

    /// Delay applied to a capacity slot after each completed job.
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            job_timeout_secs: default_job_timeout(),
            pacing_ms: default_pacing(),
        }
    }
}

fn default_concurrency() -> usize {
    3
}
fn default_job_timeout() -> u64 {
    30
}
fn default_pacing() -> u64 {
    1000
}

/// `[locale]` section — the single-country numbering convention the locator
/// and normalizer assume. Configuration rather than constants so another
/// locale only needs a config change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Country calling code, without the `+`.
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Digit count of a bare national number.
    #[serde(default = "default_national_digits")]
    pub national_digits: usize,

    /// Accessible-label keyword that marks a phone control on source pages.
    #[serde(default = "default_phone_keyword")]
    pub phone_keyword: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            country_code: default_country_code(),
            national_digits: default_national_digits(),
            phone_keyword: default_phone_keyword(),
        }
    }
}

fn default_country_code() -> String {
    "52".into()
}
fn default_national_digits() -> usize {
    10
}
fn default_phone_keyword() -> String {
    "Teléfono".into()
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Command that runs the upstream listing collector.
    #[serde(default = "default_collector_cmd")]
    pub collector_cmd: String,

    /// Wall-clock limit for a collection-only run, in minutes.
    #[serde(default = "default_collect_timeout")]
    pub collect_timeout_mins: u64,

    /// Wall-clock limit when phone enrichment is included, in minutes.
    #[serde(default = "default_full_timeout")]
    pub full_timeout_mins: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collector_cmd: default_collector_cmd(),
            collect_timeout_mins: default_collect_timeout(),
            full_timeout_mins: default_full_timeout(),
        }
    }
}

fn default_collector_cmd() -> String {
    "./mapsscrap".into()
}
fn default_collect_timeout() -> u64 {
    5
}
fn default_full_timeout() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// Batch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime enrichment configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Concurrency cap for in-flight extraction jobs.
    pub concurrency: usize,
    /// Per-job deadline in seconds.
    pub job_timeout_secs: u64,
    /// Per-completed-job pacing delay in milliseconds.
    pub pacing_ms: u64,
    /// Phone-number locale.
    pub locale: LocaleConfig,
}

impl From<&AppConfig> for BatchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            concurrency: config.defaults.concurrency,
            job_timeout_secs: config.defaults.job_timeout_secs,
            pacing_ms: config.defaults.pacing_ms,
            locale: config.locale.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.prospector/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ProspectorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.prospector/prospector.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ProspectorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ProspectorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ProspectorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ProspectorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ProspectorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("concurrency"));
        assert!(toml_str.contains("country_code"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.concurrency, 3);
        assert_eq!(parsed.defaults.job_timeout_secs, 30);
        assert_eq!(parsed.locale.country_code, "52");
        assert_eq!(parsed.locale.phone_keyword, "Teléfono");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
concurrency = 8

[locale]
country_code = "34"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.concurrency, 8);
        assert_eq!(config.defaults.pacing_ms, 1000);
        assert_eq!(config.locale.country_code, "34");
        assert_eq!(config.locale.national_digits, 10);
    }

    #[test]
    fn batch_config_from_app_config() {
        let app = AppConfig::default();
        let batch = BatchConfig::from(&app);
        assert_eq!(batch.concurrency, 3);
        assert_eq!(batch.pacing_ms, 1000);
        assert_eq!(batch.locale.national_digits, 10);
    }

    #[test]
    fn pipeline_timeouts_default() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.collect_timeout_mins, 5);
        assert_eq!(config.pipeline.full_timeout_mins, 10);
    }
}
