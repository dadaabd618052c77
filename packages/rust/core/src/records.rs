//! Record storage: reading collector CSVs and writing enriched output.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use prospector_shared::{ProspectorError, Record, Result};

/// Suffix appended to the input file stem for enriched output.
const OUTPUT_SUFFIX: &str = "_with_phones";

/// Load records from a collector CSV.
///
/// Rows that fail to deserialize (missing columns, broken quoting) are
/// skipped with a warning; a malformed row never aborts the load.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| ProspectorError::parse(format!("cannot read {}: {e}", path.display())))?;

    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<Record>().enumerate() {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                // Header is line 1, so the first data row is line 2.
                warn!(line = row + 2, error = %e, "skipping malformed row");
            }
        }
    }

    debug!(path = %path.display(), count = records.len(), "records loaded");
    Ok(records)
}

/// Write the enriched record set, with the `ScrapedPhone` column appended.
///
/// A write failure is fatal for the run.
pub fn save_records(path: &Path, records: &[Record]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| ProspectorError::Persistence(format!("cannot create {}: {e}", path.display())))?;

    for record in records {
        writer
            .serialize(record)
            .map_err(|e| ProspectorError::Persistence(format!("{}: {e}", path.display())))?;
    }

    writer
        .flush()
        .map_err(|e| ProspectorError::Persistence(format!("{}: {e}", path.display())))?;

    debug!(path = %path.display(), count = records.len(), "records saved");
    Ok(())
}

/// Derive the enriched output path: `listings.csv` → `listings_with_phones.csv`.
pub fn output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.csv"))
}
