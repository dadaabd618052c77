//! Core domain types for the Prospector enrichment pipeline.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One business listing being enriched.
///
/// Field renames match the CSV column headers produced by the listing
/// collector (`Name,Address,Stars,Reviews,Phone,Hours,Website,GoogleURL`).
/// `extracted_phone` is absent on input and appended as `ScrapedPhone` on
/// output; it is written at most once, during enrichment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "Stars")]
    pub rating: String,
    #[serde(rename = "Reviews")]
    pub review_count: String,
    /// Phone number already present in the source data, possibly empty.
    #[serde(rename = "Phone")]
    pub phone: String,
    #[serde(rename = "Hours")]
    pub hours: String,
    #[serde(rename = "Website")]
    pub website: String,
    /// Source-page reference the extractor navigates to.
    #[serde(rename = "GoogleURL")]
    pub source_url: String,
    /// Phone number found by the extractor, empty until enrichment.
    #[serde(rename = "ScrapedPhone", default)]
    pub extracted_phone: String,
}

impl Record {
    /// Whether this record ends up with any phone number, original or extracted.
    pub fn has_phone(&self) -> bool {
        !self.phone.is_empty() || !self.extracted_phone.is_empty()
    }

    /// Eligible for dispatch: no original phone and a source page to visit.
    pub fn is_eligible(&self) -> bool {
        self.phone.is_empty() && !self.source_url.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Job outcomes
// ---------------------------------------------------------------------------

/// Why an extraction job failed. Per-record failures degrade to an empty
/// result; they never abort the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The source page could not be reached.
    Navigation(String),
    /// The per-job deadline elapsed before the locator returned.
    Timeout,
}

/// Terminal state of one extraction job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// A phone number was located and normalized.
    Phone(String),
    /// The page loaded but no phone number was found. Not an error.
    Empty,
    /// The job failed; the record is left without an extracted phone.
    Failed(FailureReason),
}

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Pipeline stage a progress tick belongs to.
///
/// Wire names match the transport layer's message schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "scraping")]
    Collection,
    #[serde(rename = "phones")]
    Phones,
}

/// A typed status message emitted to observers.
///
/// Events are push-only and never persisted; an observer that subscribes
/// late misses prior events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// One record reached a terminal state.
    Progress {
        percentage: u8,
        current: usize,
        total: usize,
        stage: Stage,
    },
    /// Free-form status line.
    Log { message: String },
    /// The batch barrier was crossed; always the last event of a run.
    Complete { summary: BatchSummary },
    /// A fatal, run-level failure.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// BatchSummary
// ---------------------------------------------------------------------------

/// Aggregate statistics computed once after all jobs complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// All records in the batch, dispatched or skipped.
    pub total: usize,
    /// Records with any phone number, original or extracted.
    pub with_phone: usize,
    /// `with_phone / total` as a percentage.
    pub success_rate: f64,
}

impl BatchSummary {
    /// Scan the final record set once and derive the counts.
    pub fn from_records(records: &[Record]) -> Self {
        let total = records.len();
        let with_phone = records.iter().filter(|r| r.has_phone()).count();
        let success_rate = if total == 0 {
            0.0
        } else {
            with_phone as f64 / total as f64 * 100.0
        };
        Self {
            total,
            with_phone,
            success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(phone: &str, url: &str) -> Record {
        Record {
            name: "Taquería El Paso".into(),
            phone: phone.into(),
            source_url: url.into(),
            ..Record::default()
        }
    }

    #[test]
    fn eligibility_requires_missing_phone_and_a_url() {
        assert!(record("", "https://maps.example.com/p/1").is_eligible());
        assert!(!record("961 123 4567", "https://maps.example.com/p/1").is_eligible());
        assert!(!record("", "").is_eligible());
    }

    #[test]
    fn summary_counts_original_and_extracted_phones() {
        let mut records = vec![
            record("961 123 4567", ""),
            record("", "https://maps.example.com/p/2"),
            record("", "https://maps.example.com/p/3"),
        ];
        records[1].extracted_phone = "555 123 4567".into();

        let summary = BatchSummary::from_records(&records);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.with_phone, 2);
        assert!((summary.success_rate - 66.666).abs() < 0.01);
    }

    #[test]
    fn summary_of_empty_batch_is_zero() {
        let summary = BatchSummary::from_records(&[]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn progress_event_wire_format() {
        let event = ProgressEvent::Progress {
            percentage: 40,
            current: 2,
            total: 5,
            stage: Stage::Phones,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains(r#""type":"progress""#));
        assert!(json.contains(r#""stage":"phones""#));

        let parsed: ProgressEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, event);
    }

    #[test]
    fn complete_event_carries_summary() {
        let event = ProgressEvent::Complete {
            summary: BatchSummary {
                total: 5,
                with_phone: 4,
                success_rate: 80.0,
            },
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains(r#""type":"complete""#));
        assert!(json.contains(r#""with_phone":4"#));
    }
}
