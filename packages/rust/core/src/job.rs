//! Single-record extraction jobs.

use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use prospector_extractor::{Locator, PageSource, normalize};
use prospector_shared::{FailureReason, JobOutcome, LocaleConfig, Result};

/// One bounded attempt to enrich a single record with a phone number.
#[derive(Debug)]
pub struct ExtractionJob {
    /// Job identifier for log correlation.
    pub id: Uuid,
    /// Source page to visit.
    pub url: Url,
    /// Deadline covering session acquire, navigation, and location.
    pub deadline: Duration,
}

impl ExtractionJob {
    pub fn new(url: Url, deadline: Duration) -> Self {
        Self {
            id: Uuid::now_v7(),
            url,
            deadline,
        }
    }

    /// Run the job to a terminal [`JobOutcome`].
    ///
    /// The deadline bounds the whole attempt. When it elapses the attempt is
    /// dropped and the job reports a timeout; the page source is not told to
    /// cancel, so a browser-backed source may let the abandoned lookup run to
    /// completion in the background (fire-and-discard).
    pub async fn run(
        &self,
        source: &dyn PageSource,
        locator: &Locator,
        locale: &LocaleConfig,
    ) -> JobOutcome {
        match timeout(self.deadline, self.attempt(source, locator, locale)).await {
            Ok(Ok(Some(phone))) => {
                debug!(job = %self.id, url = %self.url, %phone, "phone extracted");
                JobOutcome::Phone(phone)
            }
            Ok(Ok(None)) => {
                debug!(job = %self.id, url = %self.url, "no phone on page");
                JobOutcome::Empty
            }
            Ok(Err(e)) => {
                warn!(job = %self.id, url = %self.url, error = %e, "navigation failed");
                JobOutcome::Failed(FailureReason::Navigation(e.to_string()))
            }
            Err(_) => {
                warn!(
                    job = %self.id,
                    url = %self.url,
                    deadline_secs = self.deadline.as_secs(),
                    "job abandoned after deadline"
                );
                JobOutcome::Failed(FailureReason::Timeout)
            }
        }
    }

    async fn attempt(
        &self,
        source: &dyn PageSource,
        locator: &Locator,
        locale: &LocaleConfig,
    ) -> Result<Option<String>> {
        let mut session = source.session().await?;
        session.navigate(&self.url).await?;
        session.wait_stable().await?;

        Ok(locator
            .locate(session.as_ref())
            .map(|candidate| normalize(&candidate.raw, locale)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSource;

    fn locale() -> LocaleConfig {
        LocaleConfig::default()
    }

    fn locator() -> Locator {
        Locator::new(&locale())
    }

    #[tokio::test]
    async fn successful_job_reports_normalized_phone() {
        let source = FakeSource::with_phone("+529611234567");
        let job = ExtractionJob::new(
            Url::parse("https://maps.example.com/p/1").unwrap(),
            Duration::from_secs(30),
        );

        let outcome = job.run(&source, &locator(), &locale()).await;
        assert_eq!(outcome, JobOutcome::Phone("961 123 4567".into()));
    }

    #[tokio::test]
    async fn page_without_phone_is_empty_not_an_error() {
        let source = FakeSource::empty_pages();
        let job = ExtractionJob::new(
            Url::parse("https://maps.example.com/p/1").unwrap(),
            Duration::from_secs(30),
        );

        let outcome = job.run(&source, &locator(), &locale()).await;
        assert_eq!(outcome, JobOutcome::Empty);
    }

    #[tokio::test]
    async fn navigation_failure_is_reported() {
        let source = FakeSource::failing();
        let job = ExtractionJob::new(
            Url::parse("https://maps.example.com/p/1").unwrap(),
            Duration::from_secs(30),
        );

        let outcome = job.run(&source, &locator(), &locale()).await;
        assert!(matches!(
            outcome,
            JobOutcome::Failed(FailureReason::Navigation(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_abandons_the_job() {
        let source = FakeSource::with_phone("+529611234567").with_delay(Duration::from_secs(60));
        let job = ExtractionJob::new(
            Url::parse("https://maps.example.com/p/1").unwrap(),
            Duration::from_secs(30),
        );

        let outcome = job.run(&source, &locator(), &locale()).await;
        assert_eq!(outcome, JobOutcome::Failed(FailureReason::Timeout));
    }
}
