//! Test doubles for the page-query capability.
//!
//! `FakeSource` serves canned pages with controllable latency and failure,
//! and instruments session lifetimes so tests can assert on the number of
//! jobs in flight. URL markers select per-record behavior in batch tests:
//! a URL containing `slow` stalls past any reasonable deadline, `fail`
//! refuses to navigate, `empty` serves a page without a phone number.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use prospector_extractor::{Element, PageSession, PageSource, snapshot_elements};
use prospector_shared::{ProspectorError, Result};

pub struct FakeSource {
    phone: Option<String>,
    fail_all: bool,
    delay: Duration,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl FakeSource {
    /// Every page carries `raw` in a phone control.
    pub fn with_phone(raw: &str) -> Self {
        Self {
            phone: Some(raw.to_string()),
            fail_all: false,
            delay: Duration::ZERO,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Every page loads fine but has no phone number.
    pub fn empty_pages() -> Self {
        Self {
            phone: None,
            ..Self::with_phone("")
        }
    }

    /// Every navigation fails.
    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::with_phone("")
        }
    }

    /// Add latency to every navigation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Highest number of sessions alive at any instant so far.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for FakeSource {
    async fn session(&self) -> Result<Box<dyn PageSession>> {
        let current = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(current, Ordering::SeqCst);

        Ok(Box::new(FakeSession {
            phone: self.phone.clone(),
            fail_all: self.fail_all,
            delay: self.delay,
            html: None,
            _guard: ActiveGuard(self.active.clone()),
        }))
    }
}

struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FakeSession {
    phone: Option<String>,
    fail_all: bool,
    delay: Duration,
    html: Option<String>,
    _guard: ActiveGuard,
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_all || url.as_str().contains("fail") {
            return Err(ProspectorError::Navigation(format!("{url}: unreachable")));
        }

        if url.as_str().contains("slow") {
            // Stalls long past any deadline used in tests.
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }

        let body = match &self.phone {
            Some(phone) if !url.as_str().contains("empty") => format!(
                r#"<html><body><button data-item-id="phone:tel:{phone}">Llamar</button></body></html>"#
            ),
            _ => "<html><body><p>Sin datos de contacto.</p></body></html>".to_string(),
        };

        self.html = Some(body);
        Ok(())
    }

    async fn wait_stable(&mut self) -> Result<()> {
        Ok(())
    }

    fn elements(&self, selector: &str) -> Vec<Element> {
        match &self.html {
            Some(html) => snapshot_elements(html, selector),
            None => Vec::new(),
        }
    }
}
