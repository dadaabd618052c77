//! Phone-number extraction against the page-query capability.
//!
//! This crate provides:
//! - [`page`] — the page/session capability traits and the HTTP-backed source
//! - [`Locator`] — the multi-strategy phone-number locator
//! - [`normalize`] — display-format canonicalization

pub mod locator;
pub mod normalizer;
pub mod page;

pub use locator::{Locator, PhoneCandidate, Strategy, is_phone_number};
pub use normalizer::normalize;
pub use page::{Element, HttpPageSource, PageSession, PageSource, snapshot_elements};

use prospector_shared::LocaleConfig;

/// Locate and normalize a phone number on an already-loaded page.
///
/// The standalone single-page operation; batch callers drive the same
/// locator through the job runner.
pub fn extract_from_page(page: &dyn PageSession, locale: &LocaleConfig) -> Option<String> {
    let locator = Locator::new(locale);
    locator
        .locate(page)
        .map(|candidate| normalize(&candidate.raw, locale))
}
