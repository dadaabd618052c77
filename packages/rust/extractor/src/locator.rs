//! Multi-strategy phone-number locator.
//!
//! Strategies run in a fixed priority order and the first hit wins. The
//! scoped strategies (phone control attribute, accessible label, contact
//! block) have a near-zero false-positive rate; the whole-page text scan is
//! the least trusted signal and runs last.

use regex::Regex;
use tracing::debug;

use prospector_shared::LocaleConfig;

use crate::page::PageSession;

/// Selector for interactive elements marked as phone controls.
const PHONE_ITEM_SELECTOR: &str = "button[data-item-id*='phone']";

/// Machine-readable scheme prefix carried in the phone control identifier.
const PHONE_ATTR_SCHEME: &str = "phone:tel:";

/// Display-class signature of the contact number block.
const CONTACT_BLOCK_SELECTOR: &str = ".Io6YTe.fontBodyMedium.kR99db.fdkmkc";

// ---------------------------------------------------------------------------
// PhoneCandidate
// ---------------------------------------------------------------------------

/// Which strategy produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `phone:` scheme suffix in the control identifier. Highest confidence.
    PhoneAttribute,
    /// Text of a phone-marked control.
    ButtonText,
    /// Accessible label containing the locale's phone keyword.
    AriaLabel,
    /// Contact-block element whose text validates as a phone string.
    ContactBlock,
    /// Whole-page text scan. Least trusted.
    TextScan,
}

/// Raw matched text plus the strategy that produced it. Consumed immediately
/// by the normalizer, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneCandidate {
    pub raw: String,
    pub strategy: Strategy,
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Strip whitespace, parentheses, and hyphens from a raw phone string.
pub fn clean_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

/// Whether `text` qualifies as a phone string: after cleaning, an optional
/// leading `+` followed by 10–15 digits.
pub fn is_phone_number(text: &str) -> bool {
    let cleaned = clean_phone(text);
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Finds a candidate phone string on a rendered page.
pub struct Locator {
    aria_selector: String,
    country_code_pattern: Regex,
    national_pattern: Regex,
    digit_run_pattern: Regex,
}

impl Locator {
    /// Build a locator for the given locale.
    pub fn new(locale: &LocaleConfig) -> Self {
        let grouped = grouped_digits(locale.national_digits);
        let cc = regex::escape(&locale.country_code);

        Self {
            aria_selector: format!("button[aria-label*='{}']", locale.phone_keyword),
            country_code_pattern: Regex::new(&format!(r"\+?{cc}\s?{grouped}"))
                .expect("country-code pattern"),
            national_pattern: Regex::new(&grouped).expect("national pattern"),
            digit_run_pattern: Regex::new(r"\d[\d\s\-]{5,17}\d").expect("digit-run pattern"),
        }
    }

    /// Try each strategy in priority order; first non-empty result wins.
    /// No backtracking to prefer a "better" later match.
    pub fn locate(&self, page: &dyn PageSession) -> Option<PhoneCandidate> {
        // Strategy 1: phone control identifier, then the control's own text.
        for element in page.elements(PHONE_ITEM_SELECTOR) {
            if let Some(item_id) = element.attribute("data-item-id") {
                if let Some(suffix) = item_id.split(PHONE_ATTR_SCHEME).nth(1) {
                    debug!(raw = suffix, "phone found via control identifier");
                    return Some(PhoneCandidate {
                        raw: suffix.to_string(),
                        strategy: Strategy::PhoneAttribute,
                    });
                }
            }
            if let Some(raw) = self.extract_from_text(element.text()) {
                return Some(PhoneCandidate {
                    raw,
                    strategy: Strategy::ButtonText,
                });
            }
        }

        // Strategy 2: accessible label containing the phone keyword.
        for element in page.elements(&self.aria_selector) {
            if let Some(label) = element.attribute("aria-label") {
                if let Some(raw) = self.extract_from_text(label) {
                    return Some(PhoneCandidate {
                        raw,
                        strategy: Strategy::AriaLabel,
                    });
                }
            }
        }

        // Strategy 3: contact block, accepted only if it validates on its own.
        for element in page.elements(CONTACT_BLOCK_SELECTOR) {
            let text = element.text().trim();
            if is_phone_number(text) {
                return Some(PhoneCandidate {
                    raw: text.to_string(),
                    strategy: Strategy::ContactBlock,
                });
            }
        }

        // Strategy 4: whole-page text scan, first match in document order.
        for element in page.elements("body") {
            if let Some(raw) = self.extract_from_text(element.text()) {
                return Some(PhoneCandidate {
                    raw,
                    strategy: Strategy::TextScan,
                });
            }
        }

        None
    }

    /// Apply the text patterns in priority order and return the first match:
    /// country-code-prefixed number, bare national number, then a generic
    /// digit run that survives validation.
    pub fn extract_from_text(&self, text: &str) -> Option<String> {
        if let Some(m) = self.country_code_pattern.find(text) {
            return Some(m.as_str().trim().to_string());
        }

        if let Some(m) = self.national_pattern.find(text) {
            return Some(m.as_str().trim().to_string());
        }

        self.digit_run_pattern
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .find(|candidate| is_phone_number(candidate))
    }
}

/// Digit pattern grouped the way the locale displays national numbers
/// (3-3-rest for phone-length counts).
fn grouped_digits(national_digits: usize) -> String {
    if national_digits > 6 {
        format!(r"\d{{3}}\s?\d{{3}}\s?\d{{{}}}", national_digits - 6)
    } else {
        format!(r"\d{{{national_digits}}}")
    }
}
