//! Page-query capability boundary.
//!
//! The pipeline only ever talks to a rendered page through [`PageSource`] and
//! [`PageSession`]: navigate, wait for a stable render, query elements. The
//! production implementation fetches static HTML over HTTP; a browser-backed
//! implementation can slot in behind the same traits.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use prospector_shared::{ProspectorError, Result};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("Prospector/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// An owned snapshot of one matched element.
///
/// Snapshots decouple the caller from the underlying DOM representation, so
/// sessions can be held across await points regardless of how the backing
/// document is parsed.
#[derive(Debug, Clone)]
pub struct Element {
    attributes: HashMap<String, String>,
    text: String,
}

impl Element {
    pub fn new(attributes: HashMap<String, String>, text: impl Into<String>) -> Self {
        Self {
            attributes,
            text: text.into(),
        }
    }

    /// Attribute value by name, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Concatenated text content of the element.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One independent page/session handle.
///
/// Concurrent jobs must each hold their own session so navigations do not
/// interfere with each other.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate the session to `url`.
    async fn navigate(&mut self, url: &Url) -> Result<()>;

    /// Block until the rendered page is quiescent.
    async fn wait_stable(&mut self) -> Result<()>;

    /// Query the current document. Returns an empty list before navigation
    /// or when nothing matches.
    fn elements(&self, selector: &str) -> Vec<Element>;
}

/// Factory for independent page sessions, shared across all workers.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn session(&self) -> Result<Box<dyn PageSession>>;
}

// ---------------------------------------------------------------------------
// HTTP-backed implementation
// ---------------------------------------------------------------------------

/// Page source backed by plain HTTP fetches and static HTML parsing.
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Create a new HTTP page source with a shared client.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProspectorError::Navigation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn session(&self) -> Result<Box<dyn PageSession>> {
        Ok(Box::new(HttpPageSession {
            client: self.client.clone(),
            html: None,
        }))
    }
}

/// One HTTP fetch session. Holds the raw body and parses on demand, so the
/// session itself stays `Send` across await points.
struct HttpPageSession {
    client: Client,
    html: Option<String>,
}

#[async_trait]
impl PageSession for HttpPageSession {
    async fn navigate(&mut self, url: &Url) -> Result<()> {
        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ProspectorError::Navigation(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProspectorError::Navigation(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProspectorError::Navigation(format!("{url}: body read failed: {e}")))?;

        self.html = Some(body);
        Ok(())
    }

    async fn wait_stable(&mut self) -> Result<()> {
        // Static HTML is quiescent as soon as the body has been read.
        Ok(())
    }

    fn elements(&self, selector: &str) -> Vec<Element> {
        match &self.html {
            Some(html) => snapshot_elements(html, selector),
            None => Vec::new(),
        }
    }
}

/// Parse `html` and snapshot every element matching `selector`.
pub fn snapshot_elements(html: &str, selector: &str) -> Vec<Element> {
    let Ok(sel) = Selector::parse(selector) else {
        warn!(selector, "invalid selector, returning no elements");
        return Vec::new();
    };

    let doc = Html::parse_document(html);
    doc.select(&sel)
        .map(|el| {
            let attributes = el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let text = el.text().collect::<String>().trim().to_string();
            Element::new(attributes, text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTACT_HTML: &str = r#"<html><body>
        <button data-item-id="phone:tel:+529611234567" aria-label="Teléfono: 961 123 4567">
            961 123 4567
        </button>
        <div class="contact">Visítanos</div>
    </body></html>"#;

    #[test]
    fn snapshot_captures_attributes_and_text() {
        let elements = snapshot_elements(CONTACT_HTML, "button[data-item-id*='phone']");
        assert_eq!(elements.len(), 1);
        assert_eq!(
            elements[0].attribute("data-item-id"),
            Some("phone:tel:+529611234567")
        );
        assert_eq!(elements[0].text(), "961 123 4567");
    }

    #[test]
    fn snapshot_of_invalid_selector_is_empty() {
        assert!(snapshot_elements(CONTACT_HTML, ":::nonsense").is_empty());
    }

    #[tokio::test]
    async fn http_session_navigates_and_queries() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/place"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(CONTACT_HTML))
            .mount(&server)
            .await;

        let source = HttpPageSource::new().unwrap();
        let mut session = source.session().await.unwrap();

        let url = Url::parse(&format!("{}/place", server.uri())).unwrap();
        session.navigate(&url).await.unwrap();
        session.wait_stable().await.unwrap();

        let elements = session.elements("div.contact");
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].text(), "Visítanos");
    }

    #[tokio::test]
    async fn http_error_status_is_a_navigation_failure() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpPageSource::new().unwrap();
        let mut session = source.session().await.unwrap();
        let url = Url::parse(&server.uri()).unwrap();

        let err = session.navigate(&url).await.unwrap_err();
        assert!(matches!(err, ProspectorError::Navigation(_)));
    }

    #[test]
    fn elements_before_navigation_are_empty() {
        let session = HttpPageSession {
            client: Client::new(),
            html: None,
        };
        assert!(session.elements("body").is_empty());
    }
}
