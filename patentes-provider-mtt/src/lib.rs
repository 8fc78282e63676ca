//! Lookup strategy scraping the MTT (Ministerio de Transportes) query page.
//!
//! The portal has no structured API, so the answer is read off the page text.
//! That couples this strategy to the portal's wording; the wording lives in a
//! [`PageMatcher`] so it can be replaced without touching the request flow.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, REFERER, USER_AGENT};
use tracing::{debug, warn};

use patentes_core::{
    model::{Classification, Plate, Source, Verdict},
    ports::{LookupError, LookupStrategy},
};

const BASE_URL: &str = "https://apps.mtt.cl/consultaweb/consulta";
const PORTAL_REFERER: &str = "https://apps.mtt.cl/consultaweb/";

// The portal turns away requests that don't look like a browser.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0";
const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Decides a classification from the text of a result page.
pub trait PageMatcher: Send + Sync {
    /// Classify the raw page body.
    fn classify(&self, page: &str) -> Classification;
}

/// Case-insensitive keyword search over the page text.
///
/// Precedence: `colectivo`, then `taxi`, then the portal's "no results"
/// phrase, else [`Classification::Other`].
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordMatcher;

impl KeywordMatcher {
    /// Sentence the portal shows when it has no record for a plate.
    pub const NOT_FOUND_PHRASE: &'static str = "no existen resultados para la patente";
}

impl PageMatcher for KeywordMatcher {
    fn classify(&self, page: &str) -> Classification {
        let text = page.to_lowercase();

        if text.contains("colectivo") {
            Classification::Colectivo
        } else if text.contains("taxi") {
            Classification::Taxi
        } else if text.contains(Self::NOT_FOUND_PHRASE) {
            Classification::NotFound
        } else {
            Classification::Other
        }
    }
}

/// Plate lookup against the MTT web portal.
pub struct MttScrapeStrategy {
    client: Client,
    endpoint: String,
    matcher: Arc<dyn PageMatcher>,
}

impl MttScrapeStrategy {
    /// Create a new strategy bound to the given HTTP client.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            endpoint: BASE_URL.to_owned(),
            matcher: Arc::new(KeywordMatcher),
        }
    }

    /// Query a different endpoint, e.g. a mirror of the portal.
    #[must_use]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Replace the page matcher.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn PageMatcher>) -> Self {
        self.matcher = matcher;
        self
    }
}

#[async_trait]
impl LookupStrategy for MttScrapeStrategy {
    fn source(&self) -> Source {
        Source::HtmlFetch
    }

    async fn verify(&self, plate: &Plate) -> Result<Verdict, LookupError> {
        debug!(%plate, endpoint = %self.endpoint, "querying MTT portal");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("patente", plate.as_str())])
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(REFERER, PORTAL_REFERER)
            .header(ACCEPT, BROWSER_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%plate, status = status.as_u16(), "MTT portal answered with an error");
            return Err(LookupError::upstream(status, None));
        }

        let page = response.text().await?;
        let classification = self.matcher.classify(&page);
        let ok = matches!(
            classification,
            Classification::Colectivo | Classification::Taxi
        );

        Ok(Verdict::new(ok, classification))
    }
}

/// Build the MTT strategy with the default matcher, optionally against a different endpoint.
#[must_use]
pub fn strategy(client: Client, endpoint: Option<String>) -> Arc<dyn LookupStrategy> {
    let mut strategy = MttScrapeStrategy::new(client);
    if let Some(endpoint) = endpoint {
        strategy = strategy.with_endpoint(endpoint);
    }
    Arc::new(strategy)
}
