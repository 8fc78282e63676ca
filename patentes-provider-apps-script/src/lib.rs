//! Lookup strategy delegating to a Google Apps Script deployment.
//!
//! The script does the portal lookup on its side and answers with a body
//! already shaped like a [`Verdict`], so this strategy passes it through after
//! rejecting answers the proxy has no business giving.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::{debug, warn};

use patentes_core::{
    model::{Classification, Plate, Source, Verdict},
    ports::{LookupError, LookupStrategy, SetupError},
};

/// Name of the setting holding the script URL.
pub const ENDPOINT_SETTING: &str = "APPS_SCRIPT_URL";

/// Plate lookup through the Apps Script proxy.
#[derive(Debug)]
pub struct AppsScriptStrategy {
    client: Client,
    endpoint: String,
}

impl AppsScriptStrategy {
    /// Create a new strategy for the deployed script at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::MissingSetting`] when no endpoint is configured.
    pub fn new(client: Client, endpoint: Option<String>) -> Result<Self, SetupError> {
        let endpoint = endpoint
            .map(|url| url.trim().to_owned())
            .filter(|url| !url.is_empty())
            .ok_or(SetupError::MissingSetting(ENDPOINT_SETTING))?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl LookupStrategy for AppsScriptStrategy {
    fn source(&self) -> Source {
        Source::GoogleAppsScript
    }

    async fn verify(&self, plate: &Plate) -> Result<Verdict, LookupError> {
        debug!(%plate, "querying Apps Script proxy");

        let req = self
            .client
            .get(&self.endpoint)
            .query(&[("patente", plate.as_str())]);

        let verdict = fetch_json(req).await?;
        accept(verdict).inspect_err(|err| warn!(%plate, %err, "Apps Script answer rejected"))
    }
}

/// Plates reaching a strategy are already valid, so `invalida` from the proxy
/// is a broken answer. `detalle` only travels with `error`.
fn accept(mut verdict: Verdict) -> Result<Verdict, LookupError> {
    match verdict.classification {
        Classification::Invalid => Err(LookupError::MalformedResponse(
            "proxy classified a valid plate as `invalida`".to_owned(),
        )),
        Classification::Error => Ok(verdict),
        _ => {
            verdict.detail = None;
            Ok(verdict)
        }
    }
}

/// Build the proxy strategy for the given script URL.
///
/// # Errors
///
/// Returns [`SetupError::MissingSetting`] when no endpoint is configured.
pub fn strategy(
    client: Client,
    endpoint: Option<String>,
) -> Result<Arc<dyn LookupStrategy>, SetupError> {
    Ok(Arc::new(AppsScriptStrategy::new(client, endpoint)?))
}

// Small helper to fetch and decode JSON with status handling.
async fn fetch_json(req: RequestBuilder) -> Result<Verdict, LookupError> {
    req.send()
        .await
        .map_err(LookupError::from)?
        .error_for_status()
        .map_err(LookupError::from)?
        .json()
        .await
        .map_err(LookupError::from)
}
