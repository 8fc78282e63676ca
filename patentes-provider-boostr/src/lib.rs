//! Lookup strategy backed by the Boostr vehicle API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use patentes_core::{
    model::{Classification, Plate, Source, Verdict},
    ports::{LookupError, LookupStrategy, SetupError},
};

const BASE_URL: &str = "https://api.boostr.cl/vehicle/transport.json";
const API_KEY_HEADER: &str = "X-API-KEY";

/// Name of the setting holding the API key.
pub const API_KEY_SETTING: &str = "BOOSTR_API_KEY";

/// Request body for the transport endpoint.
#[derive(Debug, Serialize)]
struct TransportRequest<'plate> {
    ppu: &'plate str,
}

/// Envelope returned by the transport endpoint, on success and on error.
#[derive(Debug, Deserialize)]
struct TransportResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<TransportFlags>,
}

/// Nested transport status flags.
#[derive(Debug, Deserialize)]
struct TransportFlags {
    is_public_transport: bool,
    #[serde(default)]
    is_school_transport: bool,
}

/// Plate lookup through the Boostr REST API.
#[derive(Debug)]
pub struct BoostrStrategy {
    client: Client,
    endpoint: String,
    api_key: HeaderValue,
}

impl BoostrStrategy {
    /// Create a new strategy authenticated with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::MissingSetting`] when the key is absent or blank,
    /// and [`SetupError::InvalidSetting`] when it cannot be sent as a header.
    pub fn new(client: Client, api_key: Option<String>) -> Result<Self, SetupError> {
        let api_key = api_key
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
            .ok_or(SetupError::MissingSetting(API_KEY_SETTING))?;

        let mut api_key = HeaderValue::from_str(&api_key)
            .map_err(|_err| SetupError::InvalidSetting(API_KEY_SETTING))?;
        api_key.set_sensitive(true);

        Ok(Self {
            client,
            endpoint: BASE_URL.to_owned(),
            api_key,
        })
    }

    /// Query a different endpoint.
    #[must_use]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl LookupStrategy for BoostrStrategy {
    fn source(&self) -> Source {
        Source::BoostrApi
    }

    async fn verify(&self, plate: &Plate) -> Result<Verdict, LookupError> {
        debug!(%plate, "querying Boostr");

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, self.api_key.clone())
            .json(&TransportRequest {
                ppu: plate.as_str(),
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // An unreadable error body still reports the status.
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            warn!(%plate, status = status.as_u16(), ?message, "Boostr answered with an error");
            return Err(LookupError::upstream(status, message));
        }

        let body = response.text().await?;
        let envelope: TransportResponse = serde_json::from_str(&body)
            .map_err(|err| LookupError::MalformedResponse(err.to_string()))?;

        let Some(flags) = envelope.data else {
            let reason = envelope
                .message
                .unwrap_or_else(|| "missing `data` object".to_owned());
            return Err(LookupError::MalformedResponse(reason));
        };

        Ok(interpret(&flags))
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<TransportResponse>(body)
        .ok()
        .and_then(|envelope| envelope.message)
}

/// The query succeeded either way; a non-transit plate is `otro`, not a failure.
fn interpret(flags: &TransportFlags) -> Verdict {
    let classification = if flags.is_public_transport {
        Classification::Colectivo
    } else {
        Classification::Other
    };

    Verdict::new(true, classification)
        .with_transport_flags(flags.is_public_transport, flags.is_school_transport)
}

/// Build the Boostr strategy, optionally against a different endpoint.
///
/// # Errors
///
/// Returns a [`SetupError`] when the API key is missing or unusable.
pub fn strategy(
    client: Client,
    api_key: Option<String>,
    endpoint: Option<String>,
) -> Result<Arc<dyn LookupStrategy>, SetupError> {
    let mut strategy = BoostrStrategy::new(client, api_key)?;
    if let Some(endpoint) = endpoint {
        strategy = strategy.with_endpoint(endpoint);
    }
    Ok(Arc::new(strategy))
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use patentes_core::{FailureKind, VerificationService, normalize};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;

    const KEY: &str = "test-key";

    async fn serve(router: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        format!("http://{addr}/transport")
    }

    /// Boostr stand-in: checks the key and the `ppu` body, then answers `flags`.
    fn boostr(flags: Value) -> Router {
        Router::new().route(
            "/transport",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let flags = flags.clone();
                async move {
                    let key = headers
                        .get(API_KEY_HEADER)
                        .and_then(|value| value.to_str().ok());
                    if key != Some(KEY) {
                        return (
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "status": "error", "message": "invalid api key" })),
                        );
                    }
                    if body.get("ppu").and_then(Value::as_str).is_none() {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({ "status": "error", "message": "ppu required" })),
                        );
                    }
                    (StatusCode::OK, Json(json!({ "status": "success", "data": flags })))
                }
            }),
        )
    }

    async fn strategy_for(router: Router, key: &str) -> BoostrStrategy {
        let endpoint = serve(router).await;
        BoostrStrategy::new(Client::new(), Some(key.to_owned()))
            .expect("strategy")
            .with_endpoint(endpoint)
    }

    fn plate(raw: &str) -> Plate {
        normalize(raw).expect("valid plate")
    }

    #[test]
    fn api_key_is_a_construction_precondition() {
        let missing = BoostrStrategy::new(Client::new(), None).expect_err("no key");
        assert_eq!(missing, SetupError::MissingSetting(API_KEY_SETTING));

        let blank = BoostrStrategy::new(Client::new(), Some(" \t".to_owned())).expect_err("blank");
        assert_eq!(blank, SetupError::MissingSetting(API_KEY_SETTING));

        let unusable =
            BoostrStrategy::new(Client::new(), Some("bad\nkey".to_owned())).expect_err("newline");
        assert_eq!(unusable, SetupError::InvalidSetting(API_KEY_SETTING));
    }

    #[tokio::test]
    async fn public_transport_is_colectivo() {
        let strategy = strategy_for(
            boostr(json!({ "is_public_transport": true, "is_school_transport": false })),
            KEY,
        )
        .await;

        let verdict = strategy.verify(&plate("ABCD12")).await.expect("verdict");

        assert_eq!(
            serde_json::to_value(&verdict).expect("serialize"),
            json!({
                "ok": true,
                "tipo": "colectivo",
                "esTransportePublico": true,
                "esTransporteEscolar": false,
            })
        );
    }

    #[tokio::test]
    async fn non_transit_plate_is_a_successful_other() {
        let strategy = strategy_for(
            boostr(json!({ "is_public_transport": false, "is_school_transport": true })),
            KEY,
        )
        .await;

        let verdict = strategy.verify(&plate("AB1234")).await.expect("verdict");

        assert!(verdict.ok);
        assert_eq!(verdict.classification, Classification::Other);
        assert_eq!(verdict.is_school_transport, Some(true));
    }

    #[tokio::test]
    async fn rejected_key_surfaces_the_body_message() {
        let strategy = strategy_for(
            boostr(json!({ "is_public_transport": true })),
            "wrong-key",
        )
        .await;

        let err = strategy
            .verify(&plate("ABCD12"))
            .await
            .expect_err("401 must fail");

        assert_eq!(err.kind(), FailureKind::UpstreamHttp);
        assert_eq!(err.detail(), "Upstream responded with HTTP 401: invalid api key");
    }

    #[tokio::test]
    async fn error_status_without_json_uses_reason_phrase() {
        let router = Router::new().route(
            "/transport",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let strategy = strategy_for(router, KEY).await;

        let err = strategy
            .verify(&plate("ABCD12"))
            .await
            .expect_err("500 must fail");

        assert_eq!(
            err.detail(),
            "Upstream responded with HTTP 500: Internal Server Error"
        );
    }

    #[test]
    fn error_message_tolerates_any_body() {
        assert_eq!(
            error_message(r#"{"status":"error","message":"quota exceeded"}"#).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(error_message(""), None);
        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[tokio::test]
    async fn empty_error_body_still_reports_the_status() {
        let router = Router::new().route(
            "/transport",
            post(|| async { StatusCode::BAD_GATEWAY }),
        );
        let strategy = strategy_for(router, KEY).await;

        let err = strategy
            .verify(&plate("ABCD12"))
            .await
            .expect_err("502 must fail");

        assert_eq!(err.kind(), FailureKind::UpstreamHttp);
        assert_eq!(err.detail(), "Upstream responded with HTTP 502: Bad Gateway");
    }

    #[tokio::test]
    async fn factory_honours_the_endpoint_override() {
        let endpoint = serve(boostr(json!({ "is_public_transport": true }))).await;
        let strategy =
            super::strategy(Client::new(), Some(KEY.to_owned()), Some(endpoint)).expect("strategy");

        assert_eq!(strategy.source(), Source::BoostrApi);
        let verdict = strategy.verify(&plate("ABCD12")).await.expect("verdict");
        assert_eq!(verdict.classification, Classification::Colectivo);
    }

    #[tokio::test]
    async fn missing_flags_are_malformed() {
        let router = Router::new().route(
            "/transport",
            post(|| async { Json(json!({ "status": "success", "data": { "owner": "x" } })) }),
        );
        let strategy = strategy_for(router, KEY).await;

        let err = strategy
            .verify(&plate("ABCD12"))
            .await
            .expect_err("flags missing");

        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }

    #[tokio::test]
    async fn dns_failure_is_an_error_result() {
        let service = VerificationService::new(Arc::new(
            BoostrStrategy::new(Client::new(), Some(KEY.to_owned()))
                .expect("strategy")
                .with_endpoint("http://boostr.invalid/transport"),
        ));

        let result = service.handle("ABCD12").await;

        assert!(!result.ok);
        assert_eq!(result.classification, Classification::Error);
        assert_eq!(result.source, Some(Source::BoostrApi));
        assert!(result.detail.is_some_and(|detail| !detail.is_empty()));
    }
}
