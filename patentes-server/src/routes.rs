//! HTTP routes: liveness and plate verification.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use patentes_core::{VerificationResult, VerificationService};
use tower_http::cors::CorsLayer;

const PLATE_PARAM: &str = "patente";

pub(crate) fn router(service: Arc<VerificationService>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/api/verificar-patente", get(verify_plate))
        .layer(CorsLayer::permissive())
        .with_state(service)
}

async fn liveness() -> &'static str {
    "Backend operativo"
}

/// Always answers 200; failures are reported through `ok` and `tipo`.
///
/// The query is read as raw pairs so a repeated `patente` cannot be rejected
/// by the extractor; the first occurrence wins.
async fn verify_plate(
    State(service): State<Arc<VerificationService>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<VerificationResult> {
    let raw = first_plate(pairs).unwrap_or_default();
    Json(service.handle(&raw).await)
}

fn first_plate(pairs: Vec<(String, String)>) -> Option<String> {
    pairs
        .into_iter()
        .find(|(key, _value)| key == PLATE_PARAM)
        .map(|(_key, value)| value)
}
