//! HTTP surface: a thin axum adapter over the shared orchestrator.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::gemini::StyleGateway;
use crate::multipart;
use crate::orchestrator;

/// Two 10MB photos plus form overhead.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn router<G: StyleGateway + Send + Sync + 'static>(gateway: Arc<G>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/process", post(process_handler::<G>))
        .route("/api/simulate", post(simulate_handler::<G>))
        .route("/api/analyze", post(analyze_handler::<G>))
        .route("/api/salons", post(salons_handler::<G>))
        .route("/api/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(gateway)
}

fn success<T: serde::Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn content_type_of(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

async fn process_handler<G: StyleGateway + Send + Sync + 'static>(
    State(gateway): State<Arc<G>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let data = orchestrator::process(gateway.as_ref(), &body, content_type_of(&headers)).await?;
    Ok(success(data))
}

async fn simulate_handler<G: StyleGateway + Send + Sync + 'static>(
    State(gateway): State<Arc<G>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let mut form = multipart::parse(&body, content_type_of(&headers))?;
    let (current, desired) = orchestrator::extract_photos(&mut form)?;
    let simulation = gateway.simulate(&current, &desired).await;
    Ok(success(json!({ "simulation": simulation })))
}

async fn analyze_handler<G: StyleGateway + Send + Sync + 'static>(
    State(gateway): State<Arc<G>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let mut form = multipart::parse(&body, content_type_of(&headers))?;
    let (current, desired) = orchestrator::extract_photos(&mut form)?;
    let advice = gateway.analyze(&current, &desired).await?;
    Ok(success(json!({ "advice": advice })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SalonQuery {
    style_name: String,
    lat: f64,
    lng: f64,
}

async fn salons_handler<G: StyleGateway + Send + Sync + 'static>(
    State(gateway): State<Arc<G>>,
    Json(query): Json<SalonQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.style_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "styleName, lat, and lng are required".to_string(),
        ));
    }
    let salons = gateway.find_salons(&query.style_name, query.lat, query.lng).await;
    Ok(success(json!({ "salons": salons })))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": Utc::now().to_rfc3339() }))
}
