//! HTTP surface: read-only weather views, threshold control, health and metrics

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use serde_json::{json, Value};
use wxwatch_core::{AlertThreshold, Observation, ObservationStore, TemperatureUnit};

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    threshold_updates_total: Counter<u64>,
    store: Arc<dyn ObservationStore>,
    threshold: Arc<AlertThreshold>,
    locations: Vec<String>,
}

/// Observation as served to readers, temperatures in the requested unit
#[derive(Debug, Serialize)]
pub struct ObservationView {
    pub city: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: i32,
    pub wind_speed: f64,
    pub weather_condition: String,
    pub unit: &'static str,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ObservationView {
    pub fn new(obs: Observation, unit: TemperatureUnit) -> Self {
        Self {
            city: obs.location,
            temperature: unit.from_celsius(obs.temperature),
            feels_like: unit.from_celsius(obs.feels_like),
            humidity: obs.humidity,
            wind_speed: obs.wind_speed,
            weather_condition: obs.condition,
            unit: unit.symbol(),
            timestamp: DateTime::from_timestamp(obs.observed_at, 0),
        }
    }
}

pub fn build_app(
    store: Arc<dyn ObservationStore>,
    threshold: Arc<AlertThreshold>,
    locations: Vec<String>,
) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("wxwatch-api");

    let requests_total = meter
        .u64_counter("wxwatch_requests_total")
        .with_description("Total HTTP requests served")
        .init();
    let threshold_updates_total = meter
        .u64_counter("wxwatch_threshold_updates_total")
        .with_description("Accepted alert threshold updates")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        threshold_updates_total,
        store,
        threshold,
        locations,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/weather", get(all_latest))
        .route("/weather/:city", get(city_latest))
        .route("/weather/:city/:unit", get(city_latest_in_unit))
        .route("/threshold", get(get_threshold))
        .route("/set-threshold", post(set_threshold))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

fn count(state: &AppState, route: &'static str) {
    state
        .requests_total
        .add(1, &[KeyValue::new("route", route)]);
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    count(&state, "healthz");
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

async fn all_latest(State(state): State<Arc<AppState>>) -> Response {
    count(&state, "weather_all");
    match state.store.latest_per_location().await {
        Ok(latest) => {
            let views: Vec<_> = latest
                .into_iter()
                .map(|o| ObservationView::new(o, TemperatureUnit::Metric))
                .collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(e) => {
            tracing::error!(error=?e, "failed to read latest observations");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred while retrieving weather data.",
            )
        }
    }
}

async fn city_latest(State(state): State<Arc<AppState>>, Path(city): Path<String>) -> Response {
    count(&state, "weather_city");
    latest_for(&state, &city, TemperatureUnit::Metric).await
}

async fn city_latest_in_unit(
    State(state): State<Arc<AppState>>,
    Path((city, unit)): Path<(String, String)>,
) -> Response {
    count(&state, "weather_city");
    match unit.parse::<TemperatureUnit>() {
        Ok(unit) => latest_for(&state, &city, unit).await,
        Err(e) => error_body(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn latest_for(state: &AppState, city: &str, unit: TemperatureUnit) -> Response {
    if !state.locations.iter().any(|l| l == city) {
        return error_body(
            StatusCode::BAD_REQUEST,
            "City not supported. Please choose from the available cities.",
        );
    }

    match state.store.latest(city).await {
        Ok(Some(obs)) => (StatusCode::OK, Json(ObservationView::new(obs, unit))).into_response(),
        Ok(None) => error_body(StatusCode::NOT_FOUND, "No observation recorded yet for this city."),
        Err(e) => {
            tracing::error!(error=?e, city, "failed to read latest observation");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Error fetching weather data")
        }
    }
}

async fn get_threshold(State(state): State<Arc<AppState>>) -> Json<Value> {
    count(&state, "threshold");
    Json(json!({ "threshold": state.threshold.get() }))
}

async fn set_threshold(State(state): State<Arc<AppState>>, Json(body): Json<Value>) -> Response {
    count(&state, "set_threshold");
    let Some(threshold) = body.get("threshold").and_then(Value::as_f64) else {
        return error_body(StatusCode::BAD_REQUEST, "Threshold must be a number.");
    };

    if state.threshold.set(threshold).is_err() {
        return error_body(StatusCode::BAD_REQUEST, "Threshold must be a number.");
    }
    state.threshold_updates_total.add(1, &[]);
    tracing::info!(threshold, "Alert threshold updated");

    (
        StatusCode::OK,
        Json(json!({ "message": format!("Temperature threshold set to {}°C", threshold) })),
    )
        .into_response()
}
