mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use compass_agents::NavigatorAgent;
use compass_core::{ServiceCatalog, TurnInput, TurnReply};
use compass_observability::AppMetrics;
use compass_reasoning::Reasoner;
use compass_speech::SpeechSynthesizer;
use compass_storage::Store;
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::RequestLimiter;

const DEFAULT_API_KEY: &str = "dev-compass-key";

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<NavigatorAgent<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: RequestLimiter,
    pub speech: SpeechSynthesizer,
    pub reasoning_enabled: bool,
    pub allowed_origins: Arc<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: compass_observability::MetricsSnapshot,
    capabilities: HealthCapabilities,
}

#[derive(Debug, Serialize)]
struct HealthCapabilities {
    reasoning_model: bool,
    speech: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct TurnRequest {
    session_id: Option<String>,
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SpeechRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct CatalogEntry {
    key: String,
    service_name: String,
    contact: String,
    timeline: String,
    next_steps: String,
}

pub async fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();

    let catalog = match env::var("COMPASS_CATALOG_PATH") {
        Ok(path) if !path.trim().is_empty() => ServiceCatalog::load(path.trim())
            .context("failed loading service catalog, refusing to start")?,
        _ => ServiceCatalog::builtin().context("builtin service catalog failed validation")?,
    };

    let store = Arc::new(Store::from_env().await?);
    let reasoner = Reasoner::from_env()?;
    let reasoning_enabled = !matches!(reasoner, Reasoner::Disabled);
    let speech = SpeechSynthesizer::from_env()?;

    let agent = Arc::new(NavigatorAgent::new(
        Arc::new(catalog),
        reasoner,
        store,
        metrics.clone(),
    ));

    let api_key = env::var("COMPASS_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string());
    let rate_limit_window = Duration::from_secs(
        env::var("COMPASS_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(60),
    );
    let rate_limit_max = env::var("COMPASS_RATE_LIMIT_MAX")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(80);
    let allowed_origins = parse_allowed_origins();

    let state = ApiState {
        agent,
        metrics,
        api_key,
        limiter: RequestLimiter::new(rate_limit_window, rate_limit_max),
        speech,
        reasoning_enabled,
        allowed_origins: Arc::new(allowed_origins),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/turn", post(turn))
        .route("/v1/catalog", get(catalog))
        .route("/v1/speech", post(speech))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
        capabilities: HealthCapabilities {
            reasoning_model: state.reasoning_enabled,
            speech: state.speech.is_enabled(),
        },
    };
    (StatusCode::OK, Json(payload))
}

async fn turn(
    State(state): State<ApiState>,
    Json(request): Json<TurnRequest>,
) -> impl IntoResponse {
    let input = TurnInput {
        session_id: request.session_id,
        text: request.text,
    };

    match state.agent.handle_turn(input).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "turn handling failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "turn_failed",
                    "message": "the turn could not be processed"
                })),
            )
                .into_response()
        }
    }
}

async fn catalog(State(state): State<ApiState>) -> impl IntoResponse {
    let entries: Vec<CatalogEntry> = state
        .agent
        .catalog()
        .services()
        .iter()
        .map(|service| CatalogEntry {
            key: service.key.clone(),
            service_name: service.service_name.clone(),
            contact: service.contact.clone(),
            timeline: service.timeline.clone(),
            next_steps: service.next_steps.clone(),
        })
        .collect();

    (StatusCode::OK, Json(entries))
}

/// Audio bytes when synthesis works, 204 otherwise. A collaborator failure is
/// never a server error at this edge.
async fn speech(
    State(state): State<ApiState>,
    Json(request): Json<SpeechRequest>,
) -> Response {
    match state.speech.synthesize_or_none(&request.text).await {
        Some(audio) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "audio/mpeg")],
            audio,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn is_public_endpoint(path: &str) -> bool {
    path == "/health"
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if request.method() == Method::OPTIONS || is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn parse_allowed_origins() -> Vec<String> {
    env::var("COMPASS_ALLOWED_ORIGINS")
        .map(|raw| {
            raw.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}
