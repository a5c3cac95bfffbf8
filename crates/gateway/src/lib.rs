//! HTTP API gateway for IKMS.
//!
//! Exposes the conversational QA endpoints, session management and PDF
//! upload/indexing over Axum. Sessions and the vector index live in
//! process memory; the upload directory and the index are wiped on start.

pub mod api;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, response::Json, routing::get};
use ikms_agent::ConversationService;
use ikms_core::Provider;
use ikms_retrieval::VectorIndex;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct GatewayState {
    /// The backend every stage and the index talk to.
    pub provider: Arc<dyn Provider>,
    pub conversations: ConversationService,
    pub index: Arc<VectorIndex>,
    pub upload_dir: PathBuf,
}

pub type SharedState = Arc<GatewayState>;

/// Wire the index and the conversation service around one provider.
pub fn build_state(config: &ikms_config::AppConfig, provider: Arc<dyn Provider>) -> SharedState {
    let index = Arc::new(VectorIndex::from_config(provider.clone(), &config.retrieval));
    let conversations = ConversationService::from_config(provider.clone(), index.clone(), config);

    Arc::new(GatewayState {
        provider,
        conversations,
        index,
        upload_dir: PathBuf::from(&config.gateway.upload_dir),
    })
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS for the configured origins
/// - Request body size limit (`gateway.max_upload_bytes`)
/// - HTTP trace logging
pub fn build_router(state: SharedState, config: &ikms_config::GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .merge(api::router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Start from a clean slate: empty upload directory, empty index.
pub async fn reset_storage(state: &GatewayState) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(&state.upload_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tokio::fs::create_dir_all(&state.upload_dir).await?;
    state.index.delete_all().await;
    info!(upload_dir = %state.upload_dir.display(), "Storage reset");
    Ok(())
}

/// Start the gateway HTTP server.
pub async fn start(config: ikms_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let router = ikms_providers::router::build_from_config(&config);
    let provider = router
        .default()
        .ok_or("No default provider configured. Set an API key")?;

    let state = build_state(&config, provider);
    reset_storage(&state).await?;

    let app = build_router(state, &config.gateway);

    info!(addr = %addr, model = %config.default_model, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    provider: ProviderHealth,
}

#[derive(Serialize)]
struct ProviderHealth {
    name: String,
    reachable: bool,
}

/// `200 ok` when the provider answers its health check, `503 degraded`
/// otherwise.
async fn health_handler(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match state.provider.health_check().await {
        Ok(reachable) => reachable,
        Err(e) => {
            warn!(provider = state.provider.name(), error = %e, "Provider health check failed");
            false
        }
    };

    let (status, label) = if reachable {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    (
        status,
        Json(HealthResponse {
            status: label,
            version: env!("CARGO_PKG_VERSION"),
            provider: ProviderHealth {
                name: state.provider.name().to_string(),
                reachable,
            },
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use ikms_core::error::ProviderError;
    use ikms_core::{ProviderRequest, ProviderResponse};
    use tower::ServiceExt;

    struct StubProvider {
        healthy: Result<bool, ProviderError>,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("stub".into()))
        }

        async fn health_check(&self) -> Result<bool, ProviderError> {
            self.healthy.clone()
        }
    }

    fn test_state_with(upload_dir: PathBuf, healthy: Result<bool, ProviderError>) -> SharedState {
        let mut config = ikms_config::AppConfig::default();
        config.gateway.upload_dir = upload_dir.display().to_string();
        build_state(&config, Arc::new(StubProvider { healthy }))
    }

    fn test_state(upload_dir: PathBuf) -> SharedState {
        test_state_with(upload_dir, Ok(true))
    }

    async fn health(state: SharedState) -> (StatusCode, serde_json::Value) {
        let app = build_router(state, &Default::default());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (status, body) = health(test_state(dir.path().into())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"]["name"], "stub");
        assert_eq!(body["provider"]["reachable"], true);
    }

    #[tokio::test]
    async fn health_reports_unreachable_provider() {
        let dir = tempfile::tempdir().unwrap();

        let (status, body) = health(test_state_with(dir.path().into(), Ok(false))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");

        let offline = Err(ProviderError::Network("connection refused".into()));
        let (status, body) = health(test_state_with(dir.path().into(), offline)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["provider"]["reachable"], false);
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path().into()), &Default::default());

        let req = Request::builder()
            .uri("/health")
            .header("Origin", "http://localhost:8501")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:8501"
        );
    }

    #[tokio::test]
    async fn reset_storage_empties_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();
        std::fs::write(uploads.join("old.pdf"), b"stale").unwrap();

        let state = test_state(uploads.clone());
        reset_storage(&state).await.unwrap();

        assert!(uploads.is_dir());
        assert_eq!(std::fs::read_dir(&uploads).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn reset_storage_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = dir.path().join("nested/uploads");
        reset_storage(&test_state(uploads.clone())).await.unwrap();
        assert!(uploads.is_dir());
    }
}
