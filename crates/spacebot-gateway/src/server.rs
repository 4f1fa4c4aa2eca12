//! HTTP server implementation using Axum.

use axum::{
    Router,
    extract::State,
    routing::{get, post},
};
use spacebot_core::config::GatewayConfig;
use spacebot_core::traits::ChatClient;
use spacebot_scheduler::NotificationScheduler;
use spacebot_store::Store;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared state for the gateway server.
#[derive(Clone)]
pub struct AppState {
    pub gateway_config: GatewayConfig,
    pub store: Arc<Store>,
    pub chat: Arc<dyn ChatClient>,
    pub scheduler: Arc<NotificationScheduler>,
    pub start_time: std::time::Instant,
}

/// Admin token middleware — validates X-Admin-Token header or ?token= query.
async fn require_admin_token(
    State(state): State<Arc<AppState>>,
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    // No token configured — allow all
    let expected = &state.gateway_config.admin_token;
    if expected.is_empty() {
        return next.run(req).await;
    }

    let from_header = req
        .headers()
        .get("X-Admin-Token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if from_header == expected {
        return next.run(req).await;
    }

    if let Some(query) = req.uri().query() {
        for pair in query.split('&') {
            if let Some(token) = pair.strip_prefix("token=")
                && token == expected
            {
                return next.run(req).await;
            }
        }
    }

    axum::response::Response::builder()
        .status(axum::http::StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from(
            serde_json::json!({"ok": false, "error": "Unauthorized — invalid or missing admin token"})
                .to_string(),
        ))
        .unwrap()
}

/// Build the Axum router with all routes.
pub fn build_router(shared: Arc<AppState>) -> Router {
    // Admin routes — require the configured token
    let protected = Router::new()
        .route("/api/v1/notifications", get(super::routes::list_notifications))
        .route("/api/v1/notifications", post(super::routes::create_notification))
        .route("/api/v1/scheduler/jobs", get(super::routes::scheduler_jobs))
        .route_layer(axum::middleware::from_fn_with_state(
            shared.clone(),
            require_admin_token,
        ));

    // Public routes — the platform webhook and liveness
    let public = Router::new()
        .route("/health", get(super::routes::health_check))
        .route("/webhook/events", post(super::routes::webhook_events));

    protected
        .merge(public)
        .layer(
            CorsLayer::new()
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

/// Start the HTTP server.
pub async fn start(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!(
        "{}:{}",
        state.gateway_config.host, state.gateway_config.port
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌐 Gateway listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
