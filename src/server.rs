use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tower_http::{compression::CompressionLayer, cors::CorsLayer};

use crate::config::EndpointConfig;
use crate::endpoint::{serialize_records, Registry};
use crate::query::{self, RequestContext};
use crate::store::MemoryStore;

#[derive(Clone)]
pub struct AppState {
    store: Arc<MemoryStore>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Builds the router: one GET route per registered endpoint, plus a health
/// probe, behind compression and permissive CORS.
pub fn router(store: Arc<MemoryStore>, registry: &Registry) -> Router {
    let state = AppState { store };

    let mut app = Router::new().route("/api/health", get(health_handler));

    for (name, config) in registry.iter() {
        let config = Arc::clone(config);
        app = app.route(
            &format!("/{name}"),
            get(
                move |state: State<AppState>, params: Query<HashMap<String, String>>| {
                    let config = Arc::clone(&config);
                    async move { autocomplete_handler(state, params, config).await }
                },
            ),
        );
    }

    app.layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    store: Arc<MemoryStore>,
    registry: &Registry,
) -> anyhow::Result<()> {
    let endpoints: Vec<String> = registry.iter().map(|(name, _)| name.to_string()).collect();
    let app = router(store, registry);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 Server listening on http://{}", addr);
    for name in endpoints {
        tracing::info!("🔍 Autocomplete endpoint at http://{}/{}?term=<term>", addr, name);
    }

    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn autocomplete_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    config: Arc<EndpointConfig>,
) -> Result<Json<Value>, StatusCode> {
    let start = std::time::Instant::now();

    let term = params.get("term").map(String::as_str).unwrap_or("").to_string();
    let ctx = RequestContext::new(params);

    let records = query::run(&state.store, &ctx, &config, &term).map_err(|e| {
        tracing::error!("Autocomplete {} failed: {}", config.route_name(), e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let body = match &config.serializer {
        Some(custom) => custom(&records, &config),
        None => serialize_records(&records, &config).map_err(|e| {
            tracing::error!("Serialization for {} failed: {}", config.route_name(), e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?,
    };

    tracing::info!(
        "Autocomplete {} term='{}' returned {} records in {}ms",
        config.action,
        term,
        records.len(),
        start.elapsed().as_millis()
    );

    Ok(Json(body))
}
