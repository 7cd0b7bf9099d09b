// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::datasource_store::DataSourceStore;
use crate::query_client::QueryClientFactory;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<DataSourceStore>,
    pub(crate) clients: Arc<dyn QueryClientFactory>,
}

pub fn app(store: Arc<DataSourceStore>, clients: Arc<dyn QueryClientFactory>) -> Router {
    let state = AppState { store, clients };
    Router::new()
        .route("/", get(|| async { "logvolume: log volume histograms for Loki" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/api/datasources",
            get(http::list_datasources).post(http::create_datasource),
        ) // GET, POST /api/datasources
        .route(
            "/api/datasources/{uid}",
            get(http::get_datasource)
                .put(http::update_datasource)
                .delete(http::delete_datasource),
        ) // GET, PUT, DELETE /api/datasources/{uid}
        .route(
            "/api/datasources/{uid}/logs-volume",
            post(http::logs_volume_handler),
        ) // POST /api/datasources/{uid}/logs-volume
        .route("/ws/logs-volume/{uid}", get(ws::ws_logs_volume)) // WS /ws/logs-volume/{uid}
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
