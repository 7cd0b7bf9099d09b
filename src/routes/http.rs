// HTTP handlers: version, datasource CRUD, one-shot log volume

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::StreamExt;

use super::AppState;
use crate::error::{QueryError, StoreError};
use crate::logs_volume::LogsVolumeProvider;
use crate::models::{DataSource, LogsVolume, QueryRequest};
use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
        .into_response()
}

pub(super) fn store_error_response(e: StoreError) -> Response {
    let status = match &e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::AlreadyExists(_) | StoreError::VersionConflict { .. } => StatusCode::CONFLICT,
        StoreError::InvalidResourceVersion(_) => StatusCode::BAD_REQUEST,
        StoreError::Serialization(_) | StoreError::Database(_) => {
            tracing::warn!(error = %e, "datasource store failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e)
}

pub(super) fn client_error_response(e: QueryError) -> Response {
    let status = match e {
        QueryError::UnsupportedDatasource(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, e)
}

/// GET /api/datasources
pub(super) async fn list_datasources(State(state): State<AppState>) -> Response {
    match state.store.list().await {
        Ok(list) => Json(list).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/datasources
pub(super) async fn create_datasource(
    State(state): State<AppState>,
    Json(ds): Json<DataSource>,
) -> Response {
    if ds.uid.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "uid must be non-empty");
    }
    match state.store.insert(&ds).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// GET /api/datasources/{uid}
pub(super) async fn get_datasource(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Response {
    match state.store.get(&uid).await {
        Ok(ds) => Json(ds).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// PUT /api/datasources/{uid}: body must carry the current resourceVersion.
pub(super) async fn update_datasource(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(ds): Json<DataSource>,
) -> Response {
    if ds.uid != uid {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("uid in body ({}) does not match path ({})", ds.uid, uid),
        );
    }
    match state.store.update(&ds).await {
        Ok(updated) => Json(updated).into_response(),
        Err(e) => store_error_response(e),
    }
}

/// DELETE /api/datasources/{uid}
pub(super) async fn delete_datasource(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Response {
    match state.store.delete(&uid).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => store_error_response(e),
    }
}

/// POST /api/datasources/{uid}/logs-volume: runs the volume query to completion and
/// returns the terminal snapshot (502 if the datasource failed).
pub(super) async fn logs_volume_handler(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Response {
    let ds = match state.store.get(&uid).await {
        Ok(ds) => ds,
        Err(e) => return store_error_response(e),
    };
    let client = match state.clients.client_for(&ds) {
        Ok(c) => c,
        Err(e) => return client_error_response(e),
    };

    let mut provider = LogsVolumeProvider::new(client, request);
    let mut stream = provider.get_data();
    let mut last: Option<LogsVolume> = None;
    while let Some(snapshot) = stream.next().await {
        last = Some(snapshot);
    }

    match last {
        Some(snapshot) if snapshot.error.is_some() => {
            (StatusCode::BAD_GATEWAY, Json(snapshot)).into_response()
        }
        Some(snapshot) => Json(snapshot).into_response(),
        None => error_response(StatusCode::INTERNAL_SERVER_ERROR, "logs volume stream ended early"),
    }
}
