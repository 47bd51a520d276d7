//! API Handlers
//!
//! HTTP request handlers for each cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::CacheService;
use crate::error::{CacheError, Result};
use crate::models::{
    DeleteResponse, HealthResponse, RecordInput, RecordResponse, SetManyRequest,
    SetManyResponse, SetRecordRequest, SetResponse, SweepResponse,
};
use crate::record::Record;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Shared cache service
    pub service: Arc<CacheService>,
}

impl AppState {
    /// Creates a new AppState around the given service.
    pub fn new(service: CacheService) -> Self {
        Self::from_shared(Arc::new(service))
    }

    /// Creates a new AppState sharing a service with background tasks.
    pub fn from_shared(service: Arc<CacheService>) -> Self {
        Self { service }
    }
}

/// Handler for PUT /tables/:table_id/records
///
/// Stores one record under the request's write condition.
pub async fn set_handler(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Json(req): Json<SetRecordRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::Validation(error_msg));
    }

    let record = req.record.into_record()?;
    let written = state
        .service
        .set(&table_id, &record, req.condition)
        .await?;

    Ok(Json(SetResponse::new(record.key(), written)))
}

/// Handler for PUT /tables/:table_id/batch
///
/// Stores every record in order. Fails as a whole on the first error.
pub async fn set_many_handler(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
    Json(req): Json<SetManyRequest>,
) -> Result<Json<SetManyResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::Validation(error_msg));
    }

    let records = req
        .records
        .into_iter()
        .map(RecordInput::into_record)
        .collect::<Result<Vec<Record>>>()?;
    state
        .service
        .set_many(&table_id, &records, req.condition)
        .await?;

    Ok(Json(SetManyResponse::new(records.len())))
}

/// Handler for GET /tables/:table_id/records/:key
///
/// Returns 404 for missing and expired records alike.
pub async fn get_handler(
    State(state): State<AppState>,
    Path((table_id, key)): Path<(String, String)>,
) -> Result<Json<RecordResponse>> {
    match state.service.get(&table_id, &key).await? {
        Some(record) => Ok(Json(RecordResponse::from(&record))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /tables/:table_id/records/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((table_id, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    state.service.delete(&table_id, &key).await?;

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for POST /tables/:table_id/records/:key/pop
///
/// Returns the record and removes it from the table.
pub async fn pop_handler(
    State(state): State<AppState>,
    Path((table_id, key)): Path<(String, String)>,
) -> Result<Json<RecordResponse>> {
    match state.service.pop(&table_id, &key).await? {
        Some(record) => Ok(Json(RecordResponse::from(&record))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for POST /tables/:table_id/sweep
///
/// Runs an expired-record sweep right away.
pub async fn sweep_handler(
    State(state): State<AppState>,
    Path(table_id): Path<String>,
) -> Result<Json<SweepResponse>> {
    let deleted = state.service.delete_expired(&table_id).await?;

    Ok(Json(SweepResponse { table_id, deleted }))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
