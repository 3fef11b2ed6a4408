use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::capture::LeadCaptureService;
use crate::capture_models::{LeadListParams, LeadListResponse, LeadResponse};
use crate::config::Config;
use crate::errors::AppError;
use crate::repository::PgLeadRepository;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    /// Builds a capture service over the Postgres store. Services are
    /// cheap per-request constructions; the pool is the only shared
    /// state.
    pub fn capture_service(&self) -> LeadCaptureService<PgLeadRepository> {
        LeadCaptureService::new(
            PgLeadRepository::new(self.db.clone()),
            self.config.default_page_size,
            self.config.max_page_size,
        )
    }
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-capture-api",
            "version": "0.1.0"
        })),
    )
}

/// GET /api/v1/leads/:id
///
/// Fetches one lead with its score and source attributions. Soft
/// deleted leads are invisible here.
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeadResponse>, AppError> {
    let lead = state.capture_service().get_lead(id).await?;
    Ok(Json(lead))
}

/// GET /api/v1/leads
///
/// Paginated listing, newest first, with optional source, channel and
/// creation-date filters.
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LeadListParams>,
) -> Result<Json<LeadListResponse>, AppError> {
    let response = state.capture_service().list_leads(params).await?;
    Ok(Json(response))
}

/// DELETE /api/v1/leads/:id
///
/// Soft delete: the row stays, every default read path skips it.
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.capture_service().delete_lead(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
