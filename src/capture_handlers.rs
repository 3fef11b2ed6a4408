//! HTTP entry points for the five capture channels.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

use crate::capture_models::{
    AdPlatformWebhookRequest, BulkLeadCaptureResponse, DeveloperBulkRequest,
    EventRegistrationRequest, EventRegistrationResponse, LeadCaptureResponse,
    PartnerReferralRequest, WebFormLeadRequest,
};
use crate::errors::AppError;
use crate::handlers::AppState;

/// Client IP for attribution, preferring proxy headers. Attribution
/// is best-effort; an unidentifiable client records "unknown".
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// POST /api/v1/leads/web-form
///
/// The direct submission channel: fully validated, GDPR-gated, with
/// IP and user agent recorded on the attribution.
pub async fn capture_web_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<WebFormLeadRequest>,
) -> Result<(StatusCode, Json<LeadCaptureResponse>), AppError> {
    let ip = client_ip(&headers);
    let agent = user_agent(&headers);

    let response = state
        .capture_service()
        .capture_web_form(request, ip, agent)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/leads/ad-platform-webhook
///
/// Push channel for ad platforms. Always 200 on success so the
/// platform does not retry.
pub async fn capture_ad_platform(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AdPlatformWebhookRequest>,
) -> Result<Json<LeadCaptureResponse>, AppError> {
    let response = state.capture_service().capture_ad_platform(request).await?;
    Ok(Json(response))
}

/// POST /api/v1/leads/partner-referral
pub async fn capture_partner_referral(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PartnerReferralRequest>,
) -> Result<(StatusCode, Json<LeadCaptureResponse>), AppError> {
    let response = state
        .capture_service()
        .capture_partner_referral(request)
        .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /api/v1/leads/developer-bulk
///
/// Item failures are embedded in the 200 response body, never
/// surfaced as a request-level error.
pub async fn capture_developer_bulk(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeveloperBulkRequest>,
) -> Result<Json<BulkLeadCaptureResponse>, AppError> {
    let response = state
        .capture_service()
        .capture_developer_bulk(request)
        .await?;

    Ok(Json(response))
}

/// POST /api/v1/leads/event-registration
pub async fn capture_event_registration(
    State(state): State<Arc<AppState>>,
    Json(request): Json<EventRegistrationRequest>,
) -> Result<Json<EventRegistrationResponse>, AppError> {
    let response = state
        .capture_service()
        .capture_event_registration(request)
        .await?;

    Ok(Json(response))
}
