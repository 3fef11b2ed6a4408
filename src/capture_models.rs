use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationErrors;
use crate::models::{LeadRecord, LeadScore, LeadSourceAttribution};

// ============ Shared Request DTOs ============

/// Contact information common to all lead submissions.
///
/// Fields arrive as plain strings and are validated explicitly; the
/// domain enums are only constructed after validation passes.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDto {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferred_contact_method: Option<String>,
}

/// Property information for lead submissions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDto {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub estimated_value: Option<BigDecimal>,
}

/// Service request information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRequestDto {
    pub service_type: String,
    #[serde(default)]
    pub timeline: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// UTM tracking parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtmParamsDto {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub campaign: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub term: Option<String>,
}

/// Session data recorded alongside web form submissions.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDataDto {
    #[serde(default)]
    pub pages_visited: Option<Vec<String>>,
    #[serde(default)]
    pub time_on_site: Option<i32>,
}

// ============ Channel Request DTOs ============

/// Web form lead submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebFormLeadRequest {
    pub source: String,
    pub page_url: String,
    #[serde(default)]
    pub utm_params: Option<UtmParamsDto>,
    pub contact: ContactDto,
    #[serde(default)]
    pub property: Option<PropertyDto>,
    pub service_request: ServiceRequestDto,
    pub gdpr_consent: bool,
    #[serde(default)]
    pub marketing_consent: Option<bool>,
    #[serde(default)]
    pub referrer: Option<String>,
    #[serde(default)]
    pub session_data: Option<SessionDataDto>,
}

/// Lead pushed by an ad platform's webhook.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdPlatformWebhookRequest {
    pub platform: String,
    pub campaign_id: String,
    pub campaign_name: String,
    #[serde(default)]
    pub ad_group_id: Option<String>,
    #[serde(default)]
    pub ad_id: Option<String>,
    pub form_id: String,
    pub submitted_at: DateTime<Utc>,
    pub contact: ContactDto,
    #[serde(default)]
    pub custom_fields: Option<serde_json::Value>,
    /// Platform-supplied lead id, used for correlation/idempotency.
    pub platform_lead_id: String,
}

/// Referral submitted by a partner.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerReferralRequest {
    pub partner_id: String,
    pub partner_name: String,
    pub referral_type: String,
    pub contact: ContactDto,
    #[serde(default)]
    pub property: Option<PropertyDto>,
    pub service_request: ServiceRequestDto,
    #[serde(default)]
    pub referral_agreement: Option<ReferralAgreementDto>,
}

/// Commission terms attached to a partner referral.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralAgreementDto {
    #[serde(default)]
    pub commission_rate: Option<BigDecimal>,
    #[serde(default)]
    pub commission_type: Option<String>,
}

/// Bulk upload from a property developer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperBulkRequest {
    pub developer_id: String,
    pub development_name: String,
    #[serde(default)]
    pub development_location: Option<String>,
    pub leads: Vec<DeveloperLeadDto>,
}

/// One lead within a developer bulk upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperLeadDto {
    pub contact: ContactDto,
    pub property: DeveloperPropertyDto,
    pub service_request: ServiceRequestDto,
}

/// Property details for developer leads.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperPropertyDto {
    #[serde(default)]
    pub development_unit: Option<String>,
    #[serde(default)]
    pub plot_number: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub price: Option<BigDecimal>,
    #[serde(default)]
    pub purchase_stage: Option<String>,
}

/// Event registration submission, one lead per registrant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistrationRequest {
    pub event_type: String,
    pub event_name: String,
    #[serde(default)]
    pub event_date: Option<DateTime<Utc>>,
    pub registrants: Vec<EventRegistrantDto>,
}

/// One registrant within an event registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistrantDto {
    pub contact: ContactDto,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
    #[serde(default)]
    pub questions: Option<Vec<String>>,
}

// ============ Response DTOs ============

/// Capture result status. `DuplicateMerged` is a label only: a
/// matching prior lead existed within the lookback window, but the
/// new record is still created independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureStatus {
    #[serde(rename = "captured")]
    Captured,
    #[serde(rename = "duplicate-merged")]
    DuplicateMerged,
}

/// Standard response for single lead capture.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadCaptureResponse {
    pub lead_id: Uuid,
    pub status: CaptureStatus,
    pub captured_at: DateTime<Utc>,
}

/// Response for bulk lead upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkLeadCaptureResponse {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub lead_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<BulkLeadError>>,
}

/// Error information for one failed item in a bulk upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkLeadError {
    pub index: usize,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<ValidationErrors>,
}

/// Response for event registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistrationResponse {
    pub registered: usize,
    pub lead_ids: Vec<Uuid>,
}

/// Full lead representation for read endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadResponse {
    pub id: Uuid,
    pub external_lead_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub postcode: Option<String>,
    pub property_type: Option<String>,
    pub service_type: String,
    pub timeline: Option<String>,
    pub urgency: Option<String>,
    pub message: Option<String>,
    pub gdpr_consent: bool,
    pub marketing_consent: bool,
    pub preferred_contact_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub score: Option<LeadScoreResponse>,
    pub source_attributions: Vec<LeadSourceAttributionResponse>,
}

impl LeadResponse {
    /// Maps a stored record to the wire representation.
    pub fn from_record(record: &LeadRecord) -> Self {
        let lead = &record.lead;
        Self {
            id: lead.id,
            external_lead_id: lead.external_lead_id.clone(),
            first_name: lead.first_name.clone(),
            last_name: lead.last_name.clone(),
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            address: lead.address.clone(),
            postcode: lead.postcode.clone(),
            property_type: lead.property_type.map(|p| p.as_str().to_string()),
            service_type: lead.service_type.as_str().to_string(),
            timeline: lead.timeline.map(|t| t.as_str().to_string()),
            urgency: lead.urgency.map(|u| u.as_str().to_string()),
            message: lead.message.clone(),
            gdpr_consent: lead.gdpr_consent,
            marketing_consent: lead.marketing_consent,
            preferred_contact_method: lead
                .preferred_contact_method
                .map(|m| m.as_str().to_string()),
            created_at: lead.created_at,
            updated_at: lead.updated_at,
            score: record.score.as_ref().map(LeadScoreResponse::from_score),
            source_attributions: record
                .attributions
                .iter()
                .map(LeadSourceAttributionResponse::from_attribution)
                .collect(),
        }
    }
}

/// Score sub-resource embedded in lead reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadScoreResponse {
    pub overall_score: i32,
    pub tier: String,
    pub completeness_score: i32,
    pub engagement_score: i32,
    pub readiness_score: i32,
    pub source_quality_score: i32,
    pub calculated_at: DateTime<Utc>,
}

impl LeadScoreResponse {
    pub fn from_score(score: &LeadScore) -> Self {
        Self {
            overall_score: score.overall_score,
            tier: score.tier.as_str().to_string(),
            completeness_score: score.completeness_score,
            engagement_score: score.engagement_score,
            readiness_score: score.readiness_score,
            source_quality_score: score.source_quality_score,
            calculated_at: score.calculated_at,
        }
    }
}

/// Attribution entries embedded in lead reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSourceAttributionResponse {
    pub channel: String,
    pub source: Option<String>,
    pub campaign: Option<String>,
    pub medium: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_content: Option<String>,
    pub utm_term: Option<String>,
    pub referrer: Option<String>,
    pub landing_page: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl LeadSourceAttributionResponse {
    pub fn from_attribution(attribution: &LeadSourceAttribution) -> Self {
        Self {
            channel: attribution.channel.as_str().to_string(),
            source: attribution.source.clone(),
            campaign: attribution.campaign.clone(),
            medium: attribution.medium.clone(),
            utm_source: attribution.utm_source.clone(),
            utm_medium: attribution.utm_medium.clone(),
            utm_campaign: attribution.utm_campaign.clone(),
            utm_content: attribution.utm_content.clone(),
            utm_term: attribution.utm_term.clone(),
            referrer: attribution.referrer.clone(),
            landing_page: attribution.landing_page.clone(),
            captured_at: attribution.captured_at,
        }
    }
}

/// Paginated list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListResponse {
    pub leads: Vec<LeadResponse>,
    pub total_count: i64,
    pub page: i64,
    pub page_size: i64,
}

// ============ Query Parameters ============

/// Query parameters for the lead list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    /// Matches against any associated attribution's source.
    #[serde(default)]
    pub source: Option<String>,
    /// Matches against any associated attribution's channel.
    #[serde(default)]
    pub channel: Option<String>,
    /// Inclusive lower bound on lead creation time.
    #[serde(default)]
    pub from_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on lead creation time.
    #[serde(default)]
    pub to_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_form_request_parses_camel_case() {
        let json = r#"
        {
            "source": "contact-form",
            "pageUrl": "https://example.co.uk/contact",
            "utmParams": {"source": "google", "campaign": "spring"},
            "contact": {
                "firstName": "Jane",
                "lastName": "Doe",
                "email": "Jane.Doe@Example.com",
                "phone": "07700900123"
            },
            "serviceRequest": {"serviceType": "purchase", "timeline": "1-month"},
            "gdprConsent": true
        }
        "#;

        let request: WebFormLeadRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.source, "contact-form");
        assert_eq!(request.contact.first_name, "Jane");
        assert_eq!(request.service_request.timeline.as_deref(), Some("1-month"));
        assert!(request.gdpr_consent);
        assert!(request.marketing_consent.is_none());
        assert!(request.property.is_none());
    }

    #[test]
    fn capture_status_serializes_as_wire_labels() {
        assert_eq!(
            serde_json::to_string(&CaptureStatus::Captured).unwrap(),
            "\"captured\""
        );
        assert_eq!(
            serde_json::to_string(&CaptureStatus::DuplicateMerged).unwrap(),
            "\"duplicate-merged\""
        );
    }

    #[test]
    fn bulk_errors_are_omitted_when_absent() {
        let response = BulkLeadCaptureResponse {
            processed: 2,
            successful: 2,
            failed: 0,
            lead_ids: vec![],
            errors: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["leadIds"], serde_json::json!([]));
    }
}
