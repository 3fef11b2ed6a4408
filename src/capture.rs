//! Capture orchestration: one operation per intake channel, plus the
//! read, list, delete and score-recording paths.
//!
//! Every channel follows the same sequence: normalize contact fields,
//! check the duplicate window, assemble the lead and its single
//! attribution, persist. The duplicate check is label-only; a match
//! still creates an independent record, flagged "duplicate-merged" in
//! the response. The check and the insert are not atomic, so two
//! concurrent submissions of the same contact can both come back
//! "captured".

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::capture_models::{
    AdPlatformWebhookRequest, BulkLeadCaptureResponse, BulkLeadError, CaptureStatus, ContactDto,
    DeveloperBulkRequest, EventRegistrationRequest, EventRegistrationResponse,
    LeadCaptureResponse, LeadListParams, LeadListResponse, LeadResponse, PartnerReferralRequest,
    WebFormLeadRequest,
};
use crate::errors::{AppError, ValidationErrors};
use crate::models::{
    Channel, ContactMethod, Lead, LeadSourceAttribution, PropertyType, ServiceType, Timeline,
};
use crate::normalize::{normalize_email, normalize_phone, normalize_postcode};
use crate::repository::{LeadListFilter, LeadStore};
use crate::scoring::{build_score, ScoreComponents};
use crate::validation::{
    validate_bulk_item, validate_contact, validate_property, validate_service_request,
    validate_web_form,
};

/// Lookback window for the duplicate check.
pub const DUPLICATE_WINDOW_DAYS: i64 = 30;

/// Hard cap on items processed per bulk upload. Items beyond the cap
/// are silently ignored; `processed` still reports the submitted
/// total.
pub const BULK_MAX_ITEMS: usize = 1000;

/// Orchestrates lead capture over any `LeadStore` implementation.
pub struct LeadCaptureService<R: LeadStore> {
    store: R,
    default_page_size: i64,
    max_page_size: i64,
}

impl<R: LeadStore> LeadCaptureService<R> {
    pub fn new(store: R, default_page_size: i64, max_page_size: i64) -> Self {
        Self {
            store,
            default_page_size,
            max_page_size,
        }
    }

    /// Duplicate-window check against normalized contact fields.
    async fn capture_status(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<CaptureStatus, AppError> {
        let since = Utc::now() - Duration::days(DUPLICATE_WINDOW_DAYS);
        let duplicate = self.store.exists_since(email, phone, since).await?;
        Ok(if duplicate {
            CaptureStatus::DuplicateMerged
        } else {
            CaptureStatus::Captured
        })
    }

    /// Captures a validated web form submission. The only channel with
    /// a GDPR gate; IP address and user agent are recorded on the
    /// attribution.
    pub async fn capture_web_form(
        &self,
        request: WebFormLeadRequest,
        ip_address: String,
        user_agent: Option<String>,
    ) -> Result<LeadCaptureResponse, AppError> {
        validate_web_form(&request)?;

        let email = normalize_email(&request.contact.email);
        let phone = normalize_phone(request.contact.phone.as_deref());
        let status = self.capture_status(&email, phone.as_deref()).await?;

        let lead_id = Uuid::new_v4();
        let lead = Lead {
            id: lead_id,
            external_lead_id: Uuid::new_v4().to_string(),
            first_name: request.contact.first_name.clone(),
            last_name: request.contact.last_name.clone(),
            email,
            phone,
            address: request.property.as_ref().and_then(|p| p.address.clone()),
            postcode: normalize_postcode(
                request
                    .property
                    .as_ref()
                    .and_then(|p| p.postcode.as_deref()),
            ),
            property_type: parse_optional(
                request
                    .property
                    .as_ref()
                    .and_then(|p| p.property_type.as_deref()),
                PropertyType::parse_str,
                "property type",
            )?,
            service_type: parse_required(
                &request.service_request.service_type,
                ServiceType::parse_str,
                "service type",
            )?,
            timeline: parse_optional(
                request.service_request.timeline.as_deref(),
                Timeline::parse_str,
                "timeline",
            )?,
            urgency: None,
            message: request.service_request.message.clone(),
            gdpr_consent: request.gdpr_consent,
            marketing_consent: request.marketing_consent.unwrap_or(false),
            preferred_contact_method: parse_optional(
                request.contact.preferred_contact_method.as_deref(),
                ContactMethod::parse_str,
                "contact method",
            )?,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            version: 1,
        };

        let utm = request.utm_params.as_ref();
        let attribution = LeadSourceAttribution {
            id: Uuid::new_v4(),
            lead_id,
            channel: Channel::WebForm,
            source: Some(request.source),
            campaign: None,
            medium: None,
            utm_source: utm.and_then(|u| u.source.clone()),
            utm_medium: utm.and_then(|u| u.medium.clone()),
            utm_campaign: utm.and_then(|u| u.campaign.clone()),
            utm_content: utm.and_then(|u| u.content.clone()),
            utm_term: utm.and_then(|u| u.term.clone()),
            referrer: request.referrer,
            landing_page: Some(request.page_url),
            ip_address: Some(ip_address),
            user_agent,
            captured_at: Utc::now(),
        };

        let created = self.store.create(lead, attribution).await?;
        tracing::info!("Web form lead {} captured ({:?})", created.id, status);

        Ok(LeadCaptureResponse {
            lead_id: created.id,
            status,
            captured_at: created.created_at,
        })
    }

    /// Captures a lead pushed by an ad platform webhook.
    ///
    /// The platform already collected consent, so GDPR consent is
    /// recorded as granted; service type is forced to `other` until a
    /// human qualifies the lead. The platform's own lead id becomes
    /// the external id. Unknown optional fields are dropped rather
    /// than rejected; platforms cannot be asked to resubmit.
    pub async fn capture_ad_platform(
        &self,
        request: AdPlatformWebhookRequest,
    ) -> Result<LeadCaptureResponse, AppError> {
        let email = normalize_email(&request.contact.email);
        let phone = normalize_phone(request.contact.phone.as_deref());
        let status = self.capture_status(&email, phone.as_deref()).await?;

        let lead_id = Uuid::new_v4();
        let lead = Lead {
            id: lead_id,
            external_lead_id: request.platform_lead_id.clone(),
            first_name: request.contact.first_name.clone(),
            last_name: request.contact.last_name.clone(),
            email,
            phone,
            address: None,
            postcode: None,
            property_type: None,
            service_type: ServiceType::Other,
            timeline: None,
            urgency: None,
            message: None,
            gdpr_consent: true,
            marketing_consent: false,
            preferred_contact_method: lenient_contact_method(&request.contact),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            version: 1,
        };

        let attribution = LeadSourceAttribution {
            id: Uuid::new_v4(),
            lead_id,
            channel: Channel::AdPlatform,
            source: Some(request.platform),
            campaign: Some(request.campaign_name),
            medium: Some("paid".to_string()),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_content: None,
            utm_term: None,
            referrer: None,
            landing_page: None,
            ip_address: None,
            user_agent: None,
            captured_at: Utc::now(),
        };

        let created = self.store.create(lead, attribution).await?;
        tracing::info!(
            "Ad platform lead {} captured (platform lead {})",
            created.id,
            created.external_lead_id
        );

        Ok(LeadCaptureResponse {
            lead_id: created.id,
            status,
            captured_at: created.created_at,
        })
    }

    /// Captures a referral submitted by a partner. Consent is implied
    /// by the referral agreement; the partner id, name and referral
    /// type land on the attribution as source, campaign and medium.
    pub async fn capture_partner_referral(
        &self,
        request: PartnerReferralRequest,
    ) -> Result<LeadCaptureResponse, AppError> {
        let mut errors = ValidationErrors::new();
        validate_contact(&request.contact, "contact", &mut errors);
        validate_service_request(&request.service_request, "serviceRequest", &mut errors);
        if let Some(property) = &request.property {
            validate_property(property, "property", &mut errors);
        }
        errors.into_result()?;

        let email = normalize_email(&request.contact.email);
        let phone = normalize_phone(request.contact.phone.as_deref());
        let status = self.capture_status(&email, phone.as_deref()).await?;

        let lead_id = Uuid::new_v4();
        let lead = Lead {
            id: lead_id,
            external_lead_id: Uuid::new_v4().to_string(),
            first_name: request.contact.first_name.clone(),
            last_name: request.contact.last_name.clone(),
            email,
            phone,
            address: request.property.as_ref().and_then(|p| p.address.clone()),
            postcode: normalize_postcode(
                request
                    .property
                    .as_ref()
                    .and_then(|p| p.postcode.as_deref()),
            ),
            property_type: parse_optional(
                request
                    .property
                    .as_ref()
                    .and_then(|p| p.property_type.as_deref()),
                PropertyType::parse_str,
                "property type",
            )?,
            service_type: parse_required(
                &request.service_request.service_type,
                ServiceType::parse_str,
                "service type",
            )?,
            timeline: parse_optional(
                request.service_request.timeline.as_deref(),
                Timeline::parse_str,
                "timeline",
            )?,
            urgency: None,
            message: request.service_request.message.clone(),
            gdpr_consent: true,
            marketing_consent: false,
            preferred_contact_method: parse_optional(
                request.contact.preferred_contact_method.as_deref(),
                ContactMethod::parse_str,
                "contact method",
            )?,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
            version: 1,
        };

        let attribution = LeadSourceAttribution {
            id: Uuid::new_v4(),
            lead_id,
            channel: Channel::PartnerReferral,
            source: Some(request.partner_id),
            campaign: Some(request.partner_name),
            medium: Some(request.referral_type),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_content: None,
            utm_term: None,
            referrer: None,
            landing_page: None,
            ip_address: None,
            user_agent: None,
            captured_at: Utc::now(),
        };

        let created = self.store.create(lead, attribution).await?;
        tracing::info!("Partner referral lead {} captured", created.id);

        Ok(LeadCaptureResponse {
            lead_id: created.id,
            status,
            captured_at: created.created_at,
        })
    }

    /// Captures a bulk upload from a property developer.
    ///
    /// Items are processed sequentially and independently: a bad item
    /// is reported in the `errors` array with its index and does not
    /// abort the batch. At most `BULK_MAX_ITEMS` items are processed;
    /// the reported `processed` count is the submitted total.
    pub async fn capture_developer_bulk(
        &self,
        request: DeveloperBulkRequest,
    ) -> Result<BulkLeadCaptureResponse, AppError> {
        let submitted = request.leads.len();
        let mut lead_ids = Vec::new();
        let mut errors: Vec<BulkLeadError> = Vec::new();

        for (index, item) in request.leads.into_iter().take(BULK_MAX_ITEMS).enumerate() {
            if let Err(validation_errors) = validate_bulk_item(&item) {
                errors.push(BulkLeadError {
                    index,
                    message: "Validation failed".to_string(),
                    validation_errors: Some(validation_errors),
                });
                continue;
            }

            let email = normalize_email(&item.contact.email);
            let phone = normalize_phone(item.contact.phone.as_deref());

            let lead_id = Uuid::new_v4();
            let lead = Lead {
                id: lead_id,
                external_lead_id: Uuid::new_v4().to_string(),
                first_name: item.contact.first_name.clone(),
                last_name: item.contact.last_name.clone(),
                email,
                phone,
                address: None,
                postcode: None,
                property_type: parse_optional(
                    item.property.property_type.as_deref(),
                    PropertyType::parse_str,
                    "property type",
                )?,
                service_type: parse_required(
                    &item.service_request.service_type,
                    ServiceType::parse_str,
                    "service type",
                )?,
                timeline: parse_optional(
                    item.service_request.timeline.as_deref(),
                    Timeline::parse_str,
                    "timeline",
                )?,
                urgency: None,
                message: item.service_request.message.clone(),
                gdpr_consent: true,
                marketing_consent: false,
                preferred_contact_method: lenient_contact_method(&item.contact),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
                version: 1,
            };

            let attribution = LeadSourceAttribution {
                id: Uuid::new_v4(),
                lead_id,
                channel: Channel::DeveloperBulk,
                source: Some(request.developer_id.clone()),
                campaign: Some(request.development_name.clone()),
                medium: Some("bulk-upload".to_string()),
                utm_source: None,
                utm_medium: None,
                utm_campaign: None,
                utm_content: None,
                utm_term: None,
                referrer: None,
                landing_page: None,
                ip_address: None,
                user_agent: None,
                captured_at: Utc::now(),
            };

            match self.store.create(lead, attribution).await {
                Ok(created) => lead_ids.push(created.id),
                Err(e) => {
                    tracing::warn!("Bulk item {} failed: {}", index, e);
                    errors.push(BulkLeadError {
                        index,
                        message: e.to_string(),
                        validation_errors: None,
                    });
                }
            }
        }

        let successful = lead_ids.len();
        let failed = errors.len();
        tracing::info!(
            "Bulk upload from {}: {} submitted, {} created, {} failed",
            request.developer_id,
            submitted,
            successful,
            failed
        );

        Ok(BulkLeadCaptureResponse {
            processed: submitted,
            successful,
            failed,
            lead_ids,
            errors: if errors.is_empty() {
                None
            } else {
                Some(errors)
            },
        })
    }

    /// Captures an event registration, creating one lead per
    /// registrant. Registrants share the event's attribution fields.
    pub async fn capture_event_registration(
        &self,
        request: EventRegistrationRequest,
    ) -> Result<EventRegistrationResponse, AppError> {
        let mut lead_ids = Vec::with_capacity(request.registrants.len());

        for registrant in &request.registrants {
            let email = normalize_email(&registrant.contact.email);
            let phone = normalize_phone(registrant.contact.phone.as_deref());

            let lead_id = Uuid::new_v4();
            let lead = Lead {
                id: lead_id,
                external_lead_id: Uuid::new_v4().to_string(),
                first_name: registrant.contact.first_name.clone(),
                last_name: registrant.contact.last_name.clone(),
                email,
                phone,
                address: None,
                postcode: None,
                property_type: None,
                service_type: ServiceType::Other,
                timeline: None,
                urgency: None,
                message: None,
                gdpr_consent: true,
                marketing_consent: false,
                preferred_contact_method: lenient_contact_method(&registrant.contact),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
                version: 1,
            };

            let attribution = LeadSourceAttribution {
                id: Uuid::new_v4(),
                lead_id,
                channel: Channel::EventRegistration,
                source: Some(request.event_type.clone()),
                campaign: Some(request.event_name.clone()),
                medium: Some("event".to_string()),
                utm_source: None,
                utm_medium: None,
                utm_campaign: None,
                utm_content: None,
                utm_term: None,
                referrer: None,
                landing_page: None,
                ip_address: None,
                user_agent: None,
                captured_at: Utc::now(),
            };

            let created = self.store.create(lead, attribution).await?;
            lead_ids.push(created.id);
        }

        tracing::info!(
            "Event '{}': {} registrants captured",
            request.event_name,
            lead_ids.len()
        );

        Ok(EventRegistrationResponse {
            registered: lead_ids.len(),
            lead_ids,
        })
    }

    /// Fetches one lead with its score and attributions.
    pub async fn get_lead(&self, id: Uuid) -> Result<LeadResponse, AppError> {
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))?;

        Ok(LeadResponse::from_record(&record))
    }

    /// Paginated, filtered listing. Page numbers below 1 snap to 1;
    /// page size defaults and clamps per configuration.
    pub async fn list_leads(&self, params: LeadListParams) -> Result<LeadListResponse, AppError> {
        let page = params.page.unwrap_or(1).max(1);
        let page_size = params
            .page_size
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);

        let channel = params
            .channel
            .as_deref()
            .map(|c| {
                Channel::parse_str(c).ok_or_else(|| {
                    let mut errors = ValidationErrors::new();
                    errors.add("channel", "Unknown channel");
                    AppError::Validation(errors)
                })
            })
            .transpose()?;

        let filter = LeadListFilter {
            page,
            page_size,
            source: params.source,
            channel,
            from_date: params.from_date,
            to_date: params.to_date,
        };

        let (records, total_count) = self.store.list(&filter).await?;

        Ok(LeadListResponse {
            leads: records.iter().map(LeadResponse::from_record).collect(),
            total_count,
            page,
            page_size,
        })
    }

    /// Soft-deletes a lead, excluding it from all subsequent reads.
    pub async fn delete_lead(&self, id: Uuid) -> Result<(), AppError> {
        if self.store.soft_delete(id).await? {
            tracing::info!("Lead {} soft-deleted", id);
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Lead {} not found", id)))
        }
    }

    /// Persists externally computed score components for a lead,
    /// deriving overall score and tier.
    pub async fn record_score(
        &self,
        lead_id: Uuid,
        components: ScoreComponents,
    ) -> Result<(), AppError> {
        let score = build_score(lead_id, components)?;
        self.store.save_score(score).await?;
        Ok(())
    }
}

/// Parses a closed enumeration value that validation already vetted.
/// A miss here means validation and the enum drifted apart.
fn parse_required<T>(
    value: &str,
    parse: fn(&str) -> Option<T>,
    what: &str,
) -> Result<T, AppError> {
    parse(value).ok_or_else(|| AppError::Internal(format!("Unmapped {} '{}'", what, value)))
}

fn parse_optional<T>(
    value: Option<&str>,
    parse: fn(&str) -> Option<T>,
    what: &str,
) -> Result<Option<T>, AppError> {
    match value {
        None => Ok(None),
        Some("") => Ok(None),
        Some(v) => parse_required(v, parse, what).map(Some),
    }
}

/// Contact method for push channels: unknown values are dropped, not
/// rejected, since the upstream cannot be asked to resubmit.
fn lenient_contact_method(contact: &ContactDto) -> Option<ContactMethod> {
    contact
        .preferred_contact_method
        .as_deref()
        .and_then(ContactMethod::parse_str)
}
