//! Capture orchestration tests over an in-memory store.

use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use lead_capture_api::capture::{LeadCaptureService, BULK_MAX_ITEMS};
use lead_capture_api::capture_models::{
    AdPlatformWebhookRequest, CaptureStatus, ContactDto, DeveloperBulkRequest, DeveloperLeadDto,
    DeveloperPropertyDto, EventRegistrantDto, EventRegistrationRequest, LeadListParams,
    PartnerReferralRequest, PropertyDto, ServiceRequestDto, UtmParamsDto, WebFormLeadRequest,
};
use lead_capture_api::errors::AppError;
use lead_capture_api::models::{
    Channel, Lead, LeadRecord, LeadScore, LeadSourceAttribution, ServiceType,
};
use lead_capture_api::repository::{LeadListFilter, LeadStore};
use lead_capture_api::scoring::ScoreComponents;

// ============ In-Memory Store ============

#[derive(Default)]
struct InMemoryLeadStore {
    leads: Mutex<Vec<Lead>>,
    attributions: Mutex<Vec<LeadSourceAttribution>>,
    scores: Mutex<Vec<LeadScore>>,
}

impl InMemoryLeadStore {
    fn record_for(&self, lead: Lead) -> LeadRecord {
        let score = self
            .scores
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.lead_id == lead.id)
            .cloned();
        let attributions = self
            .attributions
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.lead_id == lead.id)
            .cloned()
            .collect();
        LeadRecord {
            lead,
            score,
            attributions,
        }
    }

    fn lead_count(&self) -> usize {
        self.leads.lock().unwrap().len()
    }
}

impl LeadStore for &InMemoryLeadStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeadRecord>, AppError> {
        let lead = self
            .leads
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == id && l.deleted_at.is_none())
            .cloned();
        Ok(lead.map(|l| self.record_for(l)))
    }

    async fn find_by_email_and_phone(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Option<LeadRecord>, AppError> {
        let mut matches: Vec<Lead> = self
            .leads
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.deleted_at.is_none()
                    && l.email == email
                    && phone.map_or(true, |p| l.phone.as_deref() == Some(p))
            })
            .cloned()
            .collect();
        matches.sort_by_key(|l| std::cmp::Reverse(l.created_at));
        Ok(matches.into_iter().next().map(|l| self.record_for(l)))
    }

    async fn exists_since(
        &self,
        email: &str,
        phone: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        Ok(self.leads.lock().unwrap().iter().any(|l| {
            l.deleted_at.is_none()
                && l.email == email
                && l.created_at >= since
                && phone.map_or(true, |p| l.phone.as_deref() == Some(p))
        }))
    }

    async fn create(
        &self,
        mut lead: Lead,
        mut attribution: LeadSourceAttribution,
    ) -> Result<Lead, AppError> {
        let now = Utc::now();
        lead.created_at = now;
        lead.updated_at = now;
        lead.deleted_at = None;
        lead.version = 1;
        attribution.lead_id = lead.id;
        attribution.captured_at = now;

        self.leads.lock().unwrap().push(lead.clone());
        self.attributions.lock().unwrap().push(attribution);
        Ok(lead)
    }

    async fn update(&self, lead: &Lead) -> Result<Lead, AppError> {
        let mut leads = self.leads.lock().unwrap();
        let stored = leads
            .iter_mut()
            .find(|l| l.id == lead.id && l.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", lead.id)))?;

        if stored.version != lead.version {
            return Err(AppError::Conflict(format!(
                "Lead {} was modified concurrently (stale version {})",
                lead.id, lead.version
            )));
        }

        let mut updated = lead.clone();
        updated.version = stored.version + 1;
        updated.updated_at = Utc::now();
        updated.created_at = stored.created_at;
        *stored = updated.clone();
        Ok(updated)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut leads = self.leads.lock().unwrap();
        match leads
            .iter_mut()
            .find(|l| l.id == id && l.deleted_at.is_none())
        {
            Some(lead) => {
                lead.deleted_at = Some(Utc::now());
                lead.updated_at = Utc::now();
                lead.version += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn save_score(&self, score: LeadScore) -> Result<LeadScore, AppError> {
        let live = self
            .leads
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.id == score.lead_id && l.deleted_at.is_none());
        if !live {
            return Err(AppError::NotFound(format!(
                "Lead {} not found",
                score.lead_id
            )));
        }

        let mut scores = self.scores.lock().unwrap();
        scores.retain(|s| s.lead_id != score.lead_id);
        scores.push(score.clone());
        Ok(score)
    }

    async fn list(&self, filter: &LeadListFilter) -> Result<(Vec<LeadRecord>, i64), AppError> {
        let attributions = self.attributions.lock().unwrap().clone();
        let matches_attribution = |lead_id: Uuid| {
            attributions.iter().filter(move |a| a.lead_id == lead_id)
        };

        let mut matching: Vec<Lead> = self
            .leads
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.deleted_at.is_none())
            .filter(|l| {
                filter
                    .channel
                    .map_or(true, |c| matches_attribution(l.id).any(|a| a.channel == c))
            })
            .filter(|l| {
                filter.source.as_deref().map_or(true, |s| {
                    matches_attribution(l.id).any(|a| a.source.as_deref() == Some(s))
                })
            })
            .filter(|l| filter.from_date.map_or(true, |d| l.created_at >= d))
            .filter(|l| filter.to_date.map_or(true, |d| l.created_at <= d))
            .cloned()
            .collect();

        matching.sort_by_key(|l| std::cmp::Reverse(l.created_at));
        let total = matching.len() as i64;

        let offset = ((filter.page - 1) * filter.page_size) as usize;
        let page: Vec<LeadRecord> = matching
            .into_iter()
            .skip(offset)
            .take(filter.page_size as usize)
            .map(|l| self.record_for(l))
            .collect();

        Ok((page, total))
    }
}

// ============ Fixtures ============

fn service(store: &InMemoryLeadStore) -> LeadCaptureService<&InMemoryLeadStore> {
    LeadCaptureService::new(store, 20, 100)
}

fn contact(email: &str) -> ContactDto {
    ContactDto {
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: email.to_string(),
        phone: Some("07700900123".to_string()),
        preferred_contact_method: Some("email".to_string()),
    }
}

fn web_form(email: &str) -> WebFormLeadRequest {
    WebFormLeadRequest {
        source: "contact-form".to_string(),
        page_url: "https://example.co.uk/contact".to_string(),
        utm_params: Some(UtmParamsDto {
            source: Some("google".to_string()),
            medium: Some("cpc".to_string()),
            campaign: Some("spring-sale".to_string()),
            content: None,
            term: None,
        }),
        contact: contact(email),
        property: Some(PropertyDto {
            address: Some("1 High Street".to_string()),
            postcode: Some("SW1A 1AA".to_string()),
            property_type: Some("flat".to_string()),
            estimated_value: None,
        }),
        service_request: ServiceRequestDto {
            service_type: "purchase".to_string(),
            timeline: Some("1-month".to_string()),
            message: Some("Please call in the afternoon".to_string()),
        },
        gdpr_consent: true,
        marketing_consent: Some(true),
        referrer: Some("https://google.com".to_string()),
        session_data: None,
    }
}

fn bulk_item(email: &str) -> DeveloperLeadDto {
    DeveloperLeadDto {
        contact: contact(email),
        property: DeveloperPropertyDto {
            development_unit: Some("A-12".to_string()),
            plot_number: Some("12".to_string()),
            property_type: Some("flat".to_string()),
            price: None,
            purchase_stage: Some("reservation".to_string()),
        },
        service_request: ServiceRequestDto {
            service_type: "purchase".to_string(),
            timeline: None,
            message: None,
        },
    }
}

// ============ Web Form ============

#[tokio::test]
async fn web_form_assembles_lead_and_attribution() {
    let store = InMemoryLeadStore::default();
    let response = service(&store)
        .capture_web_form(
            web_form("Jane.Doe@Example.com"),
            "203.0.113.7".to_string(),
            Some("Mozilla/5.0".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(response.status, CaptureStatus::Captured);

    let record = (&store).find_by_id(response.lead_id).await.unwrap().unwrap();
    let lead = &record.lead;
    assert_eq!(lead.email, "jane.doe@example.com");
    assert_eq!(lead.phone.as_deref(), Some("+447700900123"));
    assert_eq!(lead.postcode.as_deref(), Some("SW1A 1AA"));
    assert_eq!(lead.service_type, ServiceType::Purchase);
    assert!(lead.gdpr_consent);
    assert!(lead.marketing_consent);
    assert_eq!(lead.version, 1);

    assert_eq!(record.attributions.len(), 1);
    let attribution = &record.attributions[0];
    assert_eq!(attribution.channel, Channel::WebForm);
    assert_eq!(attribution.source.as_deref(), Some("contact-form"));
    assert_eq!(
        attribution.landing_page.as_deref(),
        Some("https://example.co.uk/contact")
    );
    assert_eq!(attribution.utm_source.as_deref(), Some("google"));
    assert_eq!(attribution.ip_address.as_deref(), Some("203.0.113.7"));
    assert_eq!(attribution.user_agent.as_deref(), Some("Mozilla/5.0"));
}

#[tokio::test]
async fn second_submission_within_window_is_flagged_duplicate() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    let first = svc
        .capture_web_form(web_form("dup@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();
    let second = svc
        .capture_web_form(web_form("dup@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    assert_eq!(first.status, CaptureStatus::Captured);
    assert_eq!(second.status, CaptureStatus::DuplicateMerged);
    // Label only: both records exist independently.
    assert_ne!(first.lead_id, second.lead_id);
    assert_eq!(store.lead_count(), 2);
}

#[tokio::test]
async fn duplicate_check_sees_through_formatting() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    svc.capture_web_form(web_form("case@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    // Same contact, different casing and phone formatting.
    let mut request = web_form("CASE@Example.COM");
    request.contact.phone = Some("+447700900123".to_string());
    let response = svc
        .capture_web_form(request, "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    assert_eq!(response.status, CaptureStatus::DuplicateMerged);
}

#[tokio::test]
async fn missing_gdpr_consent_persists_nothing() {
    let store = InMemoryLeadStore::default();
    let mut request = web_form("nogdpr@example.com");
    request.gdpr_consent = false;

    let result = service(&store)
        .capture_web_form(request, "1.2.3.4".to_string(), None)
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(store.lead_count(), 0);
}

// ============ Ad Platform ============

#[tokio::test]
async fn ad_platform_forces_consent_and_service_type() {
    let store = InMemoryLeadStore::default();
    let request = AdPlatformWebhookRequest {
        platform: "google-ads".to_string(),
        campaign_id: "c-123".to_string(),
        campaign_name: "Spring Remortgage".to_string(),
        ad_group_id: None,
        ad_id: None,
        form_id: "f-9".to_string(),
        submitted_at: Utc::now(),
        contact: contact("ads@example.com"),
        custom_fields: None,
        platform_lead_id: "gclid-42".to_string(),
    };

    let response = service(&store).capture_ad_platform(request).await.unwrap();
    let record = (&store).find_by_id(response.lead_id).await.unwrap().unwrap();

    assert_eq!(record.lead.external_lead_id, "gclid-42");
    assert_eq!(record.lead.service_type, ServiceType::Other);
    assert!(record.lead.gdpr_consent);
    assert!(!record.lead.marketing_consent);

    let attribution = &record.attributions[0];
    assert_eq!(attribution.channel, Channel::AdPlatform);
    assert_eq!(attribution.source.as_deref(), Some("google-ads"));
    assert_eq!(attribution.campaign.as_deref(), Some("Spring Remortgage"));
    assert_eq!(attribution.medium.as_deref(), Some("paid"));
}

// ============ Partner Referral ============

#[tokio::test]
async fn partner_referral_maps_partner_fields_to_attribution() {
    let store = InMemoryLeadStore::default();
    let request = PartnerReferralRequest {
        partner_id: "p-77".to_string(),
        partner_name: "Acme Estates".to_string(),
        referral_type: "estate-agent".to_string(),
        contact: contact("referral@example.com"),
        property: None,
        service_request: ServiceRequestDto {
            service_type: "sale".to_string(),
            timeline: Some("3-months".to_string()),
            message: None,
        },
        referral_agreement: None,
    };

    let response = service(&store)
        .capture_partner_referral(request)
        .await
        .unwrap();
    let record = (&store).find_by_id(response.lead_id).await.unwrap().unwrap();

    assert_eq!(record.lead.service_type, ServiceType::Sale);
    assert!(record.lead.gdpr_consent);

    let attribution = &record.attributions[0];
    assert_eq!(attribution.channel, Channel::PartnerReferral);
    assert_eq!(attribution.source.as_deref(), Some("p-77"));
    assert_eq!(attribution.campaign.as_deref(), Some("Acme Estates"));
    assert_eq!(attribution.medium.as_deref(), Some("estate-agent"));
}

#[tokio::test]
async fn partner_referral_with_invalid_service_type_is_rejected() {
    let store = InMemoryLeadStore::default();
    let request = PartnerReferralRequest {
        partner_id: "p-77".to_string(),
        partner_name: "Acme Estates".to_string(),
        referral_type: "estate-agent".to_string(),
        contact: contact("referral@example.com"),
        property: None,
        service_request: ServiceRequestDto {
            service_type: "conveyancing".to_string(),
            timeline: None,
            message: None,
        },
        referral_agreement: None,
    };

    let result = service(&store).capture_partner_referral(request).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(store.lead_count(), 0);
}

// ============ Developer Bulk ============

#[tokio::test]
async fn bulk_upload_isolates_item_failures() {
    let store = InMemoryLeadStore::default();
    let mut bad = bulk_item("broken");
    bad.contact.email = "not-an-email".to_string();

    let request = DeveloperBulkRequest {
        developer_id: "dev-5".to_string(),
        development_name: "Riverside Quarter".to_string(),
        development_location: Some("Leeds".to_string()),
        leads: vec![
            bulk_item("buyer1@example.com"),
            bulk_item("buyer2@example.com"),
            bad,
            bulk_item("buyer3@example.com"),
        ],
    };

    let response = service(&store)
        .capture_developer_bulk(request)
        .await
        .unwrap();

    assert_eq!(response.processed, 4);
    assert_eq!(response.successful, 3);
    assert_eq!(response.failed, 1);
    assert_eq!(response.lead_ids.len(), 3);

    let errors = response.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].index, 2);
    assert!(errors[0]
        .validation_errors
        .as_ref()
        .unwrap()
        .0
        .contains_key("contact.email"));

    // The good items all carry the developer attribution.
    let record = (&store)
        .find_by_id(response.lead_ids[0])
        .await
        .unwrap()
        .unwrap();
    let attribution = &record.attributions[0];
    assert_eq!(attribution.channel, Channel::DeveloperBulk);
    assert_eq!(attribution.source.as_deref(), Some("dev-5"));
    assert_eq!(attribution.campaign.as_deref(), Some("Riverside Quarter"));
    assert_eq!(attribution.medium.as_deref(), Some("bulk-upload"));
}

#[tokio::test]
async fn bulk_upload_caps_processing_at_limit() {
    let store = InMemoryLeadStore::default();
    let leads: Vec<DeveloperLeadDto> = (0..BULK_MAX_ITEMS + 5)
        .map(|i| bulk_item(&format!("buyer{}@example.com", i)))
        .collect();

    let request = DeveloperBulkRequest {
        developer_id: "dev-5".to_string(),
        development_name: "Riverside Quarter".to_string(),
        development_location: None,
        leads,
    };

    let response = service(&store)
        .capture_developer_bulk(request)
        .await
        .unwrap();

    // Submitted total is reported; items beyond the cap are dropped.
    assert_eq!(response.processed, BULK_MAX_ITEMS + 5);
    assert_eq!(response.successful, BULK_MAX_ITEMS);
    assert_eq!(store.lead_count(), BULK_MAX_ITEMS);
}

// ============ Event Registration ============

#[tokio::test]
async fn event_registration_creates_one_lead_per_registrant() {
    let store = InMemoryLeadStore::default();
    let request = EventRegistrationRequest {
        event_type: "webinar".to_string(),
        event_name: "First Time Buyers 101".to_string(),
        event_date: Some(Utc::now()),
        registrants: vec![
            EventRegistrantDto {
                contact: contact("alice@example.com"),
                company: Some("Acme".to_string()),
                job_title: None,
                interests: None,
                questions: None,
            },
            EventRegistrantDto {
                contact: contact("bob@example.com"),
                company: None,
                job_title: None,
                interests: None,
                questions: None,
            },
        ],
    };

    let response = service(&store)
        .capture_event_registration(request)
        .await
        .unwrap();

    assert_eq!(response.registered, 2);
    assert_eq!(response.lead_ids.len(), 2);

    let record = (&store)
        .find_by_id(response.lead_ids[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.lead.service_type, ServiceType::Other);
    let attribution = &record.attributions[0];
    assert_eq!(attribution.channel, Channel::EventRegistration);
    assert_eq!(attribution.source.as_deref(), Some("webinar"));
    assert_eq!(
        attribution.campaign.as_deref(),
        Some("First Time Buyers 101")
    );
    assert_eq!(attribution.medium.as_deref(), Some("event"));
}

// ============ Listing and Pagination ============

#[tokio::test]
async fn listing_paginates_and_counts_the_filtered_set() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    for i in 0..25 {
        svc.capture_web_form(
            web_form(&format!("lead{}@example.com", i)),
            "1.2.3.4".to_string(),
            None,
        )
        .await
        .unwrap();
    }

    let page2 = svc
        .list_leads(LeadListParams {
            page: Some(2),
            page_size: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page2.leads.len(), 10);
    assert_eq!(page2.total_count, 25);
    assert_eq!(page2.page, 2);
    assert_eq!(page2.page_size, 10);

    let last = svc
        .list_leads(LeadListParams {
            page: Some(3),
            page_size: Some(10),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(last.leads.len(), 5);
}

#[tokio::test]
async fn page_parameters_are_normalized() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    svc.capture_web_form(web_form("a@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    // Page below 1 snaps to 1.
    let response = svc
        .list_leads(LeadListParams {
            page: Some(0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(response.page, 1);
    assert_eq!(response.page_size, 20);

    // Oversized page size clamps to the configured maximum.
    let response = svc
        .list_leads(LeadListParams {
            page_size: Some(500),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(response.page_size, 100);
}

#[tokio::test]
async fn listing_filters_by_channel() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    svc.capture_web_form(web_form("web@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();
    svc.capture_event_registration(EventRegistrationRequest {
        event_type: "seminar".to_string(),
        event_name: "Moving Day".to_string(),
        event_date: None,
        registrants: vec![EventRegistrantDto {
            contact: contact("event@example.com"),
            company: None,
            job_title: None,
            interests: None,
            questions: None,
        }],
    })
    .await
    .unwrap();

    let response = svc
        .list_leads(LeadListParams {
            channel: Some("event-registration".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(response.total_count, 1);
    assert_eq!(response.leads[0].email, "event@example.com");

    let unknown = svc
        .list_leads(LeadListParams {
            channel: Some("carrier-pigeon".to_string()),
            ..Default::default()
        })
        .await;
    assert!(matches!(unknown, Err(AppError::Validation(_))));
}

// ============ Soft Delete ============

#[tokio::test]
async fn deleted_leads_disappear_from_reads() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    let response = svc
        .capture_web_form(web_form("gone@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    svc.delete_lead(response.lead_id).await.unwrap();

    assert!(matches!(
        svc.get_lead(response.lead_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        svc.delete_lead(response.lead_id).await,
        Err(AppError::NotFound(_))
    ));

    let listing = svc.list_leads(LeadListParams::default()).await.unwrap();
    assert_eq!(listing.total_count, 0);
}

#[tokio::test]
async fn deleted_leads_do_not_trigger_duplicate_flags() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    let first = svc
        .capture_web_form(web_form("back@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();
    svc.delete_lead(first.lead_id).await.unwrap();

    let second = svc
        .capture_web_form(web_form("back@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();
    assert_eq!(second.status, CaptureStatus::Captured);
}

// ============ Optimistic Concurrency ============

#[tokio::test]
async fn stale_version_update_is_a_conflict() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    let response = svc
        .capture_web_form(web_form("cas@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    let record = (&store).find_by_id(response.lead_id).await.unwrap().unwrap();
    let mut current = record.lead.clone();
    current.message = Some("first writer".to_string());
    let updated = (&store).update(&current).await.unwrap();
    assert_eq!(updated.version, 2);

    // Second writer still holds version 1.
    let mut stale = record.lead;
    stale.message = Some("second writer".to_string());
    let result = (&store).update(&stale).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

// ============ Scoring ============

#[tokio::test]
async fn recorded_score_appears_on_the_lead() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    let response = svc
        .capture_web_form(web_form("scored@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    svc.record_score(
        response.lead_id,
        ScoreComponents {
            completeness: 25,
            engagement: 20,
            readiness: 20,
            source_quality: 15,
        },
    )
    .await
    .unwrap();

    let lead = svc.get_lead(response.lead_id).await.unwrap();
    let score = lead.score.unwrap();
    assert_eq!(score.overall_score, 80);
    assert_eq!(score.tier, "Hot");
    assert_eq!(score.completeness_score, 25);
}

#[tokio::test]
async fn score_for_unknown_lead_is_not_found() {
    let store = InMemoryLeadStore::default();
    let result = service(&store)
        .record_score(
            Uuid::new_v4(),
            ScoreComponents {
                completeness: 5,
                engagement: 5,
                readiness: 5,
                source_quality: 5,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn lookup_by_contact_returns_the_newest_match() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    svc.capture_web_form(web_form("repeat@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();
    let newest = svc
        .capture_web_form(web_form("repeat@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    let found = (&store)
        .find_by_email_and_phone("repeat@example.com", Some("+447700900123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.lead.id, newest.lead_id);

    let miss = (&store)
        .find_by_email_and_phone("repeat@example.com", Some("+440000000000"))
        .await
        .unwrap();
    assert!(miss.is_none());
}

// 30-day window boundary: a lead created just outside the window does
// not flag a duplicate.
#[tokio::test]
async fn old_leads_fall_outside_the_duplicate_window() {
    let store = InMemoryLeadStore::default();
    let svc = service(&store);

    let response = svc
        .capture_web_form(web_form("old@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();

    // Age the stored lead past the window.
    {
        let mut leads = store.leads.lock().unwrap();
        let lead = leads
            .iter_mut()
            .find(|l| l.id == response.lead_id)
            .unwrap();
        lead.created_at = Utc::now() - Duration::days(31);
    }

    let second = svc
        .capture_web_form(web_form("old@example.com"), "1.2.3.4".to_string(), None)
        .await
        .unwrap();
    assert_eq!(second.status, CaptureStatus::Captured);
}
