use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{
    Channel, ContactMethod, Lead, LeadRecord, LeadScore, LeadSourceAttribution, LeadTier,
    PropertyType, ServiceType, Timeline, Urgency,
};

/// Filters for list queries. Page and page size arrive already
/// normalized by the caller.
#[derive(Debug, Clone)]
pub struct LeadListFilter {
    pub page: i64,
    pub page_size: i64,
    /// Matches any associated attribution's source.
    pub source: Option<String>,
    /// Matches any associated attribution's channel.
    pub channel: Option<Channel>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
}

/// Persistence contract the capture core depends on.
///
/// Every read excludes soft-deleted leads; `create` assigns the audit
/// timestamps, `update` is a compare-and-swap on the version counter.
#[allow(async_fn_in_trait)]
pub trait LeadStore {
    /// Looks up one non-deleted lead with its score and attributions.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeadRecord>, AppError>;

    /// Most recent non-deleted lead matching the email (and phone,
    /// when supplied) exactly.
    async fn find_by_email_and_phone(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Option<LeadRecord>, AppError>;

    /// Whether any non-deleted lead with this email (and phone, when
    /// supplied) was created at or after `since`.
    async fn exists_since(
        &self,
        email: &str,
        phone: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError>;

    /// Persists a new lead with its single capture attribution.
    /// Assigns created/updated timestamps and version 1.
    async fn create(
        &self,
        lead: Lead,
        attribution: LeadSourceAttribution,
    ) -> Result<Lead, AppError>;

    /// Persists field changes to an existing lead. Rejects with
    /// `Conflict` when the stored version differs from
    /// `lead.version`; on success the stored version is bumped and
    /// the updated timestamp refreshed.
    async fn update(&self, lead: &Lead) -> Result<Lead, AppError>;

    /// Marks a lead deleted. Returns false when no live lead matched.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError>;

    /// Inserts or replaces the score of a lead.
    async fn save_score(&self, score: LeadScore) -> Result<LeadScore, AppError>;

    /// Filtered, paginated listing, newest first. The total count
    /// reflects the filtered set, independent of the page window.
    async fn list(&self, filter: &LeadListFilter) -> Result<(Vec<LeadRecord>, i64), AppError>;
}

// ============ Postgres Implementation ============

/// `LeadStore` backed by Postgres.
#[derive(Clone)]
pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_score(&self, lead_id: Uuid) -> Result<Option<LeadScore>, AppError> {
        let row = sqlx::query_as::<_, ScoreRow>(
            "SELECT * FROM lead_scores WHERE lead_id = $1",
        )
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ScoreRow::into_score).transpose()
    }

    async fn load_attributions(
        &self,
        lead_id: Uuid,
    ) -> Result<Vec<LeadSourceAttribution>, AppError> {
        let rows = sqlx::query_as::<_, AttributionRow>(
            "SELECT * FROM lead_source_attributions WHERE lead_id = $1 ORDER BY captured_at ASC",
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttributionRow::into_attribution).collect()
    }

    async fn assemble_record(&self, lead: Lead) -> Result<LeadRecord, AppError> {
        let score = self.load_score(lead.id).await?;
        let attributions = self.load_attributions(lead.id).await?;
        Ok(LeadRecord {
            lead,
            score,
            attributions,
        })
    }
}

impl LeadStore for PgLeadRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<LeadRecord>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(
            "SELECT * FROM leads WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lead = row.into_lead()?;
                Ok(Some(self.assemble_record(lead).await?))
            }
            None => Ok(None),
        }
    }

    async fn find_by_email_and_phone(
        &self,
        email: &str,
        phone: Option<&str>,
    ) -> Result<Option<LeadRecord>, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT * FROM leads
            WHERE email = $1
              AND deleted_at IS NULL
              AND ($2::text IS NULL OR phone = $2)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let lead = row.into_lead()?;
                Ok(Some(self.assemble_record(lead).await?))
            }
            None => Ok(None),
        }
    }

    async fn exists_since(
        &self,
        email: &str,
        phone: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM leads
                WHERE email = $1
                  AND created_at >= $2
                  AND deleted_at IS NULL
                  AND ($3::text IS NULL OR phone = $3)
            )
            "#,
        )
        .bind(email)
        .bind(since)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
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

        // Lead and its attribution land together or not at all.
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO leads (
                id, external_lead_id, first_name, last_name, email, phone,
                address, postcode, property_type, service_type, timeline,
                urgency, message, gdpr_consent, marketing_consent,
                preferred_contact_method, created_at, updated_at, deleted_at,
                version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(lead.id)
        .bind(&lead.external_lead_id)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.address)
        .bind(&lead.postcode)
        .bind(lead.property_type.map(|p| p.as_str()))
        .bind(lead.service_type.as_str())
        .bind(lead.timeline.map(|t| t.as_str()))
        .bind(lead.urgency.map(|u| u.as_str()))
        .bind(&lead.message)
        .bind(lead.gdpr_consent)
        .bind(lead.marketing_consent)
        .bind(lead.preferred_contact_method.map(|m| m.as_str()))
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .bind(lead.deleted_at)
        .bind(lead.version)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO lead_source_attributions (
                id, lead_id, channel, source, campaign, medium, utm_source,
                utm_medium, utm_campaign, utm_content, utm_term, referrer,
                landing_page, ip_address, user_agent, captured_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16)
            "#,
        )
        .bind(attribution.id)
        .bind(attribution.lead_id)
        .bind(attribution.channel.as_str())
        .bind(&attribution.source)
        .bind(&attribution.campaign)
        .bind(&attribution.medium)
        .bind(&attribution.utm_source)
        .bind(&attribution.utm_medium)
        .bind(&attribution.utm_campaign)
        .bind(&attribution.utm_content)
        .bind(&attribution.utm_term)
        .bind(&attribution.referrer)
        .bind(&attribution.landing_page)
        .bind(&attribution.ip_address)
        .bind(&attribution.user_agent)
        .bind(attribution.captured_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!("Created lead {} via {}", lead.id, attribution.channel.as_str());
        Ok(lead)
    }

    async fn update(&self, lead: &Lead) -> Result<Lead, AppError> {
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            UPDATE leads
            SET first_name = $3,
                last_name = $4,
                email = $5,
                phone = $6,
                address = $7,
                postcode = $8,
                property_type = $9,
                service_type = $10,
                timeline = $11,
                urgency = $12,
                message = $13,
                gdpr_consent = $14,
                marketing_consent = $15,
                preferred_contact_method = $16,
                updated_at = now(),
                version = version + 1
            WHERE id = $1 AND version = $2 AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(lead.id)
        .bind(lead.version)
        .bind(&lead.first_name)
        .bind(&lead.last_name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(&lead.address)
        .bind(&lead.postcode)
        .bind(lead.property_type.map(|p| p.as_str()))
        .bind(lead.service_type.as_str())
        .bind(lead.timeline.map(|t| t.as_str()))
        .bind(lead.urgency.map(|u| u.as_str()))
        .bind(&lead.message)
        .bind(lead.gdpr_consent)
        .bind(lead.marketing_consent)
        .bind(lead.preferred_contact_method.map(|m| m.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_lead(),
            None => {
                // Distinguish a stale version from a missing lead.
                let live = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM leads WHERE id = $1 AND deleted_at IS NULL)",
                )
                .bind(lead.id)
                .fetch_one(&self.pool)
                .await?;

                if live {
                    Err(AppError::Conflict(format!(
                        "Lead {} was modified concurrently (stale version {})",
                        lead.id, lead.version
                    )))
                } else {
                    Err(AppError::NotFound(format!("Lead {} not found", lead.id)))
                }
            }
        }
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE leads
            SET deleted_at = now(), updated_at = now(), version = version + 1
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_score(&self, score: LeadScore) -> Result<LeadScore, AppError> {
        let live = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM leads WHERE id = $1 AND deleted_at IS NULL)",
        )
        .bind(score.lead_id)
        .fetch_one(&self.pool)
        .await?;

        if !live {
            return Err(AppError::NotFound(format!(
                "Lead {} not found",
                score.lead_id
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO lead_scores (
                id, lead_id, overall_score, tier, completeness_score,
                engagement_score, readiness_score, source_quality_score,
                calculated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (lead_id) DO UPDATE
            SET overall_score = EXCLUDED.overall_score,
                tier = EXCLUDED.tier,
                completeness_score = EXCLUDED.completeness_score,
                engagement_score = EXCLUDED.engagement_score,
                readiness_score = EXCLUDED.readiness_score,
                source_quality_score = EXCLUDED.source_quality_score,
                calculated_at = EXCLUDED.calculated_at
            "#,
        )
        .bind(score.id)
        .bind(score.lead_id)
        .bind(score.overall_score)
        .bind(score.tier.as_str())
        .bind(score.completeness_score)
        .bind(score.engagement_score)
        .bind(score.readiness_score)
        .bind(score.source_quality_score)
        .bind(score.calculated_at)
        .execute(&self.pool)
        .await?;

        Ok(score)
    }

    async fn list(&self, filter: &LeadListFilter) -> Result<(Vec<LeadRecord>, i64), AppError> {
        let channel = filter.channel.map(|c| c.as_str());
        let offset = (filter.page - 1) * filter.page_size;

        let total_count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM leads l
            WHERE l.deleted_at IS NULL
              AND ($1::text IS NULL OR EXISTS (
                    SELECT 1 FROM lead_source_attributions a
                    WHERE a.lead_id = l.id AND a.channel = $1))
              AND ($2::text IS NULL OR EXISTS (
                    SELECT 1 FROM lead_source_attributions a
                    WHERE a.lead_id = l.id AND a.source = $2))
              AND ($3::timestamptz IS NULL OR l.created_at >= $3)
              AND ($4::timestamptz IS NULL OR l.created_at <= $4)
            "#,
        )
        .bind(channel)
        .bind(&filter.source)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT * FROM leads l
            WHERE l.deleted_at IS NULL
              AND ($1::text IS NULL OR EXISTS (
                    SELECT 1 FROM lead_source_attributions a
                    WHERE a.lead_id = l.id AND a.channel = $1))
              AND ($2::text IS NULL OR EXISTS (
                    SELECT 1 FROM lead_source_attributions a
                    WHERE a.lead_id = l.id AND a.source = $2))
              AND ($3::timestamptz IS NULL OR l.created_at >= $3)
              AND ($4::timestamptz IS NULL OR l.created_at <= $4)
            ORDER BY l.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(channel)
        .bind(&filter.source)
        .bind(filter.from_date)
        .bind(filter.to_date)
        .bind(filter.page_size)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let lead = row.into_lead()?;
            records.push(self.assemble_record(lead).await?);
        }

        Ok((records, total_count))
    }
}

// ============ Row Mapping ============

// Enumerations are stored as text; the row structs keep them as
// strings and conversion to the domain types happens here, so a
// corrupt stored value surfaces as an explicit internal error rather
// than a decode panic.

#[derive(Debug, FromRow)]
struct LeadRow {
    id: Uuid,
    external_lead_id: String,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    postcode: Option<String>,
    property_type: Option<String>,
    service_type: String,
    timeline: Option<String>,
    urgency: Option<String>,
    message: Option<String>,
    gdpr_consent: bool,
    marketing_consent: bool,
    preferred_contact_method: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
    version: i32,
}

fn parse_stored<T>(
    value: &str,
    parse: fn(&str) -> Option<T>,
    what: &str,
    lead_id: Uuid,
) -> Result<T, AppError> {
    parse(value).ok_or_else(|| {
        AppError::Internal(format!(
            "Unrecognized {} '{}' stored for lead {}",
            what, value, lead_id
        ))
    })
}

impl LeadRow {
    fn into_lead(self) -> Result<Lead, AppError> {
        let property_type = self
            .property_type
            .as_deref()
            .map(|v| parse_stored(v, PropertyType::parse_str, "property type", self.id))
            .transpose()?;
        let service_type =
            parse_stored(&self.service_type, ServiceType::parse_str, "service type", self.id)?;
        let timeline = self
            .timeline
            .as_deref()
            .map(|v| parse_stored(v, Timeline::parse_str, "timeline", self.id))
            .transpose()?;
        let urgency = self
            .urgency
            .as_deref()
            .map(|v| parse_stored(v, Urgency::parse_str, "urgency", self.id))
            .transpose()?;
        let preferred_contact_method = self
            .preferred_contact_method
            .as_deref()
            .map(|v| parse_stored(v, ContactMethod::parse_str, "contact method", self.id))
            .transpose()?;

        Ok(Lead {
            id: self.id,
            external_lead_id: self.external_lead_id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone,
            address: self.address,
            postcode: self.postcode,
            property_type,
            service_type,
            timeline,
            urgency,
            message: self.message,
            gdpr_consent: self.gdpr_consent,
            marketing_consent: self.marketing_consent,
            preferred_contact_method,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            version: self.version,
        })
    }
}

#[derive(Debug, FromRow)]
struct AttributionRow {
    id: Uuid,
    lead_id: Uuid,
    channel: String,
    source: Option<String>,
    campaign: Option<String>,
    medium: Option<String>,
    utm_source: Option<String>,
    utm_medium: Option<String>,
    utm_campaign: Option<String>,
    utm_content: Option<String>,
    utm_term: Option<String>,
    referrer: Option<String>,
    landing_page: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    captured_at: DateTime<Utc>,
}

impl AttributionRow {
    fn into_attribution(self) -> Result<LeadSourceAttribution, AppError> {
        let channel = parse_stored(&self.channel, Channel::parse_str, "channel", self.lead_id)?;
        Ok(LeadSourceAttribution {
            id: self.id,
            lead_id: self.lead_id,
            channel,
            source: self.source,
            campaign: self.campaign,
            medium: self.medium,
            utm_source: self.utm_source,
            utm_medium: self.utm_medium,
            utm_campaign: self.utm_campaign,
            utm_content: self.utm_content,
            utm_term: self.utm_term,
            referrer: self.referrer,
            landing_page: self.landing_page,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            captured_at: self.captured_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct ScoreRow {
    id: Uuid,
    lead_id: Uuid,
    overall_score: i32,
    tier: String,
    completeness_score: i32,
    engagement_score: i32,
    readiness_score: i32,
    source_quality_score: i32,
    calculated_at: DateTime<Utc>,
}

impl ScoreRow {
    fn into_score(self) -> Result<LeadScore, AppError> {
        let tier = parse_stored(&self.tier, LeadTier::parse_str, "tier", self.lead_id)?;
        Ok(LeadScore {
            id: self.id,
            lead_id: self.lead_id,
            overall_score: self.overall_score,
            tier,
            completeness_score: self.completeness_score,
            engagement_score: self.engagement_score,
            readiness_score: self.readiness_score,
            source_quality_score: self.source_quality_score,
            calculated_at: self.calculated_at,
        })
    }
}
