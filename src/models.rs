use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============ Closed Enumerations ============

/// Qualification tier derived from a lead's overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadTier {
    /// Score 75-100, immediate action required.
    Hot,
    /// Score 50-74, action within 24 hours.
    Warm,
    /// Score 25-49, action within 48 hours.
    Cool,
    /// Score 0-24, nurture or disqualify.
    Cold,
}

impl LeadTier {
    /// Derives the tier from an overall score (0-100).
    ///
    /// Bands are inclusive on the low end: 0-24 Cold, 25-49 Cool,
    /// 50-74 Warm, 75-100 Hot.
    pub fn from_overall(score: u8) -> Self {
        match score {
            0..=24 => LeadTier::Cold,
            25..=49 => LeadTier::Cool,
            50..=74 => LeadTier::Warm,
            _ => LeadTier::Hot,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadTier::Hot => "Hot",
            LeadTier::Warm => "Warm",
            LeadTier::Cool => "Cool",
            LeadTier::Cold => "Cold",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "Hot" => Some(LeadTier::Hot),
            "Warm" => Some(LeadTier::Warm),
            "Cool" => Some(LeadTier::Cool),
            "Cold" => Some(LeadTier::Cold),
            _ => None,
        }
    }
}

/// Property type for a lead's property details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PropertyType {
    Detached,
    SemiDetached,
    Terraced,
    Flat,
    Other,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Detached => "detached",
            PropertyType::SemiDetached => "semi-detached",
            PropertyType::Terraced => "terraced",
            PropertyType::Flat => "flat",
            PropertyType::Other => "other",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "detached" => Some(PropertyType::Detached),
            "semi-detached" => Some(PropertyType::SemiDetached),
            "terraced" => Some(PropertyType::Terraced),
            "flat" => Some(PropertyType::Flat),
            "other" => Some(PropertyType::Other),
            _ => None,
        }
    }
}

/// Service type requested by a lead. Required on every lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    Purchase,
    Sale,
    Remortgage,
    Transfer,
    Other,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Purchase => "purchase",
            ServiceType::Sale => "sale",
            ServiceType::Remortgage => "remortgage",
            ServiceType::Transfer => "transfer",
            ServiceType::Other => "other",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "purchase" => Some(ServiceType::Purchase),
            "sale" => Some(ServiceType::Sale),
            "remortgage" => Some(ServiceType::Remortgage),
            "transfer" => Some(ServiceType::Transfer),
            "other" => Some(ServiceType::Other),
            _ => None,
        }
    }
}

/// How soon the lead wants the service completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeline {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "1-month")]
    OneMonth,
    #[serde(rename = "3-months")]
    ThreeMonths,
    #[serde(rename = "6-months")]
    SixMonths,
    #[serde(rename = "exploring")]
    Exploring,
}

impl Timeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeline::Immediate => "immediate",
            Timeline::OneMonth => "1-month",
            Timeline::ThreeMonths => "3-months",
            Timeline::SixMonths => "6-months",
            Timeline::Exploring => "exploring",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "immediate" => Some(Timeline::Immediate),
            "1-month" => Some(Timeline::OneMonth),
            "3-months" => Some(Timeline::ThreeMonths),
            "6-months" => Some(Timeline::SixMonths),
            "exploring" => Some(Timeline::Exploring),
            _ => None,
        }
    }
}

/// Urgency level assigned to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Critical,
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::High => "high",
            Urgency::Medium => "medium",
            Urgency::Low => "low",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Urgency::Critical),
            "high" => Some(Urgency::High),
            "medium" => Some(Urgency::Medium),
            "low" => Some(Urgency::Low),
            _ => None,
        }
    }
}

/// Marketing channel of a capture event.
///
/// The first five variants are the intake channels this API serves;
/// the rest are generic categories used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    WebForm,
    AdPlatform,
    PartnerReferral,
    DeveloperBulk,
    EventRegistration,
    DigitalAds,
    Pr,
    BusinessDevelopment,
    OrganicMarketing,
    Referral,
    Direct,
    Other,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::WebForm => "web-form",
            Channel::AdPlatform => "ad-platform",
            Channel::PartnerReferral => "partner-referral",
            Channel::DeveloperBulk => "developer-bulk",
            Channel::EventRegistration => "event-registration",
            Channel::DigitalAds => "digital-ads",
            Channel::Pr => "pr",
            Channel::BusinessDevelopment => "business-development",
            Channel::OrganicMarketing => "organic-marketing",
            Channel::Referral => "referral",
            Channel::Direct => "direct",
            Channel::Other => "other",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "web-form" => Some(Channel::WebForm),
            "ad-platform" => Some(Channel::AdPlatform),
            "partner-referral" => Some(Channel::PartnerReferral),
            "developer-bulk" => Some(Channel::DeveloperBulk),
            "event-registration" => Some(Channel::EventRegistration),
            "digital-ads" => Some(Channel::DigitalAds),
            "pr" => Some(Channel::Pr),
            "business-development" => Some(Channel::BusinessDevelopment),
            "organic-marketing" => Some(Channel::OrganicMarketing),
            "referral" => Some(Channel::Referral),
            "direct" => Some(Channel::Direct),
            "other" => Some(Channel::Other),
            _ => None,
        }
    }
}

/// Contact method the lead prefers to be reached by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactMethod {
    Email,
    Phone,
    Sms,
}

impl ContactMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactMethod::Email => "email",
            ContactMethod::Phone => "phone",
            ContactMethod::Sms => "sms",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "email" => Some(ContactMethod::Email),
            "phone" => Some(ContactMethod::Phone),
            "sms" => Some(ContactMethod::Sms),
            _ => None,
        }
    }
}

// ============ Domain Entities ============

/// A captured prospect. Aggregate root owning its score and
/// source attributions.
#[derive(Debug, Clone)]
pub struct Lead {
    /// Unique identifier, assigned at creation.
    pub id: Uuid,
    /// Identifier from the source system (or generated), unique among
    /// non-deleted leads. Used for idempotent correlation upstream.
    pub external_lead_id: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Email address, canonical lowercase.
    pub email: String,
    /// Phone number, normalized to +44 E.164-like format when possible.
    pub phone: Option<String>,
    /// Street address of the property.
    pub address: Option<String>,
    /// UK postcode, uppercase.
    pub postcode: Option<String>,
    /// Type of property the service concerns.
    pub property_type: Option<PropertyType>,
    /// Requested service. Required.
    pub service_type: ServiceType,
    /// Desired completion timeline.
    pub timeline: Option<Timeline>,
    /// Urgency classification.
    pub urgency: Option<Urgency>,
    /// Free-text message from the lead.
    pub message: Option<String>,
    /// GDPR consent. Must be true for direct web-form submissions.
    pub gdpr_consent: bool,
    /// Marketing consent, defaults to false.
    pub marketing_consent: bool,
    /// Preferred contact method.
    pub preferred_contact_method: Option<ContactMethod>,
    /// Timestamp of creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of last update. Bumped on every mutation.
    pub updated_at: DateTime<Utc>,
    /// Soft delete marker. A set value excludes the lead from all
    /// default reads without physically removing the row.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter. Starts at 1, only increases.
    pub version: i32,
}

impl Lead {
    /// Whether the lead has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Full name, first and last joined with a space.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Qualification result for one lead. 1:1 with its parent lead,
/// cascade-deleted with it.
#[derive(Debug, Clone)]
pub struct LeadScore {
    /// Unique identifier.
    pub id: Uuid,
    /// Parent lead.
    pub lead_id: Uuid,
    /// Composite score in [0,100]. By convention the sum of the four
    /// component scores.
    pub overall_score: i32,
    /// Tier derived from the overall score.
    pub tier: LeadTier,
    /// Profile completeness component, [0,25].
    pub completeness_score: i32,
    /// Engagement component, [0,25].
    pub engagement_score: i32,
    /// Purchase readiness component, [0,25].
    pub readiness_score: i32,
    /// Source quality component, [0,25].
    pub source_quality_score: i32,
    /// Timestamp of the last scoring run.
    pub calculated_at: DateTime<Utc>,
}

/// Provenance of one capture event. Owned exclusively by one lead,
/// cascade-deleted with it. A lead re-submitted through different
/// channels accumulates one attribution per capture.
#[derive(Debug, Clone)]
pub struct LeadSourceAttribution {
    /// Unique identifier.
    pub id: Uuid,
    /// Parent lead.
    pub lead_id: Uuid,
    /// Intake channel that produced this capture.
    pub channel: Channel,
    /// Channel-specific source (form name, partner id, event type...).
    pub source: Option<String>,
    /// Campaign name.
    pub campaign: Option<String>,
    /// Medium (paid, event, bulk-upload, referral type...).
    pub medium: Option<String>,
    /// utm_source query parameter.
    pub utm_source: Option<String>,
    /// utm_medium query parameter.
    pub utm_medium: Option<String>,
    /// utm_campaign query parameter.
    pub utm_campaign: Option<String>,
    /// utm_content query parameter.
    pub utm_content: Option<String>,
    /// utm_term query parameter.
    pub utm_term: Option<String>,
    /// HTTP referrer of the submission.
    pub referrer: Option<String>,
    /// Landing page URL.
    pub landing_page: Option<String>,
    /// IP address the capture came from.
    pub ip_address: Option<String>,
    /// User agent of the submitting client.
    pub user_agent: Option<String>,
    /// Timestamp of the capture event.
    pub captured_at: DateTime<Utc>,
}

/// A lead together with its owned sub-resources, as read paths
/// return it.
#[derive(Debug, Clone)]
pub struct LeadRecord {
    pub lead: Lead,
    pub score: Option<LeadScore>,
    pub attributions: Vec<LeadSourceAttribution>,
}
