//! Explicit field-level validation for capture requests.
//!
//! The web form is the only channel with declared validation rules;
//! bulk upload items reuse the contact/service checks so a bad item
//! can be reported individually without aborting the batch. A
//! validation failure never reaches persistence.

use regex::Regex;
use url::Url;

use crate::capture_models::{
    ContactDto, DeveloperLeadDto, PropertyDto, ServiceRequestDto, WebFormLeadRequest,
};
use crate::errors::{AppError, ValidationErrors};
use crate::models::{ContactMethod, PropertyType, ServiceType, Timeline};

/// Sources accepted on the web form channel.
const ALLOWED_SOURCES: [&str; 3] = ["contact-form", "quote-request", "landing-page"];

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_MESSAGE_LENGTH: usize = 5000;
const MAX_ADDRESS_LENGTH: usize = 500;

/// Validates a web form submission in full.
///
/// Returns a `Validation` error carrying the complete field->messages
/// map; the caller persists nothing on failure.
pub fn validate_web_form(request: &WebFormLeadRequest) -> Result<(), AppError> {
    let mut errors = ValidationErrors::new();

    if request.source.is_empty() {
        errors.add("source", "Source is required");
    } else if !ALLOWED_SOURCES.contains(&request.source.as_str()) {
        errors.add("source", "Invalid source type");
    }

    if request.page_url.is_empty() {
        errors.add("pageUrl", "Page URL is required");
    } else if !is_absolute_http_url(&request.page_url) {
        errors.add("pageUrl", "Invalid page URL format");
    }

    validate_contact(&request.contact, "contact", &mut errors);
    validate_service_request(&request.service_request, "serviceRequest", &mut errors);

    // The GDPR gate: a direct submission without explicit consent is
    // rejected before any persistence attempt.
    if !request.gdpr_consent {
        errors.add("gdprConsent", "GDPR consent is required");
    }

    if let Some(property) = &request.property {
        validate_property(property, "property", &mut errors);
    }

    errors.into_result()
}

/// Validates one developer-bulk item. Failures are collected by the
/// caller as per-item errors rather than failing the whole request.
pub fn validate_bulk_item(item: &DeveloperLeadDto) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    validate_contact(&item.contact, "contact", &mut errors);
    validate_service_request(&item.service_request, "serviceRequest", &mut errors);

    if let Some(property_type) = &item.property.property_type {
        if !property_type.is_empty() && PropertyType::parse_str(property_type).is_none() {
            errors.add("property.propertyType", "Invalid property type");
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates contact fields under the given field prefix.
pub fn validate_contact(contact: &ContactDto, prefix: &str, errors: &mut ValidationErrors) {
    let first_name_len = contact.first_name.chars().count();
    if first_name_len < 2 || first_name_len > 100 {
        errors.add(
            format!("{}.firstName", prefix),
            "First name must be between 2 and 100 characters",
        );
    }

    let last_name_len = contact.last_name.chars().count();
    if last_name_len < 2 || last_name_len > 100 {
        errors.add(
            format!("{}.lastName", prefix),
            "Last name must be between 2 and 100 characters",
        );
    }

    if contact.email.len() > MAX_EMAIL_LENGTH || !is_valid_email(&contact.email) {
        errors.add(
            format!("{}.email", prefix),
            "Valid email address is required",
        );
    }

    if let Some(phone) = &contact.phone {
        if !phone.is_empty() && !is_valid_uk_phone(phone) {
            errors.add(
                format!("{}.phone", prefix),
                "Phone must be a valid UK phone number",
            );
        }
    }

    if let Some(method) = &contact.preferred_contact_method {
        if !method.is_empty() && ContactMethod::parse_str(method).is_none() {
            errors.add(
                format!("{}.preferredContactMethod", prefix),
                "Preferred contact method must be email, phone, or sms",
            );
        }
    }
}

/// Validates optional property fields under the given field prefix.
pub fn validate_property(property: &PropertyDto, prefix: &str, errors: &mut ValidationErrors) {
    if let Some(address) = &property.address {
        if address.chars().count() > MAX_ADDRESS_LENGTH {
            errors.add(
                format!("{}.address", prefix),
                "Address must not exceed 500 characters",
            );
        }
    }

    if let Some(postcode) = &property.postcode {
        if !postcode.is_empty() && !is_valid_uk_postcode(postcode) {
            errors.add(
                format!("{}.postcode", prefix),
                "Postcode must be a valid UK postcode",
            );
        }
    }

    if let Some(property_type) = &property.property_type {
        if !property_type.is_empty() && PropertyType::parse_str(property_type).is_none() {
            errors.add(format!("{}.propertyType", prefix), "Invalid property type");
        }
    }
}

/// Validates service request fields under the given field prefix.
pub fn validate_service_request(
    request: &ServiceRequestDto,
    prefix: &str,
    errors: &mut ValidationErrors,
) {
    if ServiceType::parse_str(&request.service_type).is_none() {
        errors.add(format!("{}.serviceType", prefix), "Invalid service type");
    }

    if let Some(timeline) = &request.timeline {
        if !timeline.is_empty() && Timeline::parse_str(timeline).is_none() {
            errors.add(format!("{}.timeline", prefix), "Invalid timeline");
        }
    }

    if let Some(message) = &request.message {
        if message.chars().count() > MAX_MESSAGE_LENGTH {
            errors.add(
                format!("{}.message", prefix),
                "Message must not exceed 5000 characters",
            );
        }
    }
}

/// Checks basic email syntax (simplified RFC 5322 shape).
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    let email_regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .unwrap();

    email_regex.is_match(email)
}

/// Checks the UK phone pattern: leading +44 or 0 followed by exactly
/// ten digits. Normalization happens later; this only gates the web
/// form and bulk items.
pub fn is_valid_uk_phone(phone: &str) -> bool {
    let phone_regex = Regex::new(r"^(\+44|0)[0-9]{10}$").unwrap();
    phone_regex.is_match(phone)
}

/// Checks the UK postcode pattern (uppercase, outward + inward code).
pub fn is_valid_uk_postcode(postcode: &str) -> bool {
    let postcode_regex = Regex::new(r"^[A-Z]{1,2}[0-9]{1,2}[A-Z]?\s?[0-9][A-Z]{2}$").unwrap();
    postcode_regex.is_match(postcode)
}

/// Checks that a URL is absolute with an http or https scheme.
pub fn is_absolute_http_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => url.scheme() == "http" || url.scheme() == "https",
        Err(_) => false,
    }
}
