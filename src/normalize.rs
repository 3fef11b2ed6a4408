//! Canonicalization of contact fields.
//!
//! Applied at every capture entry point before persistence. All
//! functions are idempotent: normalizing an already-normalized value
//! returns the same value.

/// Lowercases and trims an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalizes a UK phone number to a +44-prefixed canonical form.
///
/// Strips all non-digit characters, then:
/// - `0XXXXXXXXXX` (11 digits) becomes `+44XXXXXXXXXX`
/// - `44XXXXXXXXXX` (12 digits) becomes `+44XXXXXXXXXX`
/// - anything else is returned unchanged (fails open; this layer does
///   not reject malformed numbers)
///
/// Empty input yields `None`.
pub fn normalize_phone(phone: Option<&str>) -> Option<String> {
    let phone = phone?;
    if phone.is_empty() {
        return None;
    }

    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with('0') && digits.len() == 11 {
        return Some(format!("+44{}", &digits[1..]));
    }

    if digits.starts_with("44") && digits.len() == 12 {
        return Some(format!("+{}", digits));
    }

    Some(phone.to_string())
}

/// Uppercases a postcode. Null-safe.
pub fn normalize_postcode(postcode: Option<&str>) -> Option<String> {
    postcode.map(|p| p.to_uppercase())
}
