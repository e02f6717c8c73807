//! Bangladesh mobile number normalization
//!
//! One implementation serves both callers: the student-form validation in
//! the roster API and the outbound send path in the SMS dispatcher. An
//! invalid number is never forwarded to the gateway.

/// Country calling code for Bangladesh.
const COUNTRY_CODE: &str = "880";

/// Normalize an arbitrary input string to E.164 form (`+8801XXXXXXXXX`).
///
/// Strips every non-digit character, then a leading `880`/`88` country
/// prefix, and accepts only local mobile numbers: leading `01`, operator
/// digit `3`-`9`, 11 digits total. Returns `None` on any mismatch; never
/// panics.
///
/// # Examples
///
/// ```
/// use feetrack_common::phone::normalize_phone;
///
/// assert_eq!(normalize_phone("01712-345678").as_deref(), Some("+8801712345678"));
/// assert_eq!(normalize_phone("8801712345678").as_deref(), Some("+8801712345678"));
/// assert_eq!(normalize_phone("0271234567"), None);
/// ```
pub fn normalize_phone(raw: &str) -> Option<String> {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    // Country prefix comes in two shapes: "880" ahead of a full local
    // number (88001...), or "88" which also covers +880 without the local
    // leading zero (8801...).
    if digits.starts_with("8800") {
        digits.drain(..3);
    } else if digits.starts_with("88") {
        digits.drain(..2);
    }

    // Local BD mobile format: 01XXXXXXXXX, operator digit 3-9.
    if digits.len() != 11 || !digits.starts_with("01") {
        return None;
    }
    match digits.as_bytes()[2] {
        b'3'..=b'9' => {}
        _ => return None,
    }

    Some(format!("+{}{}", COUNTRY_CODE, &digits[1..]))
}

/// True when `raw` normalizes to a valid mobile number.
pub fn is_valid_phone(raw: &str) -> bool {
    normalize_phone(raw).is_some()
}
