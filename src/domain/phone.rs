//! Phone number normalization.
//! Canonical numbers are digit strings starting with the country calling code.

use std::fmt;

pub const COUNTRY_CODE: &str = "254";
const TRUNK_PREFIX: char = '0';
const SUBSCRIBER_LEN: usize = 9;
const SUBSCRIBER_LEADING_DIGIT: char = '7';

/// Result of normalizing user input.
///
/// Normalization never fails. Input that does not look like a mobile
/// number is handed back (whitespace and leading `+` signs removed) as
/// `Unrecognized`, so callers that match on phone numbers can tell a
/// confident guess from a best-effort one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneNumber {
    Canonical(String),
    Unrecognized(String),
}

impl PhoneNumber {
    pub fn as_str(&self) -> &str {
        match self {
            PhoneNumber::Canonical(s) | PhoneNumber::Unrecognized(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            PhoneNumber::Canonical(s) | PhoneNumber::Unrecognized(s) => s,
        }
    }

    pub fn is_canonical(&self) -> bool {
        matches!(self, PhoneNumber::Canonical(_))
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn normalize(input: &str) -> PhoneNumber {
    let compact: String = input.chars().filter(|ch| !ch.is_whitespace()).collect();
    let s = compact.trim_start_matches('+');

    let candidate = if let Some(rest) = s.strip_prefix(TRUNK_PREFIX) {
        format!("{}{}", COUNTRY_CODE, rest)
    } else if is_subscriber_number(s) {
        format!("{}{}", COUNTRY_CODE, s)
    } else {
        s.to_string()
    };

    if is_canonical(&candidate) {
        PhoneNumber::Canonical(candidate)
    } else {
        PhoneNumber::Unrecognized(candidate)
    }
}

/// Shorthand for callers that only need the wire format.
pub fn normalize_str(input: &str) -> String {
    normalize(input).into_string()
}

fn is_subscriber_number(s: &str) -> bool {
    s.len() == SUBSCRIBER_LEN
        && s.starts_with(SUBSCRIBER_LEADING_DIGIT)
        && s.chars().all(|ch| ch.is_ascii_digit())
}

fn is_canonical(s: &str) -> bool {
    s.strip_prefix(COUNTRY_CODE)
        .map(is_subscriber_number)
        .unwrap_or(false)
}
