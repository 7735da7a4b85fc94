use once_cell::sync::Lazy;
use regex::Regex;

static ROLL_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("roll number pattern"));

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z ]+$").expect("name pattern"));

/// Alphanumeric, non-empty.
pub fn is_valid_roll_number(roll_number: &str) -> bool {
    ROLL_NUMBER_RE.is_match(roll_number)
}

/// Letters and spaces only, with at least one letter.
pub fn is_valid_name(name: &str) -> bool {
    NAME_RE.is_match(name) && name.chars().any(|c| c.is_ascii_alphabetic())
}

#[inline]
pub fn normalize_roll_number(roll_number: &str) -> String {
    roll_number.trim().to_uppercase()
}
