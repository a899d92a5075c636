use once_cell::sync::Lazy;
use regex::Regex;

pub mod test_utils;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s.]+(\.[^@\s.]+)+$").expect("can't create email matcher")
});

/// Loose `local@domain.tld` check, the same strictness as an `email` field
/// format in the integration schema.
pub fn is_email(candidate: &str) -> bool {
    EMAIL.is_match(candidate)
}
