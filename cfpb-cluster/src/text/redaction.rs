//! Redaction mask removal
//!
//! The complaint database anonymizes personal data by overwriting it with
//! runs of `X`: dates become `XX/XX/XXXX`, names and account numbers become
//! `XXXX`. Masks carry no meaning for clustering and are deleted outright.

use once_cell::sync::Lazy;
use regex::Regex;

/// Masked dates: three mask runs joined by `/` or `-`
static MASKED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"X{2,}[/-]X{2,}[/-]X{2,}").expect("valid regex"));

/// Any remaining mask run of two or more characters
static MASK_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"X{2,}").expect("valid regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Strip redaction masks and normalize whitespace
///
/// Date-shaped masks are removed first so their separators go with them.
/// The result has single spaces between words and no leading or trailing
/// whitespace. Cleaning is idempotent.
pub fn clean_redactions(text: &str) -> String {
    let without_dates = MASKED_DATE_RE.replace_all(text, "");
    let without_masks = MASK_RUN_RE.replace_all(&without_dates, "");
    WHITESPACE_RE
        .replace_all(&without_masks, " ")
        .trim()
        .to_string()
}

/// Clean an optional narrative; absent text becomes the empty string
pub fn clean_narrative(text: Option<&str>) -> String {
    text.map(clean_redactions).unwrap_or_default()
}
