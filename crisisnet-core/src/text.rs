//! Text preprocessing and disaster keyword detection

use regex::Regex;
use std::sync::LazyLock;

/// Disaster terms recognized across streamed and corpus text
pub const DISASTER_KEYWORDS: &[&str] = &[
    "flood",
    "earthquake",
    "wildfire",
    "hurricane",
    "storm",
    "tornado",
    "fire",
    "tsunami",
    "landslide",
    "eruption",
    "explosion",
    "evacuation",
    "emergency",
    "collapse",
];

/// Maximum keywords attached to a single live event
pub const MAX_EVENT_KEYWORDS: usize = 5;

static URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?://|www\.)\S+").unwrap());

static NON_ALNUM_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

/// Normalize message text: lowercase, strip URLs and punctuation, collapse whitespace
pub fn preprocess_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let no_urls = URL_REGEX.replace_all(&lowered, "");
    let alnum = NON_ALNUM_REGEX.replace_all(&no_urls, "");
    alnum.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract disaster keywords from text, ordered by first occurrence, deduplicated
pub fn extract_keywords(text: &str) -> Vec<String> {
    let processed = preprocess_text(text);
    let mut found = Vec::new();
    for token in processed.split_whitespace() {
        if DISASTER_KEYWORDS.contains(&token) && !found.iter().any(|k| k == token) {
            found.push(token.to_string());
            if found.len() == MAX_EVENT_KEYWORDS {
                break;
            }
        }
    }
    found
}
