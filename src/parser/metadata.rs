use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::model::{EventMetadata, Page, UNKNOWN_DATE, UNKNOWN_EVENT};

const HEADER_PAGES: usize = 5;

static EVENT_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bEvent\s*:\s*(.+?)\s*$").unwrap());
static LONG_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),\s*(\d{4})\b",
    )
    .unwrap()
});
static ISO_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static RACE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"((?:[A-Z0-9][\w'’&.]*\s+){1,6}(?:Grand Prix|Race|500)(?:\s+of(?:\s+[A-Z][\w'’.]*){1,4})?)\b",
    )
    .unwrap()
});
/// `indycar-sectionresults-race-long-beach-2025-04-13.pdf` → `long-beach`
static ARCHIVE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sectionresults-race-([a-z0-9-]+?)-\d{4}-\d{2}-\d{2}").unwrap());
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s_-]+").unwrap());

/// Derive an event name and date for naming the output table.
pub fn extract_metadata(pages: &[Page], fallback_filename: &str) -> EventMetadata {
    let mut name: Option<String> = None;
    let mut keyword_name: Option<String> = None;
    let mut date: Option<String> = None;

    for text in pages.iter().take(HEADER_PAGES).filter_map(|p| p.text.as_deref()) {
        for line in text.lines() {
            if name.is_none() {
                name = EVENT_LABEL_RE.captures(line).map(|c| c[1].to_string());
            }
            if keyword_name.is_none() {
                keyword_name = RACE_NAME_RE
                    .captures(line)
                    .map(|c| c[1].trim().to_string())
                    .filter(|n| !is_generic_heading(n));
            }
            if date.is_none() {
                date = find_date(line);
            }
        }
    }

    let name = name
        .or(keyword_name)
        .or_else(|| ARCHIVE_NAME_RE.captures(fallback_filename).map(|c| c[1].to_string()))
        .map(|n| slugify(&n))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNKNOWN_EVENT.to_string());
    let date = date
        .or_else(|| iso_date(fallback_filename))
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    EventMetadata { name, date }
}

/// Lowercase, strip non-word characters, join words with single hyphens.
pub fn slugify(raw: &str) -> String {
    let stripped = NON_WORD_RE.replace_all(raw, "");
    SEPARATORS_RE
        .replace_all(stripped.trim(), "-")
        .trim_matches('-')
        .to_lowercase()
}

/// "Section Results Race" and the like name the document, not the event.
fn is_generic_heading(name: &str) -> bool {
    name.split_whitespace()
        .any(|w| w.eq_ignore_ascii_case("results") || w.eq_ignore_ascii_case("section"))
}

fn find_date(line: &str) -> Option<String> {
    if let Some(caps) = LONG_DATE_RE.captures(line) {
        let raw = format!("{} {} {}", &caps[1], &caps[2], &caps[3]);
        return Some(match NaiveDate::parse_from_str(&raw, "%B %d %Y") {
            Ok(d) => d.format("%Y-%m-%d").to_string(),
            Err(_) => raw,
        });
    }
    iso_date(line)
}

fn iso_date(text: &str) -> Option<String> {
    ISO_DATE_RE.find(text).map(|m| m.as_str().to_string())
}
