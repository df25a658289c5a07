use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::model::{Page, Participant};

static STRICT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Section\s+Data\s+for\s+Car\s+(\d+)\s*[-–]\s*(.+?)\s*$").unwrap()
});
static LOOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,3})\s+([A-Z][A-Za-z'’.\-]+,?\s+[A-Z][A-Za-z'’.\-]+)").unwrap()
});

/// Find every car/driver pair in the document, ascending by car number.
///
/// The strict section-header pattern runs over the whole document first; the
/// looser "number then capitalized name" pattern only runs if that found nothing.
pub fn discover_roster(pages: &[Page]) -> Vec<Participant> {
    let strict = scan(pages, &STRICT_RE);
    if !strict.is_empty() {
        info!(count = strict.len(), "roster from section headers");
        return strict;
    }
    debug!("no section headers found, trying loose roster pattern");
    let loose = scan(pages, &LOOSE_RE);
    if loose.is_empty() {
        info!("no roster found");
    } else {
        info!(count = loose.len(), "roster from loose pattern");
    }
    loose
}

fn scan(pages: &[Page], re: &Regex) -> Vec<Participant> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut found: Vec<Participant> = Vec::new();

    for text in pages.iter().filter_map(|p| p.text.as_deref()) {
        for line in text.lines() {
            let Some(caps) = re.captures(line) else {
                continue;
            };
            // Keep the number as printed ("06"); dedup on its numeric value.
            let id = caps[1].trim();
            let key = id.parse::<u32>().map_or_else(|_| id.to_string(), |n| n.to_string());
            let name = caps[2].split_whitespace().collect::<Vec<_>>().join(" ");
            if name.is_empty() || !seen.insert(key) {
                continue;
            }
            found.push(Participant::new(id, name));
        }
    }

    found.sort_by(|a, b| {
        a.number()
            .cmp(&b.number())
            .then_with(|| a.id.cmp(&b.id))
    });
    found
}
