use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::{Page, Participant};

/// "Section Data for Car N -" at the start of a line, for any car.
static SECTION_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Section\s+Data\s+for\s+Car\s+(\d+)\s*[-–]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    /// Carries this participant's identifier. Opens or continues the section.
    Header,
    /// Another car's section header. Capture stops here.
    Boundary,
    /// Belongs to the active section; forward to the classifier.
    Data,
    /// No section is active.
    Outside,
}

/// Scan state for one participant across one document.
#[derive(Debug)]
pub struct SectionLocator {
    participant_id: String,
    participant_number: Option<u32>,
    identifiers: Vec<String>,
    active: bool,
    current_marker: Option<String>,
    sections_opened: usize,
}

impl SectionLocator {
    pub fn new(participant: &Participant) -> Self {
        SectionLocator {
            participant_id: participant.id.trim().to_string(),
            participant_number: participant.number(),
            identifiers: identifier_variants(participant),
            active: false,
            current_marker: None,
            sections_opened: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn sections_opened(&self) -> usize {
        self.sections_opened
    }

    pub fn observe(&mut self, line: &str) -> LineRole {
        let normalized = normalize(line);

        if self.identifiers.iter().any(|id| contains_identifier(&normalized, id)) {
            let marker = normalized;
            let changed = self.current_marker.as_deref() != Some(marker.as_str());
            if changed && self.active {
                debug!(
                    car = %self.participant_id,
                    %marker,
                    "new section header, closing previous section"
                );
            }
            if changed || !self.active {
                self.sections_opened += 1;
                debug!(car = %self.participant_id, %marker, "section opened");
            }
            self.current_marker = Some(marker);
            self.active = true;
            return LineRole::Header;
        }

        if let Some(other) = self.other_car_header(&normalized) {
            if self.active {
                debug!(
                    car = %self.participant_id,
                    other_car = %other,
                    "section for another car, ending capture"
                );
            }
            self.active = false;
            return LineRole::Boundary;
        }

        if self.active {
            LineRole::Data
        } else {
            LineRole::Outside
        }
    }

    /// Car number of a header for some other car. "06" and "6" are the same car.
    fn other_car_header<'a>(&self, line: &'a str) -> Option<&'a str> {
        let car = SECTION_HEADER_RE.captures(line)?.get(1)?.as_str();
        let same = match (car.parse::<u32>().ok(), self.participant_number) {
            (Some(n), Some(own)) => n == own,
            _ => car == self.participant_id,
        };
        if same {
            None
        } else {
            Some(car)
        }
    }

    /// Called after every page. With `deactivate_on_empty`, an active page
    /// that produced no accepted laps ends the section.
    pub fn finish_page(&mut self, page_index: usize, accepted: usize, deactivate_on_empty: bool) {
        if self.active && deactivate_on_empty && accepted == 0 {
            debug!(
                car = %self.participant_id,
                page = page_index + 1,
                "no laps on active page, ending capture"
            );
            self.active = false;
        }
    }
}

/// A single line as seen by the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanLine<'a> {
    pub page_index: usize,
    pub line: &'a str,
    pub is_active: bool,
}

/// Run the locator over every page without classifier feedback, so the
/// defensive empty-page rule never fires here.
pub fn locate_sections<'a>(pages: &'a [Page], participant: &Participant) -> Vec<ScanLine<'a>> {
    let mut locator = SectionLocator::new(participant);
    let mut out = Vec::new();
    for page in pages {
        let Some(text) = page.text.as_deref() else {
            continue;
        };
        for line in text.lines() {
            let role = locator.observe(line);
            out.push(ScanLine {
                page_index: page.index,
                line,
                is_active: role == LineRole::Data,
            });
        }
    }
    out
}

/// Literal spellings of a participant's header, most specific first.
fn identifier_variants(participant: &Participant) -> Vec<String> {
    let id = participant.id.trim();
    let name = normalize(&participant.name);
    let mut names = vec![name.clone()];
    // "O'Ward, Pato" vs "O'Ward,Pato"
    let tight = name.replace(", ", ",");
    if tight != name {
        names.push(tight);
    }

    let mut out = Vec::new();
    for n in &names {
        for dash in ['-', '–'] {
            out.push(format!("Section Data for Car {id} {dash} {n}"));
            out.push(format!("Car {id} {dash} {n}"));
            out.push(format!("{id} {dash} {n}"));
        }
    }
    out
}

/// Collapse whitespace runs and unify apostrophes so identifiers compare literally.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(['’', '`'], "'")
}

/// Substring match that refuses a leading digit, so car 5 never matches "15 - ...".
/// Zero padding is allowed: car 6 matches "06 - ...".
fn contains_identifier(line: &str, identifier: &str) -> bool {
    line.match_indices(identifier).any(|(at, _)| {
        !line[..at]
            .trim_end_matches('0')
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_digit())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pages_from_text;

    fn ward() -> Participant {
        Participant::new("5", "Ward, Pat")
    }

    fn active_lines<'a>(scan: &[ScanLine<'a>]) -> Vec<&'a str> {
        scan.iter().filter(|s| s.is_active).map(|s| s.line).collect()
    }

    #[test]
    fn captures_only_after_own_header() {
        let pages =
            pages_from_text("12T 1.0 70.0\nSection Data for Car 5 - Ward, Pat\n13T 1.0 71.0\n");
        let scan = locate_sections(&pages, &ward());
        assert_eq!(active_lines(&scan), vec!["13T 1.0 71.0"]);
    }

    #[test]
    fn other_header_ends_capture_mid_page() {
        let text = "Section Data for Car 5 - Ward, Pat\n1T 70.0\nSection Data for Car 10 - Diaz, Ana\n1T 80.0\n";
        let pages = pages_from_text(text);
        let scan = locate_sections(&pages, &ward());
        assert_eq!(active_lines(&scan), vec!["1T 70.0"]);
    }

    #[test]
    fn restated_own_header_keeps_capture() {
        let text = "Section Data for Car 5 - Ward, Pat\n1T 70.0\x0CSection Data for Car 5 - Ward, Pat\n2T 71.0\n";
        let pages = pages_from_text(text);
        let mut locator = SectionLocator::new(&ward());
        let roles: Vec<LineRole> = pages
            .iter()
            .flat_map(|p| p.text.as_deref().unwrap_or_default().lines().collect::<Vec<_>>())
            .map(|l| locator.observe(l))
            .collect();
        assert_eq!(
            roles,
            vec![LineRole::Header, LineRole::Data, LineRole::Header, LineRole::Data]
        );
        assert_eq!(locator.sections_opened(), 1);
    }

    #[test]
    fn changed_marker_counts_new_section() {
        let mut locator = SectionLocator::new(&ward());
        locator.observe("Section Data for Car 5 - Ward, Pat");
        locator.observe("Section Data for Car 5 - Ward, Pat (cont.)");
        assert!(locator.is_active());
        assert_eq!(locator.sections_opened(), 2);
    }

    #[test]
    fn car_number_prefix_is_not_a_boundary_match() {
        let mut locator = SectionLocator::new(&Participant::new("1", "Diaz, Ana"));
        assert_eq!(locator.observe("Section Data for Car 10 - Diaz, Ana"), LineRole::Boundary);
        assert_eq!(locator.observe("Section Data for Car 1 - Diaz, Ana"), LineRole::Header);
    }

    #[test]
    fn longer_car_number_is_not_own_header() {
        let mut locator = SectionLocator::new(&ward());
        assert_eq!(locator.observe("Section Data for Car 15 - Ward, Pat"), LineRole::Boundary);
        assert_eq!(locator.observe("15 - Ward, Pat"), LineRole::Outside);
    }

    #[test]
    fn zero_padded_car_number_is_own_header() {
        let mut padded = SectionLocator::new(&Participant::new("06", "Castroneves, Helio"));
        assert_eq!(
            padded.observe("Section Data for Car 06 - Castroneves, Helio"),
            LineRole::Header
        );
        assert_eq!(padded.observe("Section Data for Car 60 - Other, Driver"), LineRole::Boundary);

        let mut plain = SectionLocator::new(&Participant::new("6", "Castroneves, Helio"));
        assert_eq!(
            plain.observe("Section Data for Car 06 - Castroneves, Helio"),
            LineRole::Header
        );
        assert_eq!(plain.observe("106 - Castroneves, Helio"), LineRole::Data);
    }

    #[test]
    fn tolerates_spacing_and_apostrophes() {
        let mut locator = SectionLocator::new(&Participant::new("5", "O'Ward, Pato"));
        assert_eq!(
            locator.observe("Section  Data for  Car 5 -  O’Ward,Pato"),
            LineRole::Header
        );
    }

    #[test]
    fn empty_page_deactivates_only_when_asked() {
        let mut locator = SectionLocator::new(&ward());
        locator.observe("Car 5 - Ward, Pat");
        locator.finish_page(0, 0, false);
        assert!(locator.is_active());
        locator.finish_page(1, 3, true);
        assert!(locator.is_active());
        locator.finish_page(2, 0, true);
        assert!(!locator.is_active());
    }

    #[test]
    fn blank_pages_are_skipped() {
        let pages = vec![
            Page { index: 0, text: None },
            Page::new(1, "Section Data for Car 5 - Ward, Pat\n3T 70.0"),
        ];
        let scan = locate_sections(&pages, &ward());
        assert_eq!(scan.len(), 2);
        assert_eq!(scan[1].page_index, 1);
        assert!(scan[1].is_active);
    }
}
