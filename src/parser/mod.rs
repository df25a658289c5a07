pub mod laps;
pub mod lines;
pub mod metadata;
pub mod profile;
pub mod roster;
pub mod sections;

use serde::Serialize;
use tracing::{debug, info};

use crate::model::{EventMetadata, LapRecord, Page, Participant};
use laps::{Acceptance, LapBook};
use lines::{resolve_lap_time, LineClassifier};
use profile::FormatProfile;
use sections::{LineRole, SectionLocator};

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantSummary {
    pub participant: Participant,
    pub laps: usize,
    pub sections_opened: usize,
    pub implausible: usize,
}

/// Everything pulled out of one document.
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub metadata: EventMetadata,
    pub records: Vec<LapRecord>,
    pub participants: Vec<ParticipantSummary>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Pages → roster → sections → lap lines → plausible, deduplicated records.
///
/// With no explicit roster the document's own headers are used. Records come
/// out grouped by participant in roster order, ascending by lap within each.
pub fn extract_document(
    pages: &[Page],
    roster: Option<&[Participant]>,
    profile: &FormatProfile,
    fallback_filename: &str,
) -> Extraction {
    let metadata = metadata::extract_metadata(pages, fallback_filename);
    let participants = match roster {
        Some(r) => r.to_vec(),
        None => roster::discover_roster(pages),
    };

    let mut records = Vec::new();
    let mut summaries = Vec::with_capacity(participants.len());
    for participant in participants {
        let (laps, summary) = extract_participant(pages, &participant, profile);
        info!(
            car = %participant.id,
            driver = %participant.name,
            laps = summary.laps,
            sections = summary.sections_opened,
            "extracted lap times"
        );
        records.extend(laps);
        summaries.push(summary);
    }

    Extraction {
        metadata,
        records,
        participants: summaries,
    }
}

/// Single pass over the pages for one participant.
pub fn extract_participant(
    pages: &[Page],
    participant: &Participant,
    profile: &FormatProfile,
) -> (Vec<LapRecord>, ParticipantSummary) {
    let mut locator = SectionLocator::new(participant);
    let mut classifier = LineClassifier::for_profile(profile);
    let mut book = LapBook::new(participant.clone(), profile.range, profile.duplicates);
    let mut implausible = 0;

    for page in pages {
        let Some(text) = page.text.as_deref() else {
            debug!(page = page.index + 1, "page has no text, skipping");
            continue;
        };

        let mut accepted_on_page = 0;
        for line in text.lines() {
            match locator.observe(line) {
                LineRole::Data => {}
                LineRole::Boundary => {
                    classifier.reset();
                    continue;
                }
                LineRole::Header | LineRole::Outside => continue,
            }

            let Some(candidate) = classifier.feed(line) else {
                continue;
            };
            let resolved =
                resolve_lap_time(&candidate.tokens, profile.range, profile.disambiguation);
            let outcome = match resolved {
                Some(time) => book.accept(candidate.lap_number, time),
                None => Acceptance::Implausible,
            };
            if outcome.is_valid() {
                accepted_on_page += 1;
            } else {
                implausible += 1;
                debug!(
                    car = %participant.id,
                    lap = candidate.lap_number,
                    tokens = ?candidate.tokens,
                    "skipping implausible lap time"
                );
            }
        }

        locator.finish_page(page.index, accepted_on_page, profile.deactivate_on_empty_page);
        if !locator.is_active() {
            classifier.reset();
        }
    }

    if book.is_empty() {
        debug!(car = %participant.id, sections = locator.sections_opened(), "no lap times found");
    }
    let summary = ParticipantSummary {
        participant: participant.clone(),
        laps: book.len(),
        sections_opened: locator.sections_opened(),
        implausible,
    };
    (book.into_records(), summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pages_from_text;
    use profile::{DuplicatePolicy, Preset};

    fn ward() -> Participant {
        Participant::new("5", "Ward, Pat")
    }

    fn rec(id: &str, name: &str, lap: u32, time: f64) -> LapRecord {
        LapRecord {
            participant_id: id.into(),
            participant_name: name.into(),
            lap_number: lap,
            lap_time: time,
        }
    }

    #[test]
    fn single_section_scenario() {
        let pages = vec![Page::new(
            0,
            "Section Data for Car 5 - Ward, Pat\n12T 5.10 4.98 71.23\n13T 5.05 5.01 250.00\n",
        )];
        let roster = [ward()];
        let out = extract_document(&pages, Some(&roster), &FormatProfile::default(), "");
        assert_eq!(out.records, vec![rec("5", "Ward, Pat", 12, 71.23)]);
        assert_eq!(out.participants[0].implausible, 1);
        assert_eq!(out.participants[0].sections_opened, 1);
    }

    #[test]
    fn round_trip_all_laps() {
        let times = [71.5, 70.25, 69.875, 72.0, 70.5];
        let mut text = String::from("Section Data for Car 5 - Ward, Pat\n");
        for (i, t) in times.iter().enumerate() {
            text.push_str(&format!("{}T 5.1 4.9 {t:.3}\n", i + 1));
        }
        let pages = pages_from_text(&text);
        let (laps, _) = extract_participant(&pages, &ward(), &FormatProfile::default());
        let expected: Vec<LapRecord> = times
            .iter()
            .enumerate()
            .map(|(i, t)| rec("5", "Ward, Pat", i as u32 + 1, *t))
            .collect();
        assert_eq!(laps, expected);
    }

    #[test]
    fn interleaved_sections_stay_attributed() {
        let text = "Section Data for Car 5 - Ward, Pat\n1T 1.0 1.0 70.0\n\
                    Section Data for Car 10 - Diaz, Ana\n1T 1.0 1.0 80.0\n2T 1.0 1.0 81.0\n\
                    \x0CSection Data for Car 5 - Ward, Pat\n2T 1.0 1.0 71.0\n";
        let pages = pages_from_text(text);
        let out = extract_document(&pages, None, &FormatProfile::default(), "");
        assert_eq!(
            out.records,
            vec![
                rec("5", "Ward, Pat", 1, 70.0),
                rec("5", "Ward, Pat", 2, 71.0),
                rec("10", "Diaz, Ana", 1, 80.0),
                rec("10", "Diaz, Ana", 2, 81.0),
            ]
        );
        assert_eq!(out.participants[0].sections_opened, 2);
    }

    #[test]
    fn duplicate_policies() {
        let text = "Car 5 - Ward, Pat\n4T 75.0\n4T 70.0\n4T 72.0\n";
        let pages = pages_from_text(text);

        let mut profile = FormatProfile::default();
        let (first, _) = extract_participant(&pages, &ward(), &profile);
        assert_eq!(first[0].lap_time, 75.0);

        profile.duplicates = DuplicatePolicy::FastestWins;
        let (fastest, _) = extract_participant(&pages, &ward(), &profile);
        assert_eq!(fastest[0].lap_time, 70.0);
    }

    #[test]
    fn defensive_policy_stops_at_lapless_page() {
        let text = "Section Data for Car 5 - Ward, Pat\n1T 70.0\x0CPit summary\nnothing here\x0C2T 71.0\n";
        let pages = pages_from_text(text);

        let sparse = FormatProfile::preset(Preset::Sparse);
        let (tolerant, _) = extract_participant(&pages, &ward(), &sparse);
        assert_eq!(tolerant.len(), 2);

        let defensive = FormatProfile::preset(Preset::Strict);
        let (strict, _) = extract_participant(&pages, &ward(), &defensive);
        assert_eq!(strict.len(), 1);
    }

    #[test]
    fn multi_line_profile() {
        let text = "Section Data for Car 5 - Ward, Pat\n1\nT\n5.1\n70.5\nL\n2\nT\n5.0\n300.0\nL\n3\nT\n69.9\nL\n";
        let profile = FormatProfile::preset(Preset::MultiLine);
        let (laps, summary) = extract_participant(&pages_from_text(text), &ward(), &profile);
        assert_eq!(
            laps,
            vec![rec("5", "Ward, Pat", 1, 70.5), rec("5", "Ward, Pat", 3, 69.9)]
        );
        assert_eq!(summary.implausible, 1);
    }

    #[test]
    fn no_laps_is_a_valid_empty_result() {
        let pages =
            pages_from_text("Cover page\x0CSection Data for Car 5 - Ward, Pat\nno timing lines\n");
        let out = extract_document(&pages, None, &FormatProfile::default(), "");
        assert!(out.is_empty());
        assert_eq!(out.participants.len(), 1);
        assert_eq!(out.participants[0].laps, 0);
    }

    #[test]
    fn zero_padded_car_from_discovered_roster() {
        let pages = pages_from_text(
            "Section Data for Car 06 - Castroneves, Helio\n1T 5.1 4.9 71.5\n\
             Section Data for Car 7 - Rossi, Alexander\n1T 5.2 4.8 72.5\n",
        );
        let out = extract_document(&pages, None, &FormatProfile::default(), "");
        assert_eq!(
            out.records,
            vec![
                rec("06", "Castroneves, Helio", 1, 71.5),
                rec("7", "Rossi, Alexander", 1, 72.5),
            ]
        );
    }

    #[test]
    fn fixture_section_results() {
        let text = std::fs::read_to_string("tests/fixtures/section_results.txt").unwrap();
        let pages = pages_from_text(&text);
        let out = extract_document(
            &pages,
            None,
            &FormatProfile::default(),
            "indycar-sectionresults-race-2025-04-13.pdf",
        );

        assert_eq!(out.metadata.name, "acura-grand-prix-of-long-beach");
        assert_eq!(out.metadata.date, "2025-04-13");

        let counts: Vec<(&str, usize)> = out
            .participants
            .iter()
            .map(|s| (s.participant.id.as_str(), s.laps))
            .collect();
        assert_eq!(counts, vec![("5", 4), ("7", 3), ("10", 3)]);

        let oward_lap3 = out
            .records
            .iter()
            .find(|r| r.participant_id == "5" && r.lap_number == 3)
            .unwrap();
        assert_eq!(oward_lap3.lap_time, 70.4123);
        assert!(out.records.iter().all(|r| (20.0..=150.0).contains(&r.lap_time)));
    }

    #[test]
    fn fixture_sector_table_fastest() {
        let text = std::fs::read_to_string("tests/fixtures/sector_table.txt").unwrap();
        let pages = pages_from_text(&text);
        let profile = FormatProfile::preset(Preset::SectorTableFastest);
        let out = extract_document(&pages, Some(&[ward()]), &profile, "");
        let times: Vec<(u32, f64)> =
            out.records.iter().map(|r| (r.lap_number, r.lap_time)).collect();
        assert_eq!(times, vec![(1, 78.5012), (2, 69.8812), (3, 70.1005)]);
    }
}
