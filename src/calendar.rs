//! Race calendar and document-id anchors for the timing archive.
//!
//! Document ids on the archive are sequential but not published, so each
//! year lists a few anchor ids; candidates are probed ±10 around each.

use std::sync::LazyLock;

use chrono::{Local, NaiveDate};
use regex::Regex;

const BASE_URL: &str = "http://www.imscdn.com/INDYCAR/Documents";
const DOCUMENT_NAME: &str = "indycar-sectionresults-race.pdf";
const PROBE_RADIUS: u32 = 10;
const FALLBACK_ANCHOR: u32 = 6000;

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

const DOCUMENT_ANCHORS: &[(i32, &[u32])] = &[
    (
        2019,
        &[
            5463, 5471, 5480, 5490, 5500, 5510, 5520, 5530, 5540, 5550, 5560, 5570, 5580, 5590,
            5600,
        ],
    ),
    (2020, &[5733, 5740, 5750, 5760, 5770, 5780, 5790]),
    (2021, &[5797, 5810, 5820, 5830, 5840, 5850, 5860, 5870, 5880]),
    (2022, &[5905, 5920, 5930, 5940, 5950, 5960, 5970, 5980, 5990]),
    (2023, &[6125, 6140, 6150, 6160, 6170, 6180, 6190, 6200, 6210]),
    (2024, &[6298, 6310, 6320, 6330, 6340, 6350, 6360, 6370, 6380]),
    (2025, &[6472, 6480, 6490, 6500, 6510, 6520, 6530, 6540, 6550]),
];

const TRACKS: &[(&str, &str)] = &[
    ("2019-04-07", "long-beach"),
    ("2025-04-13", "long-beach"),
    ("2025-05-04", "birmingham"),
    ("2025-06-01", "detroit"),
];

const KNOWN_URLS: &[(&str, &str)] = &[(
    "2019-06-08",
    "http://www.imscdn.com/INDYCAR/Documents/5471/2019-06-08/indycar-sectionresults-race.pdf",
)];

const RACE_DATES: &[(i32, &[&str])] = &[
    (2019, &[
        "2019-03-10", "2019-03-24", "2019-04-07", "2019-04-14", "2019-05-11", "2019-05-26",
        "2019-06-01", "2019-06-08", "2019-06-23", "2019-07-14", "2019-07-20", "2019-07-21",
        "2019-07-28", "2019-08-18", "2019-08-24", "2019-09-01", "2019-09-22",
    ]),
    (2020, &[
        "2020-06-06", "2020-07-04", "2020-07-11", "2020-07-12", "2020-07-17", "2020-08-23",
        "2020-08-29", "2020-08-30", "2020-09-12", "2020-09-13", "2020-10-02", "2020-10-03",
        "2020-10-25",
    ]),
    (2021, &[
        "2021-04-18", "2021-04-25", "2021-05-01", "2021-05-02", "2021-05-15", "2021-05-30",
        "2021-06-12", "2021-06-13", "2021-06-20", "2021-07-04", "2021-07-11", "2021-08-08",
        "2021-08-14", "2021-08-21", "2021-09-12", "2021-09-19", "2021-09-26",
    ]),
    (2022, &[
        "2022-02-27", "2022-03-20", "2022-04-10", "2022-05-01", "2022-05-14", "2022-05-29",
        "2022-06-05", "2022-06-12", "2022-07-03", "2022-07-17", "2022-07-24", "2022-07-30",
        "2022-08-07", "2022-08-20", "2022-09-04", "2022-09-11",
    ]),
    (2023, &[
        "2023-03-05", "2023-04-02", "2023-04-16", "2023-04-30", "2023-05-13", "2023-05-28",
        "2023-06-04", "2023-06-18", "2023-07-02", "2023-07-16", "2023-07-22", "2023-07-23",
        "2023-08-06", "2023-08-12", "2023-08-27", "2023-09-03", "2023-09-10",
    ]),
    (2024, &[
        "2024-03-10", "2024-03-24", "2024-04-21", "2024-04-28", "2024-05-11", "2024-05-26",
        "2024-06-02", "2024-06-09", "2024-06-23", "2024-07-07", "2024-07-13", "2024-07-14",
        "2024-07-21", "2024-08-17", "2024-08-25", "2024-08-31", "2024-09-01", "2024-09-15",
    ]),
    (2025, &[
        "2025-03-02", "2025-03-23", "2025-04-13", "2025-05-04", "2025-05-10", "2025-05-25",
        "2025-06-01", "2025-06-15", "2025-06-22", "2025-07-06", "2025-07-12", "2025-07-13",
        "2025-07-20", "2025-07-27", "2025-08-10", "2025-08-24", "2025-08-31",
    ]),
];

pub fn is_valid_date(date: &str) -> bool {
    DATE_RE.is_match(date) && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

pub fn is_future(date: &str, today: NaiveDate) -> bool {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d > today)
        .unwrap_or(false)
}

/// Past race dates, optionally restricted to one season.
pub fn race_dates(year: Option<i32>) -> Vec<&'static str> {
    let today = Local::now().date_naive();
    RACE_DATES
        .iter()
        .filter(|(y, _)| year.map_or(true, |want| *y == want))
        .flat_map(|(_, dates)| dates.iter().copied())
        .filter(|d| !is_future(d, today))
        .collect()
}

pub fn track_for(date: &str) -> Option<&'static str> {
    TRACKS.iter().find(|(d, _)| *d == date).map(|(_, t)| *t)
}

/// Local file name for a race date's document.
pub fn target_filename(date: &str) -> String {
    match track_for(date) {
        Some(track) => format!("indycar-sectionresults-race-{track}-{date}.pdf"),
        None => format!("indycar-sectionresults-race-{date}.pdf"),
    }
}

pub fn document_url(id: u32, date: &str) -> String {
    format!("{BASE_URL}/{id}/{date}/{DOCUMENT_NAME}")
}

/// Every URL worth probing for a date: known direct links, then each anchor's neighborhood.
pub fn candidate_urls(date: &str) -> Vec<String> {
    let mut urls: Vec<String> = KNOWN_URLS
        .iter()
        .filter(|(d, _)| *d == date)
        .map(|(_, u)| u.to_string())
        .collect();

    let year: i32 = date.get(..4).and_then(|y| y.parse().ok()).unwrap_or_default();
    let anchors: &[u32] = DOCUMENT_ANCHORS
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, a)| *a)
        .unwrap_or(&[FALLBACK_ANCHOR]);

    for anchor in anchors {
        for id in anchor.saturating_sub(PROBE_RADIUS)..=anchor + PROBE_RADIUS {
            let url = document_url(id, date);
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}
