use serde::{Deserialize, Serialize};

/// A car/driver pairing. Identity is the car number alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Participant {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Numeric view of the car number, used for ordering rosters.
    pub fn number(&self) -> Option<u32> {
        self.id.trim().parse().ok()
    }

    /// Car numbers are digits only ("06" is fine); the driver name must be present.
    pub fn validate(&self) -> Result<(), String> {
        let id = self.id.trim();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("car id must be numeric, got {id:?}"));
        }
        if self.name.trim().is_empty() {
            return Err(format!("missing driver name for car {id}"));
        }
        Ok(())
    }
}

/// One page of extracted document text. `text` is `None` when the page yielded nothing.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub text: Option<String>,
}

impl Page {
    pub fn new(index: usize, text: &str) -> Self {
        let text = if text.trim().is_empty() {
            None
        } else {
            Some(text.to_string())
        };
        Page { index, text }
    }
}

/// Split raw text into pages at form feeds.
pub fn pages_from_text(raw: &str) -> Vec<Page> {
    raw.replace("\r\n", "\n")
        .split('\x0C')
        .enumerate()
        .map(|(i, chunk)| Page::new(i, chunk))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    #[serde(rename = "Car")]
    pub participant_id: String,
    #[serde(rename = "Driver")]
    pub participant_name: String,
    #[serde(rename = "Lap")]
    pub lap_number: u32,
    #[serde(rename = "T (Time)")]
    pub lap_time: f64,
}

pub const UNKNOWN_EVENT: &str = "unknown-event";
pub const UNKNOWN_DATE: &str = "unknown-date";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    pub name: String,
    pub date: String,
}

impl Default for EventMetadata {
    fn default() -> Self {
        EventMetadata {
            name: UNKNOWN_EVENT.to_string(),
            date: UNKNOWN_DATE.to_string(),
        }
    }
}

impl EventMetadata {
    /// Base name for the output table, without extension.
    pub fn table_stem(&self) -> String {
        format!("indycar-{}-{}-laptimes", self.name, self.date)
    }
}
