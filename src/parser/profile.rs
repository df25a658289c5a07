use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Inclusive bounds, in seconds, that a lap time must fall within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlausibleRange {
    pub min: f64,
    pub max: f64,
}

impl PlausibleRange {
    pub const fn new(min: f64, max: f64) -> Self {
        PlausibleRange { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LineShape {
    /// `22T 5.1425 ... 81.2100` on a single line.
    InlineNumeric,
    /// Lap number, marker, sector values and total each on their own line.
    MultiLine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Disambiguation {
    PositionBased,
    MinimumValid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    FirstWins,
    FastestWins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    Sparse,
    SectorTable,
    SectorTableFastest,
    Strict,
    MultiLine,
}

impl Preset {
    pub const ALL: [Preset; 5] = [
        Preset::Sparse,
        Preset::SectorTable,
        Preset::SectorTableFastest,
        Preset::Strict,
        Preset::MultiLine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Sparse => "sparse",
            Preset::SectorTable => "sector-table",
            Preset::SectorTableFastest => "sector-table-fastest",
            Preset::Strict => "strict",
            Preset::MultiLine => "multi-line",
        }
    }

    pub fn from_name(name: &str) -> Option<Preset> {
        let needle = name.trim().to_lowercase().replace('_', "-");
        Preset::ALL.into_iter().find(|p| p.name() == needle)
    }
}

/// Everything that varies between timing-sheet revisions, resolved once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatProfile {
    pub line_shape: LineShape,
    pub range: PlausibleRange,
    pub disambiguation: Disambiguation,
    pub duplicates: DuplicatePolicy,
    /// Drop out of a section after an active page that yielded no laps.
    pub deactivate_on_empty_page: bool,
    pub lap_marker: char,
    pub total_marker: char,
}

impl FormatProfile {
    pub fn preset(preset: Preset) -> Self {
        let base = FormatProfile {
            line_shape: LineShape::InlineNumeric,
            range: PlausibleRange::new(20.0, 150.0),
            disambiguation: Disambiguation::PositionBased,
            duplicates: DuplicatePolicy::FirstWins,
            deactivate_on_empty_page: false,
            lap_marker: 'T',
            total_marker: 'L',
        };
        match preset {
            Preset::Sparse => base,
            Preset::SectorTable => FormatProfile {
                range: PlausibleRange::new(65.0, 150.0),
                disambiguation: Disambiguation::MinimumValid,
                ..base
            },
            Preset::SectorTableFastest => FormatProfile {
                range: PlausibleRange::new(65.0, 150.0),
                disambiguation: Disambiguation::MinimumValid,
                duplicates: DuplicatePolicy::FastestWins,
                ..base
            },
            Preset::Strict => FormatProfile {
                disambiguation: Disambiguation::MinimumValid,
                deactivate_on_empty_page: true,
                ..base
            },
            Preset::MultiLine => FormatProfile {
                line_shape: LineShape::MultiLine,
                deactivate_on_empty_page: true,
                ..base
            },
        }
    }
}

impl Default for FormatProfile {
    fn default() -> Self {
        FormatProfile::preset(Preset::Sparse)
    }
}
