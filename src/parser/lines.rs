use std::sync::LazyLock;

use regex::Regex;

use super::profile::{Disambiguation, FormatProfile, LineShape, PlausibleRange};

static INLINE_LAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)T\s+(.*)$").unwrap());
static BARE_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());
static BARE_DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\d+$").unwrap());

/// A lap number plus every numeric value seen for it, before plausibility filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct LapCandidate {
    pub lap_number: u32,
    pub tokens: Vec<f64>,
}

/// Recognize `<lap>T <values...>`. Returns every decimal in the tail, left to right.
pub fn classify_line(line: &str) -> Option<LapCandidate> {
    let caps = INLINE_LAP_RE.captures(line.trim())?;
    let lap_number: u32 = caps[1].parse().ok()?;
    if lap_number == 0 {
        return None;
    }
    let tokens: Vec<f64> = caps[2]
        .split_whitespace()
        .filter(|t| BARE_DECIMAL_RE.is_match(t))
        .filter_map(|t| t.parse().ok())
        .collect();
    if tokens.is_empty() {
        return None;
    }
    Some(LapCandidate { lap_number, tokens })
}

/// Pick the authoritative lap time out of a candidate's tokens.
///
/// A single in-range token always wins. With several in range, `PositionBased`
/// takes the token at index `min(2, n - 1)` (falling back to the smallest
/// in-range token when that slot is itself out of range) and `MinimumValid`
/// takes the smallest in-range token. No in-range token means no lap.
pub fn resolve_lap_time(
    tokens: &[f64],
    range: PlausibleRange,
    policy: Disambiguation,
) -> Option<f64> {
    let in_range: Vec<f64> = tokens.iter().copied().filter(|t| range.contains(*t)).collect();
    let smallest = || in_range.iter().copied().reduce(f64::min);

    match in_range.len() {
        0 => None,
        1 => Some(in_range[0]),
        _ => match policy {
            Disambiguation::MinimumValid => smallest(),
            Disambiguation::PositionBased => {
                let idx = 2.min(tokens.len() - 1);
                let positional = tokens[idx];
                if range.contains(positional) {
                    Some(positional)
                } else {
                    smallest()
                }
            }
        },
    }
}

/// Stateful reader for sheets where every value sits on its own line:
///
/// ```text
/// 12
/// T
/// 5.10
/// 4.98
/// 71.23
/// L
/// ```
#[derive(Debug, Clone)]
pub struct MultiLineAssembler {
    lap_marker: String,
    total_marker: String,
    pending_lap: Option<u32>,
    prev_int: Option<u32>,
    prev_decimal: Option<f64>,
}

impl MultiLineAssembler {
    pub fn new(lap_marker: char, total_marker: char) -> Self {
        MultiLineAssembler {
            lap_marker: lap_marker.to_string(),
            total_marker: total_marker.to_string(),
            pending_lap: None,
            prev_int: None,
            prev_decimal: None,
        }
    }

    pub fn push(&mut self, line: &str) -> Option<LapCandidate> {
        let line = line.trim();
        let mut out = None;

        if line == self.lap_marker {
            if let Some(lap) = self.prev_int.filter(|n| *n > 0) {
                self.pending_lap = Some(lap);
            }
        } else if line == self.total_marker {
            if let (Some(lap), Some(time)) = (self.pending_lap, self.prev_decimal) {
                out = Some(LapCandidate {
                    lap_number: lap,
                    tokens: vec![time],
                });
                self.pending_lap = None;
            }
        }

        self.prev_int = None;
        self.prev_decimal = None;
        if BARE_INT_RE.is_match(line) {
            self.prev_int = line.parse().ok();
        } else if BARE_DECIMAL_RE.is_match(line) {
            self.prev_decimal = line.parse().ok();
        }
        out
    }

    pub fn reset(&mut self) {
        self.pending_lap = None;
        self.prev_int = None;
        self.prev_decimal = None;
    }
}

/// One classifier per section scan, chosen by the profile's line shape.
#[derive(Debug, Clone)]
pub enum LineClassifier {
    Inline,
    MultiLine(MultiLineAssembler),
}

impl LineClassifier {
    pub fn for_profile(profile: &FormatProfile) -> Self {
        match profile.line_shape {
            LineShape::InlineNumeric => LineClassifier::Inline,
            LineShape::MultiLine => LineClassifier::MultiLine(MultiLineAssembler::new(
                profile.lap_marker,
                profile.total_marker,
            )),
        }
    }

    pub fn feed(&mut self, line: &str) -> Option<LapCandidate> {
        match self {
            LineClassifier::Inline => classify_line(line),
            LineClassifier::MultiLine(asm) => asm.push(line),
        }
    }

    pub fn reset(&mut self) {
        if let LineClassifier::MultiLine(asm) = self {
            asm.reset();
        }
    }
}
