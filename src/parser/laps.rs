use std::collections::BTreeMap;

use crate::model::{LapRecord, Participant};

use super::profile::{DuplicatePolicy, PlausibleRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    Inserted,
    Replaced,
    KeptExisting,
    Implausible,
}

impl Acceptance {
    pub fn is_valid(self) -> bool {
        !matches!(self, Acceptance::Implausible)
    }
}

/// Accepted laps for one participant, keyed by lap number.
#[derive(Debug)]
pub struct LapBook {
    participant: Participant,
    range: PlausibleRange,
    policy: DuplicatePolicy,
    laps: BTreeMap<u32, LapRecord>,
}

impl LapBook {
    pub fn new(participant: Participant, range: PlausibleRange, policy: DuplicatePolicy) -> Self {
        LapBook {
            participant,
            range,
            policy,
            laps: BTreeMap::new(),
        }
    }

    pub fn accept(&mut self, lap_number: u32, lap_time: f64) -> Acceptance {
        if lap_number == 0 || !self.range.contains(lap_time) {
            return Acceptance::Implausible;
        }
        match self.laps.get_mut(&lap_number) {
            None => {
                self.laps.insert(
                    lap_number,
                    LapRecord {
                        participant_id: self.participant.id.clone(),
                        participant_name: self.participant.name.clone(),
                        lap_number,
                        lap_time,
                    },
                );
                Acceptance::Inserted
            }
            Some(existing) => match self.policy {
                DuplicatePolicy::FastestWins if lap_time < existing.lap_time => {
                    existing.lap_time = lap_time;
                    Acceptance::Replaced
                }
                _ => Acceptance::KeptExisting,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    /// Records in ascending lap order.
    pub fn into_records(self) -> Vec<LapRecord> {
        self.laps.into_values().collect()
    }
}
