use crate::simulation_engine::grid::GridPos;
use crate::simulation_engine::movement::IdleEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Display bands for a pollution reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirQualityLevel {
    /// Too low to show an indicator.
    Negligible,
    Good,
    Moderate,
    Poor,
}

impl AirQualityLevel {
    pub fn classify(value: f64) -> Self {
        if value < 1.0 {
            AirQualityLevel::Negligible
        } else if value < 5.0 {
            AirQualityLevel::Good
        } else if value < 10.0 {
            AirQualityLevel::Moderate
        } else {
            AirQualityLevel::Poor
        }
    }
}

/// Sparse per-cell pollution. Missing cells read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "Vec<PollutionEntry>", from = "Vec<PollutionEntry>")]
pub struct AirQualityMap {
    levels: BTreeMap<GridPos, f64>,
}

/// Flat form of one map entry, used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutionEntry {
    pub x: usize,
    pub y: usize,
    pub value: f64,
}

impl From<AirQualityMap> for Vec<PollutionEntry> {
    fn from(map: AirQualityMap) -> Self {
        map.iter()
            .map(|(pos, value)| PollutionEntry {
                x: pos.x,
                y: pos.y,
                value,
            })
            .collect()
    }
}

impl From<Vec<PollutionEntry>> for AirQualityMap {
    fn from(entries: Vec<PollutionEntry>) -> Self {
        let levels = entries
            .into_iter()
            .map(|e| (GridPos::new(e.x, e.y), e.value))
            .collect();
        Self { levels }
    }
}

impl AirQualityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pos: GridPos) -> f64 {
        self.levels.get(&pos).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (GridPos, f64)> + '_ {
        self.levels.iter().map(|(&pos, &value)| (pos, value))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// Multiplies every entry by `factor` and forgets entries that fall
    /// below `threshold`.
    pub fn decay(&mut self, factor: f64, threshold: f64) {
        self.levels.retain(|_, value| {
            *value *= factor;
            *value >= threshold
        });
    }

    pub fn add(&mut self, pos: GridPos, amount: f64) {
        *self.levels.entry(pos).or_insert(0.0) += amount;
    }

    /// One air-quality tick: decay last tick's map, then add this tick's
    /// idle emissions so fresh increments are not decayed yet.
    pub fn update(&mut self, events: &[IdleEvent], decay: f64, threshold: f64, per_idle: f64) {
        self.decay(decay, threshold);
        for event in events {
            self.add(event.pos, per_idle);
        }
    }

    /// (min, max, average) over present entries; all zero when empty.
    pub fn stats(&self) -> (f64, f64, f64) {
        if self.levels.is_empty() {
            return (0.0, 0.0, 0.0);
        }
        let min = self.levels.values().copied().fold(f64::INFINITY, f64::min);
        let max = self.levels.values().copied().fold(0.0, f64::max);
        let avg = self.levels.values().sum::<f64>() / self.levels.len() as f64;
        (min, max, avg)
    }
}
