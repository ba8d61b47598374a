// THEORY:
// An `OccupancySnapshot` is the hand-off between the sampler and the scheduler.
// It is produced once per sampling cycle, holds exactly one entry per
// configured approach in configured order, and is consumed by value so the
// same snapshot cannot seed the scheduler twice.

/// One approach's entry in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccupancyReading {
    pub name: String,
    pub count: u32,
}

/// One full round of occupancy counts, in configured approach order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OccupancySnapshot {
    readings: Vec<OccupancyReading>,
}

impl OccupancySnapshot {
    pub fn new(readings: Vec<OccupancyReading>) -> Self {
        Self { readings }
    }

    /// Builds a snapshot from `(name, count)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            readings: pairs
                .into_iter()
                .map(|(name, count)| OccupancyReading {
                    name: name.into(),
                    count,
                })
                .collect(),
        }
    }

    pub fn readings(&self) -> &[OccupancyReading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn count_for(&self, name: &str) -> Option<u32> {
        self.readings.iter().find(|r| r.name == name).map(|r| r.count)
    }

    /// Index of the first reading with traffic waiting.
    pub fn first_occupied(&self) -> Option<usize> {
        self.readings.iter().position(|r| r.count > 0)
    }

    pub fn total_vehicles(&self) -> u64 {
        self.readings.iter().map(|r| r.count as u64).sum()
    }
}
