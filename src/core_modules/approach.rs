// THEORY:
// An `Approach` is one monitored traffic direction. It is a plain data holder:
// the sampler writes its occupancy count and the scheduler flips its green
// flag. It knows nothing about the rotation it takes part in.

/// One monitored traffic direction and its latest signal and occupancy state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approach {
    /// The identifier from the startup configuration, e.g. "NORTH".
    pub name: String,
    /// Vehicles seen in the latest sample. Zero before the first sample.
    pub count: u32,
    /// Whether this approach currently holds the green signal.
    pub has_green: bool,
}

impl Approach {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            has_green: false,
        }
    }

    /// An approach is eligible to start the rotation when it has traffic waiting.
    pub fn is_eligible(&self) -> bool {
        self.count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_waiting_traffic_is_eligible() {
        let mut approach = Approach::new("NORTH");
        assert!(!approach.is_eligible());
        approach.count = 1;
        assert!(approach.is_eligible());
    }
}
