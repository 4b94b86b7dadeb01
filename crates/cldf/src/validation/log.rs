use tracing::{error, info, warn};

use super::observation::{Observation, Severity};

/// Collects the observations of a validation run.
///
/// Passing a log to validation selects accumulate mode: every problem is
/// recorded here (and emitted as a `tracing` event) and validation goes on.
#[derive(Debug, Clone, Default)]
pub struct ValidationLog {
    observations: Vec<Observation>,
}

impl ValidationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an observation.
    pub fn record(&mut self, observation: Observation) {
        match observation.severity {
            Severity::Error => error!(kind = observation.observation_type.label(), "{}", observation),
            Severity::Warning => warn!(kind = observation.observation_type.label(), "{}", observation),
            Severity::Info => info!(kind = observation.observation_type.label(), "{}", observation),
        }
        self.observations.push(observation);
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn errors(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| o.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter().filter(|o| o.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }
}
