//! Outcome classification and run-level result aggregation.
//!
//! [`OutcomeClassifier`] decides whether a finished job's outcome is
//! "bad". [`ResultAggregator`] keeps every bad outcome observed during a
//! run in a [`BadOutcomeMap`] and derives the manager's own terminal
//! outcome from it when the run closes.

use std::collections::HashSet;

use crate::types::{JobKey, JobOutcome};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Outcome reported by the manager when no bad outcome was recorded.
pub const FINISHED_OUTCOME: &str = "finished";

/// Outcome labels treated as bad when no explicit set is configured.
pub const DEFAULT_BAD_OUTCOMES: &[&str] = &[
    "failed",
    "killed by oom",
    "cancelled",
    "cancel_timeout",
    "memusage_exceeded",
    "diskusage_exceeded",
    "cancelled (stalled)",
];

// ---------------------------------------------------------------------------
// OutcomeClassifier
// ---------------------------------------------------------------------------

/// Classification of a finished job's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    Good,
    Bad,
}

impl OutcomeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeClass::Good => "good",
            OutcomeClass::Bad => "bad",
        }
    }
}

/// Maps raw outcome labels to [`OutcomeClass`] using a fixed set of bad
/// labels. Anything outside the set is good.
#[derive(Debug, Clone)]
pub struct OutcomeClassifier {
    bad: HashSet<String>,
}

impl OutcomeClassifier {
    pub fn new<I, S>(bad_outcomes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bad: bad_outcomes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classify(&self, outcome: &JobOutcome) -> OutcomeClass {
        if self.bad.contains(outcome.as_str()) {
            OutcomeClass::Bad
        } else {
            OutcomeClass::Good
        }
    }

    pub fn is_bad(&self, outcome: &JobOutcome) -> bool {
        self.classify(outcome) == OutcomeClass::Bad
    }
}

impl Default for OutcomeClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_BAD_OUTCOMES.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// BadOutcomeMap
// ---------------------------------------------------------------------------

/// Append-only map of job key -> bad outcome, in observation order.
///
/// Entries are never pruned during a run. A key is recorded at most once.
#[derive(Debug, Clone, Default)]
pub struct BadOutcomeMap {
    entries: Vec<(JobKey, JobOutcome)>,
}

impl BadOutcomeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a bad outcome. Returns `false` if `key` was already recorded,
    /// in which case the map is left untouched.
    pub fn record(&mut self, key: JobKey, outcome: JobOutcome) -> bool {
        if self.contains(&key) {
            return false;
        }
        self.entries.push((key, outcome));
        true
    }

    pub fn contains(&self, key: &JobKey) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &JobKey) -> Option<&JobOutcome> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, outcome)| outcome)
    }

    /// The earliest recorded entry.
    pub fn first(&self) -> Option<(&JobKey, &JobOutcome)> {
        self.entries.first().map(|(k, o)| (k, o))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&JobKey, &JobOutcome)> {
        self.entries.iter().map(|(k, o)| (k, o))
    }
}

// ---------------------------------------------------------------------------
// ResultAggregator
// ---------------------------------------------------------------------------

/// Collects the outcomes observed during a run and produces the
/// manager's own terminal outcome.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    classifier: OutcomeClassifier,
    bad: BadOutcomeMap,
}

impl ResultAggregator {
    pub fn new(classifier: OutcomeClassifier) -> Self {
        Self {
            classifier,
            bad: BadOutcomeMap::new(),
        }
    }

    /// Classify a freshly observed outcome, recording it when bad.
    pub fn observe(&mut self, key: &JobKey, outcome: &JobOutcome) -> OutcomeClass {
        let class = self.classifier.classify(outcome);
        if class == OutcomeClass::Bad {
            self.bad.record(key.clone(), outcome.clone());
        }
        class
    }

    pub fn classifier(&self) -> &OutcomeClassifier {
        &self.classifier
    }

    pub fn bad_outcomes(&self) -> &BadOutcomeMap {
        &self.bad
    }

    /// First recorded bad outcome, or [`FINISHED_OUTCOME`] when the run
    /// had none.
    ///
    /// With several bad outcomes in one run, "first" follows observation
    /// order, which depends on the randomized scan of the tick that saw
    /// them. No priority among bad labels is applied.
    pub fn terminal_outcome(&self) -> JobOutcome {
        self.bad
            .first()
            .map(|(_, outcome)| outcome.clone())
            .unwrap_or_else(JobOutcome::finished)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- OutcomeClassifier --

    #[test]
    fn configured_labels_are_bad() {
        let classifier = OutcomeClassifier::new(["banned", "failed"]);
        assert_eq!(classifier.classify(&"banned".into()), OutcomeClass::Bad);
        assert_eq!(classifier.classify(&"failed".into()), OutcomeClass::Bad);
    }

    #[test]
    fn unknown_labels_are_good() {
        let classifier = OutcomeClassifier::new(["banned"]);
        assert_eq!(classifier.classify(&"finished".into()), OutcomeClass::Good);
        assert_eq!(
            classifier.classify(&"some_new_reason".into()),
            OutcomeClass::Good
        );
    }

    #[test]
    fn default_classifier_uses_default_labels() {
        let classifier = OutcomeClassifier::default();
        assert!(classifier.is_bad(&"killed by oom".into()));
        assert!(!classifier.is_bad(&"finished".into()));
    }

    #[test]
    fn empty_classifier_treats_everything_as_good() {
        let classifier = OutcomeClassifier::new(Vec::<String>::new());
        assert!(!classifier.is_bad(&"failed".into()));
    }

    // -- BadOutcomeMap --

    #[test]
    fn record_is_at_most_once_per_key() {
        let mut map = BadOutcomeMap::new();
        assert!(map.record("1/1/1".into(), "failed".into()));
        assert!(!map.record("1/1/1".into(), "banned".into()));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&"1/1/1".into()), Some(&JobOutcome::new("failed")));
    }

    #[test]
    fn first_follows_observation_order() {
        let mut map = BadOutcomeMap::new();
        map.record("1/1/2".into(), "banned".into());
        map.record("1/1/1".into(), "failed".into());
        let (key, outcome) = map.first().unwrap();
        assert_eq!(key.as_str(), "1/1/2");
        assert_eq!(outcome.as_str(), "banned");
    }

    // -- ResultAggregator --

    #[test]
    fn terminal_outcome_defaults_to_finished() {
        let aggregator = ResultAggregator::default();
        assert_eq!(aggregator.terminal_outcome(), JobOutcome::finished());
    }

    #[test]
    fn bad_outcome_wins_over_good() {
        let mut aggregator = ResultAggregator::new(OutcomeClassifier::new(["banned"]));
        assert_eq!(
            aggregator.observe(&"1/1/1".into(), &"banned".into()),
            OutcomeClass::Bad
        );
        assert_eq!(
            aggregator.observe(&"1/1/2".into(), &"finished".into()),
            OutcomeClass::Good
        );
        assert_eq!(aggregator.terminal_outcome().as_str(), "banned");
        assert_eq!(aggregator.bad_outcomes().len(), 1);
    }

    #[test]
    fn good_outcomes_are_not_recorded() {
        let mut aggregator = ResultAggregator::new(OutcomeClassifier::new(["banned"]));
        aggregator.observe(&"1/1/1".into(), &"finished".into());
        assert!(aggregator.bad_outcomes().is_empty());
    }
}
