//! Debounced stage classification state machine
//!
//! Per-frame confidence vectors are noisy: drum reflections and LED
//! flicker flip the winning class for a cycle or two at a time. A stage
//! change is only committed after a configured number of consecutive
//! cycles agree on the same winning label; any disagreeing cycle resets
//! the count. The committed stage is the only externally visible one.

use crate::config::ClassifierTuning;
use crate::traits::engine::Score;

/// Debounce progress toward a stage change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Debounce {
    /// No change candidate
    Idle,
    /// A candidate stage has won `count` consecutive cycles
    Pending { stage: &'static str, count: u8 },
}

/// A committed stage transition
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StageChange {
    /// The newly committed stage
    pub stage: &'static str,
    /// Winning confidence at commit time
    pub confidence: f32,
}

/// The stage classification state machine
///
/// The machine has no terminal state; a committed stage becomes the
/// comparison baseline for all future cycles.
#[derive(Debug, Clone)]
pub struct StageClassifier {
    tuning: ClassifierTuning,
    current: Option<&'static str>,
    last_confidence: f32,
    debounce: Debounce,
}

impl StageClassifier {
    /// Create a classifier with no committed stage
    pub fn new(tuning: ClassifierTuning) -> Self {
        Self {
            tuning,
            current: None,
            last_confidence: 0.0,
            debounce: Debounce::Idle,
        }
    }

    /// The committed, externally visible stage
    pub fn current_stage(&self) -> Option<&'static str> {
        self.current
    }

    /// Confidence of the last accepted cycle
    pub fn last_confidence(&self) -> f32 {
        self.last_confidence
    }

    /// The pending change candidate, if any
    pub fn pending(&self) -> Option<(&'static str, u8)> {
        match self.debounce {
            Debounce::Idle => None,
            Debounce::Pending { stage, count } => Some((stage, count)),
        }
    }

    /// Process one cycle's confidence vector
    ///
    /// Returns the committed change, if this cycle completed the
    /// debounce. The committed stage changes at most once per call.
    pub fn process(&mut self, scores: &[Score]) -> Option<StageChange> {
        // Strictly-greater argmax: ties go to the first occurrence in
        // label order
        let first = scores.first()?;
        let mut best = *first;
        for score in &scores[1..] {
            if score.value > best.value {
                best = *score;
            }
        }

        if best.value < self.tuning.min_confidence {
            // Too uncertain to count at all; lastConfidence keeps the
            // value of the last accepted cycle
            return None;
        }

        if self.current == Some(best.label) {
            // Reaffirmation: track confidence, no transition
            self.last_confidence = best.value;
            return None;
        }

        let count = match self.debounce {
            Debounce::Pending { stage, count } if stage == best.label => count.saturating_add(1),
            // Any disagreement restarts the debounce; no partial credit
            _ => 1,
        };

        if count >= self.tuning.debounce_cycles {
            self.current = Some(best.label);
            self.last_confidence = best.value;
            self.debounce = Debounce::Idle;
            Some(StageChange {
                stage: best.label,
                confidence: best.value,
            })
        } else {
            self.debounce = Debounce::Pending {
                stage: best.label,
                count,
            };
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning(k: u8) -> ClassifierTuning {
        ClassifierTuning {
            min_confidence: 0.60,
            debounce_cycles: k,
        }
    }

    fn scores(pairs: &[(&'static str, f32)]) -> heapless::Vec<Score, 8> {
        pairs
            .iter()
            .map(|&(label, value)| Score { label, value })
            .collect()
    }

    #[test]
    fn test_low_confidence_changes_nothing() {
        let mut classifier = StageClassifier::new(tuning(3));
        let result = classifier.process(&scores(&[("rinse", 0.4), ("spin", 0.55)]));

        assert!(result.is_none());
        assert_eq!(classifier.current_stage(), None);
        assert_eq!(classifier.last_confidence(), 0.0);
        assert_eq!(classifier.pending(), None);
    }

    #[test]
    fn test_commit_requires_exactly_k_cycles() {
        let mut classifier = StageClassifier::new(tuning(3));
        let spin = scores(&[("rinse", 0.1), ("spin", 0.9)]);

        assert!(classifier.process(&spin).is_none());
        assert_eq!(classifier.pending(), Some(("spin", 1)));
        assert!(classifier.process(&spin).is_none());
        assert_eq!(classifier.pending(), Some(("spin", 2)));

        let change = classifier.process(&spin).unwrap();
        assert_eq!(change.stage, "spin");
        assert_eq!(change.confidence, 0.9);
        assert_eq!(classifier.current_stage(), Some("spin"));
        assert_eq!(classifier.pending(), None);
    }

    #[test]
    fn test_disagreement_resets_pending_count() {
        let mut classifier = StageClassifier::new(tuning(3));
        let spin = scores(&[("spin", 0.9)]);
        let rinse = scores(&[("rinse", 0.8), ("spin", 0.1)]);

        classifier.process(&spin);
        classifier.process(&spin);
        // One dissenting cycle discards both spin votes
        classifier.process(&rinse);
        assert_eq!(classifier.pending(), Some(("rinse", 1)));

        // Spin now needs three fresh cycles again
        classifier.process(&spin);
        classifier.process(&spin);
        assert_eq!(classifier.current_stage(), None);
        assert!(classifier.process(&spin).is_some());
    }

    #[test]
    fn test_reaffirmation_updates_confidence_only() {
        let mut classifier = StageClassifier::new(tuning(1));
        classifier.process(&scores(&[("rinse", 0.7)]));
        assert_eq!(classifier.current_stage(), Some("rinse"));

        let result = classifier.process(&scores(&[("rinse", 0.95)]));
        assert!(result.is_none());
        assert_eq!(classifier.current_stage(), Some("rinse"));
        assert_eq!(classifier.last_confidence(), 0.95);
    }

    #[test]
    fn test_ties_go_to_first_label() {
        let mut classifier = StageClassifier::new(tuning(1));
        let change = classifier
            .process(&scores(&[("soak", 0.8), ("rinse", 0.8)]))
            .unwrap();
        assert_eq!(change.stage, "soak");
    }

    #[test]
    fn test_committed_stage_is_new_baseline() {
        let mut classifier = StageClassifier::new(tuning(2));
        let spin = scores(&[("spin", 0.9)]);
        let rinse = scores(&[("rinse", 0.9)]);

        classifier.process(&spin);
        classifier.process(&spin);
        assert_eq!(classifier.current_stage(), Some("spin"));

        // Moving back to rinse needs a full debounce again
        classifier.process(&rinse);
        assert_eq!(classifier.current_stage(), Some("spin"));
        assert!(classifier.process(&rinse).is_some());
        assert_eq!(classifier.current_stage(), Some("rinse"));
    }

    #[test]
    fn test_empty_scores_are_ignored() {
        let mut classifier = StageClassifier::new(tuning(1));
        assert!(classifier.process(&[]).is_none());
        assert_eq!(classifier.current_stage(), None);
    }
}
