//! Per-trial look-duration aggregation
//!
//! Within a trial, frames are walked in time order and split into runs of identical
//! look state. A run lasts from its first frame's timestamp to its last frame's
//! timestamp; the gap between the last frame of one run and the first frame of the
//! next is not credited to either state. Run durations are summed per state.

use crate::types::{FrameRecord, LookState, TrialLookTotals};
use std::collections::BTreeMap;

/// Run tracking state while walking a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run {
    NoOpenRun,
    OpenRun {
        state: LookState,
        start_ms: i64,
        last_ms: i64,
    },
}

#[derive(Debug, Default)]
struct RunTotals {
    on_ms: i64,
    off_ms: i64,
}

impl RunTotals {
    fn commit(&mut self, state: LookState, duration_ms: i64) {
        match state {
            LookState::On => self.on_ms += duration_ms,
            LookState::Off => self.off_ms += duration_ms,
        }
    }

    fn to_seconds(&self) -> TrialLookTotals {
        TrialLookTotals::new(self.on_ms as f64 / 1000.0, self.off_ms as f64 / 1000.0).rounded()
    }
}

/// Aggregator turning trial-labeled frames into per-trial look totals
pub struct DurationAggregator;

impl DurationAggregator {
    /// Totals for trials `1..=n`, in trial order.
    ///
    /// `n` is the larger of `trial_count` and the highest trial label present.
    /// Trials with no frames report `[0.0, 0.0]`. Frames labeled 0 are ignored.
    pub fn aggregate(frames: &[FrameRecord], trial_count: usize) -> Vec<TrialLookTotals> {
        let mut by_trial: BTreeMap<usize, Vec<FrameRecord>> = BTreeMap::new();
        for frame in frames.iter().filter(|f| f.trial > 0) {
            by_trial.entry(frame.trial).or_default().push(*frame);
        }

        let max_observed = by_trial.keys().next_back().copied().unwrap_or(0);
        let mut totals = vec![TrialLookTotals::default(); trial_count.max(max_observed)];

        for (trial, mut trial_frames) in by_trial {
            trial_frames.sort_by_key(|f| f.time_ms);
            totals[trial - 1] = Self::trial_totals(&trial_frames);
        }

        totals
    }

    /// Sum run durations over frames that are already in time order
    pub fn trial_totals(frames: &[FrameRecord]) -> TrialLookTotals {
        let mut totals = RunTotals::default();
        let mut run = Run::NoOpenRun;

        for frame in frames {
            run = match run {
                Run::OpenRun {
                    state,
                    start_ms,
                    ..
                } if state == frame.look_state => Run::OpenRun {
                    state,
                    start_ms,
                    last_ms: frame.time_ms,
                },
                Run::OpenRun {
                    state,
                    start_ms,
                    last_ms,
                } => {
                    totals.commit(state, last_ms - start_ms);
                    Run::OpenRun {
                        state: frame.look_state,
                        start_ms: frame.time_ms,
                        last_ms: frame.time_ms,
                    }
                }
                Run::NoOpenRun => Run::OpenRun {
                    state: frame.look_state,
                    start_ms: frame.time_ms,
                    last_ms: frame.time_ms,
                },
            };
        }

        // The trailing run is never closed by a state change
        if let Run::OpenRun {
            state,
            start_ms,
            last_ms,
        } = run
        {
            totals.commit(state, last_ms - start_ms);
        }

        totals.to_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn frames(trial: usize, looks: &[(&str, i64)]) -> Vec<FrameRecord> {
        looks.iter()
            .enumerate()
            .map(|(i, (label, time_ms))| FrameRecord {
                frame_index: i,
                look_state: LookState::parse(label).unwrap(),
                time_ms: *time_ms,
                trial,
            })
            .collect()
    }

    #[test]
    fn test_two_runs() {
        let input = frames(1, &[("on", 0), ("on", 500), ("off", 1000), ("off", 1500)]);
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals, vec![TrialLookTotals::new(0.5, 0.5)]);
    }

    #[test]
    fn test_single_look_trial() {
        let input = frames(1, &[("on", 0), ("on", 1000)]);
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals, vec![TrialLookTotals::new(1.0, 0.0)]);
    }

    #[test]
    fn test_one_frame_trial() {
        let input = frames(1, &[("off", 4200)]);
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals, vec![TrialLookTotals::new(0.0, 0.0)]);
    }

    #[test]
    fn test_alternating_every_frame() {
        let input = frames(1, &[("on", 0), ("off", 33), ("on", 67), ("off", 100)]);
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals, vec![TrialLookTotals::new(0.0, 0.0)]);
    }

    #[test]
    fn test_returning_look_accumulates() {
        let input = frames(
            1,
            &[
                ("on", 0),
                ("on", 300),
                ("off", 400),
                ("off", 600),
                ("on", 700),
                ("on", 1200),
            ],
        );
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals, vec![TrialLookTotals::new(0.8, 0.2)]);
    }

    #[test]
    fn test_empty_trial_filled_with_zeros() {
        let mut input = frames(1, &[("on", 0), ("on", 1000)]);
        input.extend(frames(3, &[("off", 5000), ("off", 5250)]));

        let totals = DurationAggregator::aggregate(&input, 4);
        assert_eq!(
            totals,
            vec![
                TrialLookTotals::new(1.0, 0.0),
                TrialLookTotals::new(0.0, 0.0),
                TrialLookTotals::new(0.0, 0.25),
                TrialLookTotals::new(0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_untrialed_frames_ignored() {
        let mut input = frames(0, &[("on", 0), ("on", 900)]);
        input.extend(frames(1, &[("off", 1000), ("off", 1100)]));

        let totals = DurationAggregator::aggregate(&input, 0);
        assert_eq!(totals, vec![TrialLookTotals::new(0.0, 0.1)]);
        assert!(DurationAggregator::aggregate(&frames(0, &[("on", 0)]), 0).is_empty());
    }

    #[test]
    fn test_frames_sorted_by_time() {
        let input = frames(1, &[("off", 1500), ("on", 0), ("off", 1000), ("on", 500)]);
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals, vec![TrialLookTotals::new(0.5, 0.5)]);
    }

    #[test]
    fn test_rounding_to_milliseconds() {
        let input = frames(1, &[("on", 0), ("on", 33), ("on", 67)]);
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals, vec![TrialLookTotals::new(0.067, 0.0)]);
    }

    #[test]
    fn test_single_state_duration_matches_span() {
        let input = frames(1, &[("off", 120), ("off", 153), ("off", 187), ("off", 2120)]);
        let totals = DurationAggregator::aggregate(&input, 1);
        assert_eq!(totals[0].on_seconds + totals[0].off_seconds, 2.0);
    }

    #[test]
    fn test_totals_never_exceed_span() {
        let input = frames(
            1,
            &[("on", 0), ("off", 40), ("off", 80), ("on", 120), ("on", 400), ("off", 440)],
        );
        let totals = DurationAggregator::aggregate(&input, 1);
        let span = (440 - 0) as f64 / 1000.0;
        assert!(totals[0].on_seconds + totals[0].off_seconds <= span + 1e-9);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let input = frames(1, &[("on", 0), ("off", 250), ("off", 700), ("on", 800)]);
        let first = DurationAggregator::aggregate(&input, 2);
        let second = DurationAggregator::aggregate(&input, 2);
        assert_eq!(first, second);
    }
}
