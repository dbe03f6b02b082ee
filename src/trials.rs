//! Trial boundaries and frame-to-trial assignment

use crate::error::ReconcileError;
use crate::tabular::{present, read_rows};
use crate::types::{FrameRecord, TrialInterval};
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const ONSET_COLUMN: &str = "Trials.onset";
pub const OFFSET_COLUMN: &str = "Trials.offset";

#[derive(Debug, Deserialize)]
struct TrialRow {
    #[serde(rename = "Trials.onset")]
    onset: Option<f64>,
    #[serde(rename = "Trials.offset")]
    offset: Option<f64>,
}

/// Load trial boundaries from a human trial-definition export
pub fn load_trial_intervals(path: &Path) -> Result<Vec<TrialInterval>, ReconcileError> {
    let content = fs::read_to_string(path)?;
    parse_trial_intervals(&content, &path.display().to_string())
}

/// Parse trial boundaries, in file order. Rows missing either bound are dropped.
pub fn parse_trial_intervals(
    content: &str,
    file: &str,
) -> Result<Vec<TrialInterval>, ReconcileError> {
    let rows: Vec<TrialRow> = read_rows(content, &[ONSET_COLUMN, OFFSET_COLUMN], file)?;

    let mut intervals = Vec::new();
    for row in rows {
        let (Some(onset), Some(offset)) = (present(row.onset), present(row.offset)) else {
            continue;
        };
        let interval = TrialInterval::new(onset.round() as i64, offset.round() as i64);
        if interval.onset_ms > interval.offset_ms {
            return Err(ReconcileError::ParseError(format!(
                "{}: trial {} ends before it starts ({} > {})",
                file,
                intervals.len() + 1,
                interval.onset_ms,
                interval.offset_ms
            )));
        }
        intervals.push(interval);
    }
    Ok(intervals)
}

/// 1-based index of the first interval containing `time_ms`, or 0 when none does.
///
/// Intervals are scanned in order so overlapping boundaries resolve to the earlier
/// trial. O(trials) per lookup; fine for the tens of trials in a session.
pub fn trial_for(time_ms: i64, intervals: &[TrialInterval]) -> usize {
    intervals
        .iter()
        .position(|interval| interval.contains(time_ms))
        .map_or(0, |i| i + 1)
}

/// Label every frame with its trial
pub fn assign_trials(frames: &mut [FrameRecord], intervals: &[TrialInterval]) {
    for frame in frames.iter_mut() {
        frame.trial = trial_for(frame.time_ms, intervals);
    }
}
