//! Core types for the gazecheck pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: per-frame records, trial intervals, per-trial look totals, and the
//! comparison and report types produced at the end.

use serde::{Deserialize, Serialize};

/// Per-frame gaze classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookState {
    On,
    Off,
}

impl LookState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookState::On => "on",
            LookState::Off => "off",
        }
    }

    /// Normalize a raw label. Surrounding whitespace and ASCII case are ignored;
    /// anything other than `on`/`off` is rejected.
    pub fn parse(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        if trimmed.eq_ignore_ascii_case("on") {
            Some(LookState::On)
        } else if trimmed.eq_ignore_ascii_case("off") {
            Some(LookState::Off)
        } else {
            None
        }
    }
}

/// One annotated video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub look_state: LookState,
    /// Presentation time of the frame (milliseconds)
    pub time_ms: i64,
    /// 1-based trial identifier, 0 when the frame falls outside every trial
    pub trial: usize,
}

impl FrameRecord {
    pub fn new(frame_index: usize, look_state: LookState, time_ms: i64) -> Self {
        Self {
            frame_index,
            look_state,
            time_ms,
            trial: 0,
        }
    }
}

/// Human-authored trial boundary, inclusive on both ends (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialInterval {
    pub onset_ms: i64,
    pub offset_ms: i64,
}

impl TrialInterval {
    pub fn new(onset_ms: i64, offset_ms: i64) -> Self {
        Self { onset_ms, offset_ms }
    }

    pub fn contains(&self, time_ms: i64) -> bool {
        self.onset_ms <= time_ms && time_ms <= self.offset_ms
    }
}

/// Total looking / not-looking time for one trial (seconds)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrialLookTotals {
    pub on_seconds: f64,
    pub off_seconds: f64,
}

impl TrialLookTotals {
    pub fn new(on_seconds: f64, off_seconds: f64) -> Self {
        Self {
            on_seconds,
            off_seconds,
        }
    }

    pub fn as_pair(&self) -> [f64; 2] {
        [self.on_seconds, self.off_seconds]
    }

    /// Both totals rounded to millisecond precision
    pub fn rounded(&self) -> Self {
        Self::new(round3(self.on_seconds), round3(self.off_seconds))
    }
}

/// Correlation between automated and human per-trial totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// Pearson correlation coefficient
    pub correlation: f64,
    /// Two-sided p-value for the null hypothesis of zero correlation
    pub p_value: f64,
    /// Number of paired values (2 per trial)
    pub n: usize,
}

/// Round to 3 decimal places
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_look_state_parse() {
        assert_eq!(LookState::parse("on"), Some(LookState::On));
        assert_eq!(LookState::parse("  off\t"), Some(LookState::Off));
        assert_eq!(LookState::parse("ON"), Some(LookState::On));
        assert_eq!(LookState::parse("away"), None);
        assert_eq!(LookState::parse(""), None);
    }

    #[test]
    fn test_interval_inclusive_bounds() {
        let interval = TrialInterval::new(100, 200);
        assert!(interval.contains(100));
        assert!(interval.contains(200));
        assert!(!interval.contains(99));
        assert!(!interval.contains(201));
    }

    #[test]
    fn test_round3_is_idempotent() {
        let once = round3(1.23456);
        assert_eq!(once, 1.235);
        assert_eq!(round3(once), once);
        assert_eq!(round3(0.0), 0.0);
    }
}
