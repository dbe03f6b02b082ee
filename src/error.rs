//! Error types for gazecheck

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reconciling one subject
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("No {kind} file found for subject {subject_id} in {dir}")]
    MissingPair {
        subject_id: String,
        kind: &'static str,
        dir: PathBuf,
    },

    #[error("Subject {subject_id} matches several {kind} files: {}", .candidates.join(", "))]
    AmbiguousPair {
        subject_id: String,
        kind: &'static str,
        candidates: Vec<String>,
    },

    #[error("Frame {frame_index} in {file} has no timestamp (video has {frame_count} frames)")]
    MalformedAnnotation {
        file: String,
        frame_index: usize,
        frame_count: usize,
    },

    #[error("Unrecognized look state {label:?} in {file} at line {line}")]
    UnrecognizedLookState {
        file: String,
        line: usize,
        label: String,
    },

    #[error("Correlation undefined: {0}")]
    DegenerateComparison(String),

    #[error("Trial count mismatch: automated coding has {automated} trials, human coding has {human}")]
    TrialCountMismatch { automated: usize, human: usize },

    #[error("Failed to parse {0}")]
    ParseError(String),

    #[error("Frame timing unavailable: {0}")]
    FrameTime(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tabular data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ReconcileError {
    /// Stable machine-readable code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            ReconcileError::MissingPair { .. } => "MISSING_PAIR",
            ReconcileError::AmbiguousPair { .. } => "AMBIGUOUS_PAIR",
            ReconcileError::MalformedAnnotation { .. } => "MALFORMED_ANNOTATION",
            ReconcileError::UnrecognizedLookState { .. } => "UNRECOGNIZED_LOOK_STATE",
            ReconcileError::DegenerateComparison(_) => "DEGENERATE_COMPARISON",
            ReconcileError::TrialCountMismatch { .. } => "TRIAL_COUNT_MISMATCH",
            ReconcileError::ParseError(_) => "PARSE_ERROR",
            ReconcileError::FrameTime(_) => "FRAME_TIME_ERROR",
            ReconcileError::Logging(_) => "LOGGING_ERROR",
            ReconcileError::Io(_) => "IO_ERROR",
            ReconcileError::Csv(_) => "CSV_ERROR",
            ReconcileError::JsonError(_) => "JSON_ERROR",
        }
    }
}
