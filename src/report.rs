//! Report types and rendering
//!
//! Subject results and the batch summary, rendered as human-readable text or JSON.

use crate::error::ReconcileError;
use crate::types::{round3, ComparisonResult, TrialLookTotals};
use crate::{PRODUCER_NAME, VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Result of reconciling one subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectReport {
    pub subject_id: String,
    pub annotation_file: String,
    /// Annotated frames read from the automated file
    pub frames: usize,
    /// Trials defined by the human trial-definition file
    pub trials: usize,
    pub automated: Vec<TrialLookTotals>,
    pub human: Vec<TrialLookTotals>,
    /// Absent when the correlation is undefined for this subject
    pub comparison: Option<ComparisonResult>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Outcome of one file in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubjectOutcome {
    Succeeded(SubjectReport),
    Failed {
        annotation_file: String,
        subject_id: String,
        code: String,
        error: String,
    },
}

impl SubjectOutcome {
    pub fn failed(annotation_file: String, subject_id: String, error: &ReconcileError) -> Self {
        SubjectOutcome::Failed {
            annotation_file,
            subject_id,
            code: error.code().to_string(),
            error: error.to_string(),
        }
    }

    pub fn subject_id(&self) -> &str {
        match self {
            SubjectOutcome::Succeeded(report) => &report.subject_id,
            SubjectOutcome::Failed { subject_id, .. } => subject_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubjectOutcome::Succeeded(_))
    }
}

/// Summary of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub producer: String,
    pub version: String,
    pub run_id: String,
    pub computed_at_utc: DateTime<Utc>,
    pub subjects: Vec<SubjectOutcome>,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn new(subjects: Vec<SubjectOutcome>) -> Self {
        let (succeeded, failed): (Vec<&SubjectOutcome>, Vec<&SubjectOutcome>) =
            subjects.iter().partition(|s| s.is_success());
        let succeeded = succeeded.iter().map(|s| s.subject_id().to_string()).collect();
        let failed = failed.iter().map(|s| s.subject_id().to_string()).collect();

        Self {
            producer: PRODUCER_NAME.to_string(),
            version: VERSION.to_string(),
            run_id: Uuid::new_v4().to_string(),
            computed_at_utc: Utc::now(),
            subjects,
            succeeded,
            failed,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Output rendering formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    JsonPretty,
}

/// Render a batch report
pub fn render_batch(report: &BatchReport, format: ReportFormat) -> Result<String, ReconcileError> {
    match format {
        ReportFormat::Text => Ok(batch_text(report)),
        ReportFormat::Json => Ok(serde_json::to_string(report)? + "\n"),
        ReportFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
    }
}

/// Render a single subject report
pub fn render_subject(
    report: &SubjectReport,
    format: ReportFormat,
) -> Result<String, ReconcileError> {
    match format {
        ReportFormat::Text => Ok(subject_text(report)),
        ReportFormat::Json => Ok(serde_json::to_string(report)? + "\n"),
        ReportFormat::JsonPretty => Ok(serde_json::to_string_pretty(report)? + "\n"),
    }
}

fn format_pairs(totals: &[TrialLookTotals]) -> String {
    let pairs: Vec<String> = totals
        .iter()
        .map(|t| format!("[{:.3}, {:.3}]", t.on_seconds, t.off_seconds))
        .collect();
    format!("[{}]", pairs.join(", "))
}

/// Human-readable listing for one subject
pub fn subject_text(report: &SubjectReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Subject {}", report.subject_id);
    let _ = writeln!(out, "  Annotation: {}", report.annotation_file);
    let _ = writeln!(out, "  Frames: {}  Trials: {}", report.frames, report.trials);
    let _ = writeln!(out, "  Automated [on, off]: {}", format_pairs(&report.automated));
    let _ = writeln!(out, "  Human     [on, off]: {}", format_pairs(&report.human));
    match &report.comparison {
        Some(c) => {
            let _ = writeln!(
                out,
                "  Pearson r = {:.3}, p = {:.3} (n = {})",
                round3(c.correlation),
                round3(c.p_value),
                c.n
            );
        }
        None => {
            let _ = writeln!(out, "  Pearson r = undefined");
        }
    }
    for warning in &report.warnings {
        let _ = writeln!(out, "  [WARN] {}", warning);
    }
    out
}

fn batch_text(report: &BatchReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Gaze Coding Reconciliation");
    let _ = writeln!(out, "==========================");
    let _ = writeln!(out, "Run:     {}", report.run_id);
    let _ = writeln!(out, "Version: {}", report.version);
    let _ = writeln!(out);

    for outcome in &report.subjects {
        match outcome {
            SubjectOutcome::Succeeded(subject) => out.push_str(&subject_text(subject)),
            SubjectOutcome::Failed {
                annotation_file,
                subject_id,
                code,
                error,
            } => {
                let _ = writeln!(out, "Subject {}", subject_id);
                let _ = writeln!(out, "  Annotation: {}", annotation_file);
                let _ = writeln!(out, "  [ERR] {}: {}", code, error);
            }
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Summary");
    let _ = writeln!(
        out,
        "  Succeeded ({}): {}",
        report.succeeded.len(),
        report.succeeded.join(", ")
    );
    let _ = writeln!(
        out,
        "  Failed    ({}): {}",
        report.failed.len(),
        report.failed.join(", ")
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_report() -> SubjectReport {
        SubjectReport {
            subject_id: "S01".to_string(),
            annotation_file: "S01_annotation.txt".to_string(),
            frames: 120,
            trials: 2,
            automated: vec![TrialLookTotals::new(0.5, 0.5), TrialLookTotals::new(1.0, 0.0)],
            human: vec![TrialLookTotals::new(0.52, 0.48), TrialLookTotals::new(0.9, 0.1)],
            comparison: Some(ComparisonResult {
                correlation: 0.98765,
                p_value: 0.01234,
                n: 4,
            }),
            warnings: vec![],
        }
    }

    #[test]
    fn test_subject_text() {
        let text = subject_text(&sample_report());
        assert!(text.contains("Automated [on, off]: [[0.500, 0.500], [1.000, 0.000]]"));
        assert!(text.contains("Human     [on, off]: [[0.520, 0.480], [0.900, 0.100]]"));
        assert!(text.contains("Pearson r = 0.988, p = 0.012 (n = 4)"));
    }

    #[test]
    fn test_undefined_comparison_text() {
        let mut report = sample_report();
        report.comparison = None;
        report.warnings.push("zero variance".to_string());

        let text = subject_text(&report);
        assert!(text.contains("Pearson r = undefined"));
        assert!(text.contains("[WARN] zero variance"));
    }

    #[test]
    fn test_batch_summary() {
        let error = ReconcileError::MissingPair {
            subject_id: "X1".to_string(),
            kind: "trial-definition",
            dir: "human_input".into(),
        };
        let report = BatchReport::new(vec![
            SubjectOutcome::Succeeded(sample_report()),
            SubjectOutcome::failed("X1_annotation.txt".to_string(), "X1".to_string(), &error),
        ]);

        assert_eq!(report.succeeded, vec!["S01".to_string()]);
        assert_eq!(report.failed, vec!["X1".to_string()]);
        assert!(report.has_failures());

        let text = render_batch(&report, ReportFormat::Text).unwrap();
        assert!(text.contains("[ERR] MISSING_PAIR"));
        assert!(text.contains("Succeeded (1): S01"));
        assert!(text.contains("Failed    (1): X1"));
    }

    #[test]
    fn test_batch_json() {
        let report = BatchReport::new(vec![SubjectOutcome::Succeeded(sample_report())]);
        let json = render_batch(&report, ReportFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["producer"], "gazecheck");
        assert_eq!(value["subjects"][0]["status"], "succeeded");
        assert_eq!(value["subjects"][0]["automated"][0]["on_seconds"], 0.5);
        assert_eq!(value["succeeded"][0], "S01");
        assert_eq!(value["run_id"], report.run_id.as_str());
    }
}
