//! Pipeline orchestration
//!
//! This module provides the public API for gazecheck.
//! It runs one subject from raw files to a [`SubjectReport`], and drives a batch
//! over every annotation file in the automated directory.

use crate::aggregate::DurationAggregator;
use crate::annotation::AnnotationLoader;
use crate::compare::compare;
use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::frame_time::FrameTimeResolver;
use crate::human::load_human_totals;
use crate::pairing::{list_file_names, subject_id_from_annotation, SubjectFiles, SubjectIndex};
use crate::report::{BatchReport, SubjectOutcome, SubjectReport};
use crate::trials::{assign_trials, load_trial_intervals};
use std::path::Path;
use tracing::{debug, info, warn};

/// Reconcile one subject whose input files are already paired.
///
/// Pipeline stages:
/// 1. FrameTimeResolver - Per-frame timestamps of the session video
/// 2. AnnotationLoader - Automated per-frame look states, stamped with time
/// 3. Trial assignment - Label frames with the human trial they fall in
/// 4. DurationAggregator - Automated on/off totals per trial
/// 5. Human reference - Human on/off totals per trial
/// 6. Comparison - Pearson correlation between both sources
pub fn reconcile_subject(
    files: &SubjectFiles,
    resolver: &dyn FrameTimeResolver,
) -> Result<SubjectReport, ReconcileError> {
    // Stage 1: Resolve frame timing
    let times = resolver.resolve(&files.video)?;

    // Stage 2: Load automated annotations
    let mut frames = AnnotationLoader::load(&files.annotation, &times)?;

    // Stage 3: Assign frames to trials
    let intervals = load_trial_intervals(&files.trial_definitions)?;
    assign_trials(&mut frames, &intervals);
    debug!(
        subject = %files.subject_id,
        frames = frames.len(),
        trials = intervals.len(),
        untrialed = frames.iter().filter(|f| f.trial == 0).count(),
        "frames assigned to trials"
    );

    // Stage 4: Aggregate automated totals
    let automated = DurationAggregator::aggregate(&frames, intervals.len());

    // Stage 5: Load human totals
    let human = load_human_totals(&files.human_totals)?;

    // Stage 6: Compare
    let mut warnings = Vec::new();
    let comparison = match compare(&automated, &human) {
        Ok(result) => Some(result),
        Err(ReconcileError::DegenerateComparison(reason)) => {
            warn!(subject = %files.subject_id, %reason, "correlation undefined");
            warnings.push(format!("correlation undefined: {}", reason));
            None
        }
        Err(e) => return Err(e),
    };

    Ok(SubjectReport {
        subject_id: files.subject_id.clone(),
        annotation_file: files.annotation.display().to_string(),
        frames: frames.len(),
        trials: intervals.len(),
        automated,
        human,
        comparison,
        warnings,
    })
}

/// Batch driver over the configured directories.
///
/// Each annotation file is processed independently; a failure is recorded in the
/// batch report and the run moves on to the next file.
pub struct ReconcileProcessor {
    config: ReconcileConfig,
    resolver: Box<dyn FrameTimeResolver>,
}

impl ReconcileProcessor {
    pub fn new(config: ReconcileConfig, resolver: Box<dyn FrameTimeResolver>) -> Self {
        Self { config, resolver }
    }

    /// Pair and reconcile a single annotation file
    pub fn run_subject(&self, annotation: &Path) -> Result<SubjectReport, ReconcileError> {
        let index = SubjectIndex::build(&self.config)?;
        let files = index.pair(annotation)?;
        reconcile_subject(&files, self.resolver.as_ref())
    }

    /// Reconcile every annotation file in the automated directory, in name order.
    ///
    /// Fails only when the directories themselves cannot be listed.
    pub fn run_batch(&self) -> Result<BatchReport, ReconcileError> {
        let index = SubjectIndex::build(&self.config)?;
        let annotation_files = list_file_names(&self.config.automated_dir)?;
        info!(
            dir = %self.config.automated_dir.display(),
            files = annotation_files.len(),
            "starting batch"
        );

        let mut outcomes = Vec::with_capacity(annotation_files.len());
        for name in &annotation_files {
            let path = self.config.automated_dir.join(name);
            let subject_id = subject_id_from_annotation(name).to_string();

            let result = index
                .pair(&path)
                .and_then(|files| reconcile_subject(&files, self.resolver.as_ref()));

            match result {
                Ok(report) => {
                    info!(
                        subject = %subject_id,
                        trials = report.trials,
                        correlation = report.comparison.map(|c| c.correlation),
                        "subject reconciled"
                    );
                    outcomes.push(SubjectOutcome::Succeeded(report));
                }
                Err(e) => {
                    warn!(subject = %subject_id, file = %name, error = %e, "subject failed");
                    outcomes.push(SubjectOutcome::failed(
                        path.display().to_string(),
                        subject_id,
                        &e,
                    ));
                }
            }
        }

        let report = BatchReport::new(outcomes);
        info!(
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame_time::StaticFrameTimes;
    use crate::types::TrialLookTotals;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ReconcileConfig) {
        let root = tempfile::tempdir().unwrap();
        let config = ReconcileConfig {
            automated_dir: root.path().join("annotations"),
            human_input_dir: root.path().join("human_input"),
            human_output_dir: root.path().join("human_output"),
            video_dir: root.path().join("videos"),
            ..Default::default()
        };
        for (_, dir) in config.directories() {
            fs::create_dir_all(dir).unwrap();
        }
        (root, config)
    }

    /// Frames every 250 ms: frame i is at i * 250 ms
    fn resolver(frame_count: usize) -> Box<dyn FrameTimeResolver> {
        Box::new(StaticFrameTimes::new(
            (0..frame_count as i64).map(|i| i * 250).collect(),
        ))
    }

    fn write_subject(config: &ReconcileConfig, id: &str, annotation: &str, trials: &str, looks: &str) {
        fs::write(
            config.automated_dir.join(format!("{}_annotation.txt", id)),
            annotation,
        )
        .unwrap();
        fs::write(
            config.human_input_dir.join(format!("{}_trials.csv", id)),
            trials,
        )
        .unwrap();
        fs::write(
            config.human_output_dir.join(format!("{}_looks.csv", id)),
            looks,
        )
        .unwrap();
    }

    // Trial 1: frames 0-4 (0..1000 ms), trial 2: frames 6-10 (1500..2500 ms)
    const TRIALS: &str = "Trials.onset,Trials.offset\n0,1000\n1500,2500\n";
    const ANNOTATION: &str = "\
0, on
1, on
2, off
3, off
4, off
5, on
6, on
7, on
8, on
9, off
10, off
";

    #[test]
    fn test_reconcile_subject() {
        let (_root, config) = setup();
        write_subject(
            &config,
            "S01",
            ANNOTATION,
            TRIALS,
            "Looks On Total (s),Looks Off Total (s)\n0.3,0.6\n0.7,0.2\n",
        );
        let processor = ReconcileProcessor::new(config.clone(), resolver(11));

        let report = processor
            .run_subject(&config.automated_dir.join("S01_annotation.txt"))
            .unwrap();

        assert_eq!(report.subject_id, "S01");
        assert_eq!(report.frames, 11);
        assert_eq!(report.trials, 2);
        assert_eq!(
            report.automated,
            vec![TrialLookTotals::new(0.25, 0.5), TrialLookTotals::new(0.5, 0.25)]
        );
        assert_eq!(
            report.human,
            vec![TrialLookTotals::new(0.3, 0.6), TrialLookTotals::new(0.7, 0.2)]
        );
        let comparison = report.comparison.unwrap();
        assert!(comparison.correlation > 0.9);
        assert_eq!(comparison.n, 4);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_identical_coding_correlates_perfectly() {
        let (_root, config) = setup();
        let trials = "Trials.onset,Trials.offset\n0,1000\n1500,2500\n3000,4000\n";
        let annotation = "\
0, on
1, on
2, off
3, off
4, off
6, on
7, on
8, on
9, on
10, off
12, off
13, on
14, on
15, on
16, on
";
        write_subject(
            &config,
            "S02",
            annotation,
            trials,
            "Looks On Total (s),Looks Off Total (s)\n0.25,0.5\n0.75,0.0\n0.75,0.0\n",
        );
        let processor = ReconcileProcessor::new(config.clone(), resolver(17));

        let report = processor
            .run_subject(&config.automated_dir.join("S02_annotation.txt"))
            .unwrap();

        assert_eq!(report.automated, report.human);
        let comparison = report.comparison.unwrap();
        assert!((comparison.correlation - 1.0).abs() < 1e-9);
        assert!(comparison.p_value < 1e-6);
    }

    #[test]
    fn test_degenerate_comparison_is_warning() {
        let (_root, config) = setup();
        write_subject(
            &config,
            "S03",
            "0, on\n",
            "Trials.onset,Trials.offset\n0,250\n",
            "Looks On Total (s),Looks Off Total (s)\n0.25,0.0\n",
        );
        let processor = ReconcileProcessor::new(config.clone(), resolver(1));

        let report = processor
            .run_subject(&config.automated_dir.join("S03_annotation.txt"))
            .unwrap();

        assert!(report.comparison.is_none());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_trial_count_mismatch_fails_subject() {
        let (_root, config) = setup();
        write_subject(
            &config,
            "S04",
            ANNOTATION,
            TRIALS,
            "Looks On Total (s),Looks Off Total (s)\n0.3,0.6\n",
        );
        let processor = ReconcileProcessor::new(config.clone(), resolver(11));

        let result = processor.run_subject(&config.automated_dir.join("S04_annotation.txt"));
        assert!(matches!(
            result,
            Err(ReconcileError::TrialCountMismatch {
                automated: 2,
                human: 1
            })
        ));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let (_root, config) = setup();
        write_subject(
            &config,
            "S01",
            ANNOTATION,
            TRIALS,
            "Looks On Total (s),Looks Off Total (s)\n0.3,0.6\n0.7,0.2\n",
        );
        // No human files for X1
        fs::write(config.automated_dir.join("X1_annotation.txt"), "0, on\n").unwrap();
        // Frame 99 is beyond the 11-frame video
        write_subject(
            &config,
            "S05",
            "0, on\n99, off\n",
            TRIALS,
            "Looks On Total (s),Looks Off Total (s)\n0.3,0.6\n0.7,0.2\n",
        );
        fs::write(config.automated_dir.join(".DS_Store"), "").unwrap();

        let processor = ReconcileProcessor::new(config, resolver(11));
        let report = processor.run_batch().unwrap();

        assert_eq!(report.subjects.len(), 3);
        assert_eq!(report.succeeded, vec!["S01".to_string()]);
        assert_eq!(report.failed, vec!["S05".to_string(), "X1".to_string()]);

        let codes: Vec<&str> = report
            .subjects
            .iter()
            .filter_map(|s| match s {
                SubjectOutcome::Failed { code, .. } => Some(code.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(codes, vec!["MALFORMED_ANNOTATION", "MISSING_PAIR"]);
    }

    #[test]
    fn test_batch_missing_directory() {
        let (_root, mut config) = setup();
        config.human_input_dir = config.human_input_dir.join("missing");
        let processor = ReconcileProcessor::new(config, resolver(1));

        assert!(matches!(processor.run_batch(), Err(ReconcileError::Io(_))));
    }
}
