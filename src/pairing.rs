//! Subject pairing
//!
//! Maps an automated annotation file to the two human-coding files recorded for the
//! same subject. Each human file is keyed by its subject token, the part of its stem
//! before the first `_`, so `S1` pairs with `S1_trials.csv` and never `S10_trials.csv`.
//! Files whose names do not follow that layout are still found by substring on the
//! subject id, but only when no file carries the exact token.

use crate::config::{PairingMode, ReconcileConfig};
use crate::error::ReconcileError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TRIAL_DEFINITIONS: &str = "trial-definition";
const HUMAN_TOTALS: &str = "human looking-time";

/// Subject id embedded in an annotation filename: everything before the first `_`.
pub fn subject_id_from_annotation(file_name: &str) -> &str {
    file_name.split('_').next().unwrap_or(file_name)
}

/// Subject token of a human-coding file: its stem up to the first `_`
fn subject_token(file_name: &str) -> &str {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);
    subject_id_from_annotation(stem)
}

/// Every input needed to reconcile one subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectFiles {
    pub subject_id: String,
    pub annotation: PathBuf,
    pub trial_definitions: PathBuf,
    pub human_totals: PathBuf,
    pub video: PathBuf,
}

/// One human-coding directory, listed and keyed by subject token
#[derive(Debug, Clone)]
struct HumanDirectory {
    kind: &'static str,
    dir: PathBuf,
    names: Vec<String>,
    by_subject: BTreeMap<String, Vec<String>>,
}

impl HumanDirectory {
    fn scan(kind: &'static str, dir: &Path) -> Result<Self, ReconcileError> {
        let names = list_file_names(dir)?;
        let mut by_subject: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for name in &names {
            by_subject
                .entry(subject_token(name).to_string())
                .or_default()
                .push(name.clone());
        }
        Ok(Self {
            kind,
            dir: dir.to_path_buf(),
            names,
            by_subject,
        })
    }

    fn find(&self, subject_id: &str, mode: PairingMode) -> Result<PathBuf, ReconcileError> {
        let candidates: Vec<&String> = match self.by_subject.get(subject_id) {
            Some(exact) => exact.iter().collect(),
            None => self
                .names
                .iter()
                .filter(|name| name.contains(subject_id))
                .collect(),
        };

        match (candidates.as_slice(), mode) {
            ([], _) => Err(ReconcileError::MissingPair {
                subject_id: subject_id.to_string(),
                kind: self.kind,
                dir: self.dir.clone(),
            }),
            ([only], _) | ([only, ..], PairingMode::Permissive) => Ok(self.dir.join(only)),
            (many, PairingMode::Strict) => Err(ReconcileError::AmbiguousPair {
                subject_id: subject_id.to_string(),
                kind: self.kind,
                candidates: many.iter().map(|name| name.to_string()).collect(),
            }),
        }
    }
}

/// Subject-keyed index of both human-coding directories, built once per batch
#[derive(Debug, Clone)]
pub struct SubjectIndex {
    config: ReconcileConfig,
    trial_definitions: HumanDirectory,
    human_totals: HumanDirectory,
}

impl SubjectIndex {
    /// List and key the human-coding directories named in `config`
    pub fn build(config: &ReconcileConfig) -> Result<Self, ReconcileError> {
        let trial_definitions = HumanDirectory::scan(TRIAL_DEFINITIONS, &config.human_input_dir)?;
        let human_totals = HumanDirectory::scan(HUMAN_TOTALS, &config.human_output_dir)?;
        debug!(
            human_inputs = trial_definitions.names.len(),
            human_outputs = human_totals.names.len(),
            subjects = trial_definitions.by_subject.len(),
            "subject index built"
        );

        Ok(Self {
            config: config.clone(),
            trial_definitions,
            human_totals,
        })
    }

    /// Resolve all files for the subject behind `annotation`
    pub fn pair(&self, annotation: &Path) -> Result<SubjectFiles, ReconcileError> {
        let file_name = annotation
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ReconcileError::ParseError(format!(
                    "annotation path has no file name: {}",
                    annotation.display()
                ))
            })?;
        let subject_id = subject_id_from_annotation(&file_name).to_string();
        if subject_id.is_empty() {
            return Err(ReconcileError::ParseError(format!(
                "{}: no subject id before the first '_'",
                file_name
            )));
        }

        let mode = self.config.pairing;
        Ok(SubjectFiles {
            trial_definitions: self.trial_definitions.find(&subject_id, mode)?,
            human_totals: self.human_totals.find(&subject_id, mode)?,
            video: self.config.video_path(&subject_id),
            annotation: annotation.to_path_buf(),
            subject_id,
        })
    }
}

/// Sorted names of the visible regular files in `dir`
pub fn list_file_names(dir: &Path) -> Result<Vec<String>, ReconcileError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}
