//! Automated annotation loader
//!
//! Reads the per-frame output of the video annotator: one `frame_index, look_state`
//! record per line, no header. Columns may be separated by a comma or whitespace;
//! anything after the second column (e.g. a confidence score) is ignored.

use crate::error::ReconcileError;
use crate::frame_time::FrameTimes;
use crate::types::{FrameRecord, LookState};
use std::fs;
use std::path::Path;

/// A raw annotation line before timing is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationEntry {
    pub frame_index: usize,
    pub look_state: LookState,
}

pub struct AnnotationLoader;

impl AnnotationLoader {
    /// Load an annotation file and stamp every frame with its presentation time
    pub fn load(path: &Path, times: &FrameTimes) -> Result<Vec<FrameRecord>, ReconcileError> {
        let content = fs::read_to_string(path)?;
        let file = path.display().to_string();
        let entries = Self::parse(&content, &file)?;
        Self::attach_times(&entries, times, &file)
    }

    /// Parse annotation text into entries, in file order
    pub fn parse(content: &str, file: &str) -> Result<Vec<AnnotationEntry>, ReconcileError> {
        let mut entries = Vec::new();

        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let columns: Vec<&str> = if trimmed.contains(',') {
                trimmed.split(',').collect()
            } else {
                trimmed.split_whitespace().collect()
            };

            let (Some(index_col), Some(label_col)) = (columns.first(), columns.get(1)) else {
                return Err(ReconcileError::ParseError(format!(
                    "{} line {}: expected two columns",
                    file,
                    line_num + 1
                )));
            };

            let frame_index = index_col.trim().parse::<usize>().map_err(|e| {
                ReconcileError::ParseError(format!(
                    "{} line {}: invalid frame index {:?}: {}",
                    file,
                    line_num + 1,
                    index_col.trim(),
                    e
                ))
            })?;

            let look_state = LookState::parse(label_col).ok_or_else(|| {
                ReconcileError::UnrecognizedLookState {
                    file: file.to_string(),
                    line: line_num + 1,
                    label: label_col.trim().to_string(),
                }
            })?;

            entries.push(AnnotationEntry {
                frame_index,
                look_state,
            });
        }

        Ok(entries)
    }

    /// Resolve each entry's timestamp by frame number
    pub fn attach_times(
        entries: &[AnnotationEntry],
        times: &FrameTimes,
        file: &str,
    ) -> Result<Vec<FrameRecord>, ReconcileError> {
        entries
            .iter()
            .map(|entry| {
                let time_ms = times.time_of(entry.frame_index).ok_or_else(|| {
                    ReconcileError::MalformedAnnotation {
                        file: file.to_string(),
                        frame_index: entry.frame_index,
                        frame_count: times.frame_count,
                    }
                })?;
                Ok(FrameRecord::new(entry.frame_index, entry.look_state, time_ms))
            })
            .collect()
    }
}
