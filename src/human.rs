//! Human reference loader
//!
//! Reads the behavioral-coding tool's per-trial looking-time export.

use crate::error::ReconcileError;
use crate::tabular::{present, read_rows};
use crate::types::TrialLookTotals;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const LOOKS_ON_COLUMN: &str = "Looks On Total (s)";
pub const LOOKS_OFF_COLUMN: &str = "Looks Off Total (s)";

#[derive(Debug, Deserialize)]
struct LookTotalsRow {
    #[serde(rename = "Looks On Total (s)")]
    on_seconds: Option<f64>,
    #[serde(rename = "Looks Off Total (s)")]
    off_seconds: Option<f64>,
}

/// Load human-coded per-trial totals from `path`
pub fn load_human_totals(path: &Path) -> Result<Vec<TrialLookTotals>, ReconcileError> {
    let content = fs::read_to_string(path)?;
    parse_human_totals(&content, &path.display().to_string())
}

/// Parse per-trial totals in file order, rounded to 3 decimals.
/// Rows missing either total are dropped.
pub fn parse_human_totals(
    content: &str,
    file: &str,
) -> Result<Vec<TrialLookTotals>, ReconcileError> {
    let rows: Vec<LookTotalsRow> = read_rows(content, &[LOOKS_ON_COLUMN, LOOKS_OFF_COLUMN], file)?;

    Ok(rows
        .into_iter()
        .filter_map(|row| match (present(row.on_seconds), present(row.off_seconds)) {
            (Some(on), Some(off)) => Some(TrialLookTotals::new(on, off).rounded()),
            _ => None,
        })
        .collect())
}
