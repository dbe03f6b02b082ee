//! Shared CSV plumbing for the human-coding exports

use crate::error::ReconcileError;
use serde::de::DeserializeOwned;

/// Deserialize every row of `content`, after checking that the named columns exist.
///
/// Extra columns are ignored. Cell whitespace is trimmed and rows may be ragged.
pub(crate) fn read_rows<T: DeserializeOwned>(
    content: &str,
    required: &[&str],
    file: &str,
) -> Result<Vec<T>, ReconcileError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(ReconcileError::ParseError(format!(
                "{}: missing column {:?}",
                file, column
            )));
        }
    }

    let mut rows = Vec::new();
    for (row_num, record) in reader.deserialize::<T>().enumerate() {
        let row = record.map_err(|e| {
            ReconcileError::ParseError(format!("{} row {}: {}", file, row_num + 1, e))
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// A cell value counts as present when it parsed and is a finite number
pub(crate) fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
