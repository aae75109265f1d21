//! Row tables from JSON.
//!
//! The table is decoded element by element: a row whose fields have the
//! wrong shape is skipped with a warning and the rest of the table is kept.

use bt_common::{BowtieRow, Error, Result};
use serde_json::Value;
use tracing::warn;

use crate::logging::event_names;

/// Decode a JSON array of bowtie rows, skipping malformed elements.
///
/// Fails only when the text is not JSON or not an array.
pub fn rows_from_json(text: &str) -> Result<Vec<BowtieRow>> {
    let table: Value = serde_json::from_str(text)?;
    let Value::Array(items) = table else {
        return Err(Error::InputData(
            "expected a JSON array of bowtie rows".to_string(),
        ));
    };

    let mut rows = Vec::with_capacity(items.len());
    for (row_idx, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<BowtieRow>(item) {
            Ok(row) => rows.push(row),
            Err(source) => {
                let err = Error::InputData(format!("row {row_idx}: {source}"));
                warn!(
                    target: event_names::STRUCTURE_ROW_SKIPPED,
                    row = row_idx,
                    code = err.code(),
                    error = %err,
                    "malformed row, skipping"
                );
            }
        }
    }
    Ok(rows)
}
