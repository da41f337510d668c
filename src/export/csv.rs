//! CSV export of query results
//!
//! The header is the column sequence of the first row; rows are assumed to
//! share its shape. Fields are quoted only when they contain a separator, a
//! quote, or a line break.

use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::model::Row;

/// Escape a field for CSV output (handles commas, quotes, newlines)
pub fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render rows as a CSV document.
///
/// Returns `None` for an empty row set: there is nothing to export.
pub fn to_csv(rows: &[Row]) -> Option<String> {
    let first = rows.first()?;
    let header: Vec<&str> = first.columns().collect();

    let mut output = header
        .iter()
        .map(|c| csv_escape(c))
        .collect::<Vec<_>>()
        .join(",");
    output.push('\n');

    for row in rows {
        let fields: Vec<String> = header
            .iter()
            .map(|col| {
                row.get(col)
                    .map(|v| csv_escape(&v.to_field()))
                    .unwrap_or_default()
            })
            .collect();
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    Some(output)
}

/// Write rows as CSV to `path`.
///
/// Returns `false` without touching the file system when there are no rows.
pub fn export_csv_to_file(rows: &[Row], path: impl AsRef<Path>) -> Result<bool> {
    let Some(document) = to_csv(rows) else {
        return Ok(false);
    };

    let path = path.as_ref();
    std::fs::write(path, document)?;
    info!(path = %path.display(), rows = rows.len(), "Exported query result");
    Ok(true)
}
