//! Workbook reading via `calamine` (xlsx, xls, xlsb, ods).

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use crate::error::IngestError;
use crate::group::{forward_fill, SheetRow};
use crate::headers::{dedupe_headers, resolve_columns, ColumnMap, HeaderAliases};

/// One data row as text cells, blank cells as `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// One-based spreadsheet row number.
    pub row_number: usize,
    pub cells: Vec<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    pub sheet: String,
    /// Deduplicated headers (`X`, `X.1`, `Unnamed: N`).
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

/// Read one sheet with its header on spreadsheet row `header_row` (1-based).
///
/// When `sheet` is `None` the first sheet is used. Rows above the header are
/// ignored; fully blank rows below it are skipped.
///
/// # Errors
///
/// Returns [`IngestError::WorkbookOpen`] if the file cannot be opened,
/// [`IngestError::SheetNotFound`] / [`IngestError::NoSheets`] if the sheet is
/// missing, and [`IngestError::HeaderRowOutOfRange`] if the header row lies
/// outside the sheet's used range.
pub fn read_sheet(
    path: &Path,
    sheet: Option<&str>,
    header_row: u32,
) -> Result<SheetTable, IngestError> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IngestError::WorkbookOpen {
        path: path.display().to_string(),
        source: e,
    })?;

    let sheet_name = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(IngestError::SheetNotFound {
                    path: path.display().to_string(),
                    sheet: name.to_string(),
                });
            }
            name.to_string()
        }
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| IngestError::NoSheets {
                path: path.display().to_string(),
            })?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IngestError::SheetRead {
            sheet: sheet_name.clone(),
            source: e,
        })?;

    let (first_row, _) = range.start().unwrap_or((0, 0));
    let (last_row, _) = range.end().unwrap_or((0, 0));
    let header_idx = header_row.saturating_sub(1);
    if header_row == 0 || header_idx < first_row || header_idx > last_row || range.is_empty() {
        return Err(IngestError::HeaderRowOutOfRange {
            sheet: sheet_name,
            header_row,
            first_row: first_row + 1,
            last_row: last_row + 1,
        });
    }
    let skip = (header_idx - first_row) as usize;

    let mut rows = range.rows().enumerate().skip(skip);
    let raw_headers: Vec<String> = rows
        .next()
        .map(|(_, cells)| cells.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default();
    let headers = dedupe_headers(&raw_headers);

    let rows: Vec<RawRow> = rows
        .filter_map(|(offset, cells)| {
            let cells: Vec<Option<String>> = cells.iter().map(cell_text).collect();
            if cells.iter().all(Option::is_none) {
                return None;
            }
            Some(RawRow {
                row_number: first_row as usize + offset + 1,
                cells,
            })
        })
        .collect();

    tracing::info!(
        sheet = %sheet_name,
        header_row,
        columns = headers.len(),
        rows = rows.len(),
        "read worksheet"
    );

    Ok(SheetTable {
        sheet: sheet_name,
        headers,
        rows,
    })
}

/// Text form of a cell. Integral floats render without a fraction so that
/// references and counts read the way they display in the workbook.
#[must_use]
pub fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty | Data::Error(_) => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                #[allow(clippy::cast_possible_truncation)]
                let whole = *f as i64;
                whole.to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Read a sheet, map its headers and return forward-filled rows.
///
/// # Errors
///
/// Propagates any error from [`read_sheet`].
pub fn load_rows(
    path: &Path,
    sheet: Option<&str>,
    header_row: u32,
    aliases: &HeaderAliases,
    preferred: &[&str],
) -> Result<(ColumnMap, Vec<SheetRow>), IngestError> {
    let table = read_sheet(path, sheet, header_row)?;
    let columns = resolve_columns(&table.headers, aliases, preferred);
    let mut rows: Vec<SheetRow> = table
        .rows
        .iter()
        .map(|r| SheetRow::from_cells(r.row_number, &r.cells, &columns))
        .collect();
    forward_fill(&mut rows);
    Ok((columns, rows))
}
