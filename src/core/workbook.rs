//! Workbook access: a plain string table on the read side, atomic saves on the
//! write side.

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use rust_xlsxwriter::{Workbook, XlsxError};

use crate::error::{ExperimentError, Result};

/// First worksheet of a workbook, header row split off, every cell rendered
/// as trimmed text. Fully blank rows are dropped.
#[derive(Debug, Clone)]
pub struct Table {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// 1-based spreadsheet row of each entry in `rows`.
    sheet_rows: Vec<u32>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Self> {
        let mut workbook = open_workbook_auto(path).map_err(|source| ExperimentError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

        let range = match workbook.worksheet_range_at(0) {
            Some(Ok(range)) => range,
            Some(Err(source)) => {
                return Err(ExperimentError::Workbook {
                    path: path.to_path_buf(),
                    source,
                })
            }
            None => {
                return Err(ExperimentError::MalformedStimuli {
                    path: path.to_path_buf(),
                    message: "workbook has no worksheets".to_owned(),
                })
            }
        };

        // The range starts at the first used cell, not necessarily at A1.
        let first_row = range.start().map_or(0, |(row, _)| row);
        let mut lines = range
            .rows()
            .enumerate()
            .map(|(i, cells)| (first_row + i as u32 + 1, cells.iter().map(cell_text).collect::<Vec<_>>()))
            .filter(|(_, cells)| cells.iter().any(|c| !c.is_empty()));

        let (_, headers) = lines.next().ok_or_else(|| ExperimentError::MalformedStimuli {
            path: path.to_path_buf(),
            message: "worksheet is empty".to_owned(),
        })?;

        Ok(Self::numbered(path, headers, lines.collect()))
    }

    /// In-memory table laid out as a sheet with the header on row 1.
    pub fn from_cells(path: impl Into<PathBuf>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let numbered = rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| (i as u32 + 2, cells))
            .collect();
        Self::numbered(path, headers, numbered)
    }

    fn numbered(path: impl Into<PathBuf>, headers: Vec<String>, rows: Vec<(u32, Vec<String>)>) -> Self {
        let (sheet_rows, rows) = rows
            .into_iter()
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .unzip();
        Self {
            path: path.into(),
            headers: headers.into_iter().map(|h| h.trim().to_owned()).collect(),
            rows,
            sheet_rows,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ExperimentError::MissingColumn {
                path: self.path.clone(),
                column: name.to_owned(),
            })
    }

    /// Spreadsheet row number of data row `row`, for messages.
    pub fn sheet_row(&self, row: usize) -> u32 {
        self.sheet_rows.get(row).copied().unwrap_or(row as u32 + 2)
    }

    /// Non-empty cell at (`row`, `col`). `column` only names the cell in errors.
    pub fn required(&self, row: usize, col: usize, column: &str) -> Result<&str> {
        let value = self
            .rows
            .get(row)
            .and_then(|cells| cells.get(col))
            .map(|s| s.trim())
            .unwrap_or("");
        if value.is_empty() {
            return Err(ExperimentError::MalformedStimuli {
                path: self.path.clone(),
                message: format!("empty `{column}` cell on row {}", self.sheet_row(row)),
            });
        }
        Ok(value)
    }

    /// Every value of a column, all required to be non-empty.
    pub fn column(&self, name: &str) -> Result<Vec<String>> {
        let col = self.column_index(name)?;
        (0..self.rows.len())
            .map(|row| self.required(row, col, name).map(str::to_owned))
            .collect()
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_owned(),
    }
}

/// Save to `<path>.tmp` first and rename into place, so a failed save never
/// leaves a truncated file under the final name.
pub(crate) fn save_atomically(workbook: &mut Workbook, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| ExperimentError::io(parent, e))?;
        }
    }

    let tmp = path.with_extension("xlsx.tmp");
    if let Err(source) = workbook.save(&tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(persist_error(path, source));
    }
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(ExperimentError::io(path, e));
    }
    Ok(())
}

pub(crate) fn persist_error(path: &Path, source: XlsxError) -> ExperimentError {
    ExperimentError::Persist {
        path: path.to_path_buf(),
        source,
    }
}
