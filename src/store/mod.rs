// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Tabular storage backends holding one worksheet per statement period.

pub mod sheets;
pub mod sqlite;

use anyhow::Result;
use std::fmt;

/// A workbook and the titles of its worksheets, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub title: String,
    pub worksheets: Vec<String>,
}

impl Container {
    pub fn has_worksheet(&self, title: &str) -> bool {
        self.worksheets.iter().any(|w| w == title)
    }
}

/// Rectangular cell range on one worksheet, 1-based and inclusive.
///
/// `last_row` / `last_col` of `None` leave that side open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub worksheet: String,
    pub first_row: usize,
    pub last_row: Option<usize>,
    pub first_col: usize,
    pub last_col: Option<usize>,
}

impl CellRange {
    /// Every populated cell of the worksheet.
    pub fn worksheet(worksheet: &str) -> Self {
        Self {
            worksheet: worksheet.to_string(),
            first_row: 1,
            last_row: None,
            first_col: 1,
            last_col: None,
        }
    }

    /// The header row.
    pub fn header(worksheet: &str) -> Self {
        Self {
            worksheet: worksheet.to_string(),
            first_row: 1,
            last_row: Some(1),
            first_col: 1,
            last_col: None,
        }
    }

    /// Whole columns `first_col..=last_col`.
    pub fn columns(worksheet: &str, first_col: usize, last_col: usize) -> Self {
        Self {
            worksheet: worksheet.to_string(),
            first_row: 1,
            last_row: None,
            first_col,
            last_col: Some(last_col),
        }
    }

    /// Block of `rows` x `cols` cells whose top-left corner is (`first_row`, 1).
    pub fn block(worksheet: &str, first_row: usize, rows: usize, cols: usize) -> Self {
        Self {
            worksheet: worksheet.to_string(),
            first_row,
            last_row: Some(first_row + rows.saturating_sub(1)),
            first_col: 1,
            last_col: Some(cols.max(1)),
        }
    }

    pub fn contains_row(&self, row: usize) -> bool {
        row >= self.first_row && self.last_row.is_none_or(|last| row <= last)
    }
}

/// A1 column letters for a 1-based column index.
pub fn column_letters(mut col: usize) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

impl fmt::Display for CellRange {
    /// A1 notation, e.g. `'20241126'!1:1`, `'20241126'!A:F` or `'20241126'!A12:H14`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.worksheet.replace('\'', "''"))?;
        match (self.last_row, self.last_col) {
            (None, None) if self.first_row == 1 => Ok(()),
            (None, None) => write!(f, "!{}:{}", self.first_row, i32::MAX),
            (Some(last), None) => write!(f, "!{}:{}", self.first_row, last),
            (None, Some(last_col)) if self.first_row == 1 => {
                write!(f, "!{}:{}", column_letters(self.first_col), column_letters(last_col))
            }
            (None, Some(last_col)) => write!(
                f,
                "!{}{}:{}",
                column_letters(self.first_col),
                self.first_row,
                column_letters(last_col)
            ),
            (Some(last), Some(last_col)) => write!(
                f,
                "!{}{}:{}{}",
                column_letters(self.first_col),
                self.first_row,
                column_letters(last_col),
                last
            ),
        }
    }
}

/// Operations a categorization run needs from a workbook service.
///
/// Calls are synchronous and never retried; a failure is returned to the
/// caller, which decides whether the run can continue.
pub trait TabularStore {
    fn create_container(&self, title: &str) -> Result<Container>;
    fn get_container(&self, id: &str) -> Result<Container>;
    fn create_worksheet(&self, container: &str, title: &str) -> Result<()>;
    fn rename_worksheet(&self, container: &str, old: &str, new: &str) -> Result<()>;
    /// Header row, or empty when the worksheet has none.
    fn get_header(&self, container: &str, worksheet: &str) -> Result<Vec<String>>;
    fn set_header(&self, container: &str, worksheet: &str, columns: &[String]) -> Result<()>;
    /// Rows in `range`; trailing empty cells of a row may be omitted.
    fn get_rows(&self, container: &str, range: &CellRange) -> Result<Vec<Vec<String>>>;
    /// Write `rows` starting at the top-left of `range`; returns the cell count written.
    fn append_rows(
        &self,
        container: &str,
        range: &CellRange,
        rows: &[Vec<String>],
    ) -> Result<usize>;
    /// Fixed-precision amount column (0-based `amount_column`) and frozen header row.
    fn apply_presentation(
        &self,
        container: &str,
        worksheet: &str,
        amount_column: usize,
    ) -> Result<()>;
}
