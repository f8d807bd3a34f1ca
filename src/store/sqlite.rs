// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Local workbook store backed by the SQLite file in the platform data dir.

use super::{CellRange, Container, TabularStore};
use crate::db;
use anyhow::{Context, Result, anyhow};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};

/// Number format applied to the amount column by [`TabularStore::apply_presentation`].
pub const AMOUNT_FORMAT: &str = "0.00";

pub struct LocalStore {
    conn: Connection,
}

fn container_key(id: &str) -> Result<i64> {
    id.trim()
        .parse::<i64>()
        .with_context(|| format!("Invalid local workbook id '{}'", id))
}

fn trim_trailing_blanks(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

impl LocalStore {
    /// Open the workbook database at its default location.
    pub fn open_default() -> Result<Self> {
        Ok(Self {
            conn: db::open_or_init()?,
        })
    }

    /// Use an already opened connection; the schema is created if missing.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        db::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn worksheet_id(&self, container: &str, title: &str) -> Result<i64> {
        let cid = container_key(container)?;
        self.conn
            .query_row(
                "SELECT id FROM worksheets WHERE container_id=?1 AND title=?2",
                params![cid, title],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Worksheet '{}' not found in workbook {}", title, container))
    }

    fn put_row(&self, worksheet_id: i64, row_index: usize, cells: &[String]) -> Result<()> {
        let cells = trim_trailing_blanks(cells.to_vec());
        self.conn.execute(
            "INSERT INTO cells(worksheet_id, row_index, cells) VALUES (?1,?2,?3)
             ON CONFLICT(worksheet_id, row_index) DO UPDATE SET cells=excluded.cells",
            params![worksheet_id, row_index as i64, serde_json::to_string(&cells)?],
        )?;
        Ok(())
    }
}

impl TabularStore for LocalStore {
    fn create_container(&self, title: &str) -> Result<Container> {
        self.conn
            .execute("INSERT INTO containers(title) VALUES (?1)", params![title])?;
        let id = self.conn.last_insert_rowid();
        self.conn.execute(
            "INSERT INTO worksheets(container_id, title, position) VALUES (?1, 'Sheet1', 0)",
            params![id],
        )?;
        debug!("created local workbook {} '{}'", id, title);
        Ok(Container {
            id: id.to_string(),
            title: title.to_string(),
            worksheets: vec!["Sheet1".to_string()],
        })
    }

    fn get_container(&self, id: &str) -> Result<Container> {
        let cid = container_key(id)?;
        let title: String = self
            .conn
            .query_row(
                "SELECT title FROM containers WHERE id=?1",
                params![cid],
                |r| r.get(0),
            )
            .optional()?
            .ok_or_else(|| anyhow!("Workbook {} not found", id))?;
        let mut stmt = self
            .conn
            .prepare("SELECT title FROM worksheets WHERE container_id=?1 ORDER BY position, id")?;
        let worksheets = stmt
            .query_map(params![cid], |r| r.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Container {
            id: cid.to_string(),
            title,
            worksheets,
        })
    }

    fn create_worksheet(&self, container: &str, title: &str) -> Result<()> {
        let cid = container_key(container)?;
        // New worksheets go first, ahead of older statements.
        self.conn.execute(
            "UPDATE worksheets SET position = position + 1 WHERE container_id=?1",
            params![cid],
        )?;
        self.conn
            .execute(
                "INSERT INTO worksheets(container_id, title, position) VALUES (?1, ?2, 0)",
                params![cid, title],
            )
            .with_context(|| format!("Create worksheet '{}'", title))?;
        Ok(())
    }

    fn rename_worksheet(&self, container: &str, old: &str, new: &str) -> Result<()> {
        let ws = self.worksheet_id(container, old)?;
        self.conn
            .execute("UPDATE worksheets SET title=?1 WHERE id=?2", params![new, ws])
            .with_context(|| format!("Rename worksheet '{}' to '{}'", old, new))?;
        Ok(())
    }

    fn get_header(&self, container: &str, worksheet: &str) -> Result<Vec<String>> {
        let rows = self.get_rows(container, &CellRange::header(worksheet))?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    fn set_header(&self, container: &str, worksheet: &str, columns: &[String]) -> Result<()> {
        let ws = self.worksheet_id(container, worksheet)?;
        self.put_row(ws, 1, columns)
    }

    fn get_rows(&self, container: &str, range: &CellRange) -> Result<Vec<Vec<String>>> {
        let ws = self.worksheet_id(container, &range.worksheet)?;
        let mut stmt = self.conn.prepare(
            "SELECT row_index, cells FROM cells
             WHERE worksheet_id=?1 AND row_index>=?2 ORDER BY row_index",
        )?;
        let stored = stmt
            .query_map(params![ws, range.first_row as i64], |r| {
                Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut out: Vec<Vec<String>> = Vec::new();
        for (row_index, raw) in stored {
            let row_index = row_index as usize;
            if !range.contains_row(row_index) {
                break;
            }
            let cells: Vec<String> = serde_json::from_str(&raw)
                .with_context(|| format!("Corrupt row {} in '{}'", row_index, range.worksheet))?;
            let start = range.first_col.saturating_sub(1).min(cells.len());
            let end = range.last_col.unwrap_or(cells.len()).min(cells.len()).max(start);
            // Blank rows between stored ones come back empty, as a sheet would return them.
            while range.first_row + out.len() < row_index {
                out.push(Vec::new());
            }
            out.push(trim_trailing_blanks(cells[start..end].to_vec()));
        }
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    fn append_rows(
        &self,
        container: &str,
        range: &CellRange,
        rows: &[Vec<String>],
    ) -> Result<usize> {
        let ws = self.worksheet_id(container, &range.worksheet)?;
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        for (i, row) in rows.iter().enumerate() {
            self.put_row(ws, range.first_row + i, row)?;
            written += row.len();
        }
        tx.commit()?;
        Ok(written)
    }

    fn apply_presentation(
        &self,
        container: &str,
        worksheet: &str,
        amount_column: usize,
    ) -> Result<()> {
        let ws = self.worksheet_id(container, worksheet)?;
        self.conn.execute(
            "UPDATE worksheets SET frozen_rows=1, amount_column=?1, amount_format=?2 WHERE id=?3",
            params![amount_column as i64, AMOUNT_FORMAT, ws],
        )?;
        Ok(())
    }
}
