// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

pub(crate) static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "Cardsplit", "cardsplit"));

pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP.0, APP.1, APP.2).context("Could not determine platform-specific dirs")
}

pub fn db_path() -> Result<PathBuf> {
    let proj = project_dirs()?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("workbooks.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS containers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS worksheets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        container_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        position INTEGER NOT NULL,
        frozen_rows INTEGER NOT NULL DEFAULT 0,
        amount_column INTEGER,
        amount_format TEXT,
        UNIQUE(container_id, title),
        FOREIGN KEY(container_id) REFERENCES containers(id) ON DELETE CASCADE
    );

    -- One row per worksheet row; cells are a JSON array with trailing blanks dropped.
    CREATE TABLE IF NOT EXISTS cells(
        worksheet_id INTEGER NOT NULL,
        row_index INTEGER NOT NULL,
        cells TEXT NOT NULL,
        PRIMARY KEY(worksheet_id, row_index),
        FOREIGN KEY(worksheet_id) REFERENCES worksheets(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}
