// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{Overrides, Settings, StoreKind};
use crate::context::open_store;
use crate::error::SplitError;
use crate::ledger::pad_row;
use crate::models::TRANSACTION_COLUMNS;
use crate::store::{CellRange, TabularStore};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Header and data rows of one period's worksheet, all padded to one width.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorksheetView {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub fitid: String,
    pub posted: String,
    pub kind: String,
    pub amount: String,
    pub name: String,
    pub memo: String,
    /// Non-empty category cells keyed by category.
    pub allocations: BTreeMap<String, String>,
}

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let Some((_, sub)) = m.subcommand() else {
        return Ok(());
    };
    let settings = Settings::load(Overrides::from_matches(sub))?;
    let credential_dir = match settings.store_kind()? {
        StoreKind::Sheets => Some(settings.credential_dir()?),
        StoreKind::Local => None,
    };
    let store = open_store(settings.store_kind()?, credential_dir.as_deref())?;
    handle_with(store.as_ref(), m)
}

/// Dispatch `ledger` subcommands against an already opened store.
pub fn handle_with(store: &dyn TabularStore, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let view = open_worksheet(store, sub)?;
            let entries = entries(&view);
            if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &entries)? {
                return Ok(());
            }
            let header: Vec<&str> = view.header.iter().map(String::as_str).collect();
            println!("{}", pretty_table(&header, view.rows));
            Ok(())
        }
        Some(("export", sub)) => {
            let view = open_worksheet(store, sub)?;
            let fmt = sub
                .get_one::<String>("format")
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| "csv".into());
            let out = sub
                .get_one::<String>("out")
                .ok_or_else(|| SplitError::Config("Output file unknown!".into()))?;
            export(&view, &fmt, out)?;
            println!("Exported {} rows to {}", view.rows.len(), out);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn open_worksheet(store: &dyn TabularStore, m: &clap::ArgMatches) -> Result<WorksheetView> {
    let settings = Settings::load(Overrides::from_matches(m))?;
    let period = settings.period()?;
    let document_id = settings
        .document_id()
        .ok_or_else(|| SplitError::Config("Document ID unknown!".into()))?;
    read_worksheet(store, &document_id, period.as_str())
}

/// Read a period's worksheet in full.
pub fn read_worksheet(
    store: &dyn TabularStore,
    container: &str,
    worksheet: &str,
) -> Result<WorksheetView> {
    let mut rows = store.get_rows(container, &CellRange::worksheet(worksheet))?.into_iter();
    let mut header = rows.next().unwrap_or_default();
    let rows: Vec<Vec<String>> = rows.collect();
    let width = rows
        .iter()
        .map(Vec::len)
        .chain([header.len(), TRANSACTION_COLUMNS.len()])
        .max()
        .unwrap_or_default();
    header.resize(width, String::new());
    let rows = rows
        .into_iter()
        .map(|mut r| {
            r.resize(width, String::new());
            r
        })
        .collect();
    Ok(WorksheetView { header, rows })
}

pub fn entries(view: &WorksheetView) -> Vec<LedgerEntry> {
    let keys = view.header.iter().skip(TRANSACTION_COLUMNS.len());
    view.rows
        .iter()
        .map(|row| {
            let tx = pad_row(row.clone());
            let allocations = keys
                .clone()
                .zip(row.iter().skip(TRANSACTION_COLUMNS.len()))
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            LedgerEntry {
                fitid: tx[0].clone(),
                posted: tx[1].clone(),
                kind: tx[2].clone(),
                amount: tx[3].clone(),
                name: tx[4].clone(),
                memo: tx[5].clone(),
                allocations,
            }
        })
        .collect()
}

/// Write `view` to `out` as `csv` (header plus rows) or `json` (entries).
pub fn export(view: &WorksheetView, fmt: &str, out: &str) -> Result<()> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(&view.header)?;
            for row in &view.rows {
                wtr.write_record(row)?;
            }
            wtr.flush()?;
        }
        "json" => {
            std::fs::write(out, serde_json::to_string_pretty(&entries(view))?)?;
        }
        other => {
            let msg = format!("Unknown format: {} (use csv|json)", other);
            return Err(SplitError::Config(msg).into());
        }
    }
    Ok(())
}
