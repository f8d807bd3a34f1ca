// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Keeping a period's worksheet consistent with the run's category schema,
//! and writing the categorized batch after its existing rows.

use crate::allocation::AllocationSet;
use crate::context::RunContext;
use crate::error::SplitError;
use crate::ledger::Ledger;
use crate::models::{AMOUNT_COLUMN, CategorySchema, TRANSACTION_COLUMNS, Transaction};
use crate::store::CellRange;
use log::{debug, info};

/// Title given to newly created workbooks.
pub const CONTAINER_TITLE: &str = "CreditCardTransactions";

/// Worksheet a freshly created workbook starts with.
const DEFAULT_WORKSHEET: &str = "Sheet1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderState {
    /// The worksheet had no header and one was written.
    Written,
    /// The stored header already matched.
    Matched,
}

#[derive(Debug, Clone)]
pub struct AllocatedTransaction {
    pub transaction: Transaction,
    pub allocation: AllocationSet,
}

fn store_err(e: anyhow::Error) -> SplitError {
    SplitError::Store(format!("{:#}", e))
}

/// Transaction columns followed by the category keys.
pub fn expected_header(schema: &CategorySchema) -> Vec<String> {
    TRANSACTION_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .chain(schema.keys().map(str::to_string))
        .collect()
}

/// Open the configured workbook (or create one) and make sure the period's
/// worksheet exists.
pub fn open_container(ctx: &mut RunContext<'_>) -> Result<(), SplitError> {
    let store = ctx.store;
    let period = ctx.period().as_str().to_string();

    let container = match &ctx.config.document_id {
        Some(id) => {
            let container = store.get_container(id).map_err(store_err)?;
            println!("Spreadsheet Opened: {}", container.title);
            if !container.has_worksheet(&period) {
                info!("creating worksheet {} in {}", period, container.id);
                store
                    .create_worksheet(&container.id, &period)
                    .map_err(store_err)?;
            }
            container
        }
        None => {
            let container = store.create_container(CONTAINER_TITLE).map_err(store_err)?;
            println!("Spreadsheet Created and Opened: {}", container.title);
            if container.has_worksheet(DEFAULT_WORKSHEET) {
                store
                    .rename_worksheet(&container.id, DEFAULT_WORKSHEET, &period)
                    .map_err(store_err)?;
            } else {
                store
                    .create_worksheet(&container.id, &period)
                    .map_err(store_err)?;
            }
            container
        }
    };
    println!("Spreadsheet ID: {}", container.id);

    store
        .apply_presentation(&container.id, &period, AMOUNT_COLUMN)
        .map_err(store_err)?;
    ctx.container = Some(store.get_container(&container.id).map_err(store_err)?);
    Ok(())
}

/// Write the header if the worksheet has none; otherwise require it to match
/// exactly.
pub fn reconcile_header(ctx: &RunContext<'_>) -> Result<HeaderState, SplitError> {
    let container = ctx.container_id().map_err(store_err)?;
    let period = ctx.period().as_str();
    let expected = expected_header(ctx.schema());
    let actual = ctx
        .store
        .get_header(container, period)
        .map_err(store_err)?;

    if actual.is_empty() {
        ctx.store
            .set_header(container, period, &expected)
            .map_err(store_err)?;
        debug!("wrote header for {}", period);
        return Ok(HeaderState::Written);
    }
    if actual != expected {
        return Err(SplitError::HeaderMismatch { expected, actual });
    }
    Ok(HeaderState::Matched)
}

/// Container bootstrap plus header check; nothing is allocated before this passes.
pub fn prepare_worksheet(ctx: &mut RunContext<'_>) -> Result<HeaderState, SplitError> {
    open_container(ctx)?;
    reconcile_header(ctx)
}

/// Transaction columns of every data row already in the period's worksheet.
pub fn load_ledger(ctx: &RunContext<'_>) -> Result<Ledger, SplitError> {
    let container = ctx.container_id().map_err(store_err)?;
    let range = CellRange::columns(ctx.period().as_str(), 1, TRANSACTION_COLUMNS.len());
    let mut rows = ctx.store.get_rows(container, &range).map_err(store_err)?;
    if !rows.is_empty() {
        rows.remove(0);
    }
    let ledger = Ledger::from_rows(rows);
    println!("Found {} worksheet transactions.", ledger.len());
    Ok(ledger)
}

/// Rows to append, ascending by posting time; ties keep import order.
pub fn build_batch(mut items: Vec<AllocatedTransaction>) -> Vec<Vec<String>> {
    items.sort_by_key(|item| item.transaction.posted_at);
    items
        .into_iter()
        .map(|item| {
            let mut row = item.transaction.to_cells();
            row.extend(item.allocation.to_cells());
            row
        })
        .collect()
}

/// Range directly below the header and `existing_rows` data rows.
pub fn target_range(
    worksheet: &str,
    existing_rows: usize,
    batch: &[Vec<String>],
) -> Option<CellRange> {
    let width = batch.iter().map(Vec::len).max()?;
    Some(CellRange::block(worksheet, existing_rows + 2, batch.len(), width))
}

/// Append `batch` after the ledger's rows; returns the number of cells written.
pub fn write_batch(
    ctx: &RunContext<'_>,
    existing_rows: usize,
    batch: &[Vec<String>],
) -> Result<usize, SplitError> {
    let Some(range) = target_range(ctx.period().as_str(), existing_rows, batch) else {
        println!("No transactions to write...");
        return Ok(0);
    };
    let container = ctx.container_id().map_err(store_err)?;
    info!("writing {} rows to {}", batch.len(), range);
    let cells = ctx
        .store
        .append_rows(container, &range, batch)
        .map_err(store_err)?;
    println!("{} cells updated.", cells);
    Ok(cells)
}
