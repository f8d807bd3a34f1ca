// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Matching imported transactions against rows already in a worksheet.
//!
//! Some issuers reuse FITID values within a statement period, so a row is
//! considered recorded only when the whole visible tuple matches. Two reused-id
//! transactions with identical date, type, amount, name and memo cannot be told
//! apart and will match each other; that is accepted rather than guessed at.

use crate::models::{AMOUNT_COLUMN, TRANSACTION_COLUMNS, Transaction};
use log::debug;
use rust_decimal::Decimal;

/// Previously persisted transaction rows of one statement period.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    rows: Vec<Vec<String>>,
}

/// Pad a stored row back to the transaction width.
///
/// The store drops trailing empty cells (typically an empty memo); without
/// padding such rows never compare equal and get categorized a second time.
pub fn pad_row(mut row: Vec<String>) -> Vec<String> {
    if row.len() < TRANSACTION_COLUMNS.len() {
        row.resize(TRANSACTION_COLUMNS.len(), String::new());
    }
    row.truncate(TRANSACTION_COLUMNS.len());
    row
}

fn cell_matches(col: usize, stored: &str, imported: &str) -> bool {
    if stored == imported {
        return true;
    }
    // "-55.0" and "-55.00" are the same amount once a sheet has reformatted it.
    if col == AMOUNT_COLUMN {
        if let (Ok(a), Ok(b)) = (stored.trim().parse::<Decimal>(), imported.parse::<Decimal>()) {
            return a == b;
        }
    }
    false
}

impl Ledger {
    /// Build a ledger from data rows (header excluded).
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: rows.into_iter().map(pad_row).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_recorded(&self, tx: &Transaction) -> bool {
        let cells = tx.to_cells();
        self.rows.iter().any(|row| {
            row.iter()
                .zip(cells.iter())
                .enumerate()
                .all(|(col, (stored, imported))| cell_matches(col, stored, imported))
        })
    }

    /// Split `transactions` into (already recorded, new), keeping import order
    /// and each transaction's position in the import.
    pub fn partition<'a>(
        &self,
        transactions: &'a [Transaction],
    ) -> (Vec<(usize, &'a Transaction)>, Vec<(usize, &'a Transaction)>) {
        let mut recorded = Vec::new();
        let mut fresh = Vec::new();
        for (i, tx) in transactions.iter().enumerate() {
            if self.is_recorded(tx) {
                debug!("transaction {} ({}) already recorded", i + 1, tx.id);
                recorded.push((i, tx));
            } else {
                fresh.push((i, tx));
            }
        }
        (recorded, fresh)
    }
}
