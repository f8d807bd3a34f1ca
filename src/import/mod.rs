// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Statement import: file parsing and normalization into [`Transaction`]s.

pub mod ofx;

use crate::error::SplitError;
use crate::models::{AccountIdentity, Statement, Transaction, TransactionKind};
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;

/// Read and parse an OFX/QFX statement download.
pub fn load_statement(path: &Path) -> Result<Statement> {
    let bytes = std::fs::read(path).with_context(|| format!("Open OFX file {}", path.display()))?;
    // Older SGML downloads are frequently latin-1; keep whatever decodes.
    let text = String::from_utf8_lossy(&bytes);
    ofx::parse_ofx(&text).with_context(|| format!("Parse OFX file {}", path.display()))
}

/// Convert every record of `statement` into a canonical transaction.
///
/// The declared account identity is checked once for the whole file before
/// any record is looked at.
pub fn normalize(
    statement: &Statement,
    expected: &AccountIdentity,
) -> Result<Vec<Transaction>, SplitError> {
    if statement.identity.bank_id != expected.bank_id {
        return Err(SplitError::SchemaMismatch {
            field: "BankID",
            expected: expected.bank_id.clone(),
            actual: statement.identity.bank_id.clone(),
        });
    }
    if statement.identity.account_type != expected.account_type {
        return Err(SplitError::SchemaMismatch {
            field: "account type",
            expected: expected.account_type.clone(),
            actual: statement.identity.account_type.clone(),
        });
    }

    let mut out = Vec::with_capacity(statement.records.len());
    for rec in &statement.records {
        let invalid = |reason: String| SplitError::InvalidRecord {
            id: rec.id.clone(),
            reason,
        };
        let kind = TransactionKind::parse(&rec.type_tag)
            .ok_or_else(|| invalid(format!("unknown transaction type '{}'", rec.type_tag)))?;
        let amount = rec
            .amount
            .trim()
            .parse::<Decimal>()
            .map_err(|_| invalid(format!("invalid amount '{}'", rec.amount)))?;

        // Statement amounts are signed from the customer's point of view.
        match kind {
            TransactionKind::Credit if amount.is_sign_negative() && !amount.is_zero() => {
                return Err(invalid(format!("negative credit {}", amount)));
            }
            TransactionKind::Debit if amount.is_sign_positive() && !amount.is_zero() => {
                return Err(invalid(format!("positive debit {}", amount)));
            }
            _ => {}
        }

        out.push(Transaction {
            id: rec.id.clone(),
            posted_at: rec.posted_at,
            kind,
            amount,
            name: rec.name.clone(),
            memo: rec.memo.clone(),
        });
    }
    Ok(out)
}
