// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Dry run of the import: parse and normalize a statement without touching a store.

use crate::config::{Overrides, Settings};
use crate::import;
use crate::models::{Transaction, TransactionKind};
use crate::utils::{maybe_print_json, pretty_table};
use anyhow::Result;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatementSummary {
    pub transactions: usize,
    pub credits: usize,
    pub debits: usize,
    pub credit_total: Decimal,
    pub debit_total: Decimal,
    /// Sum of the amounts owed, i.e. the statement's net charge.
    pub owed_total: Decimal,
    pub first_posted: Option<String>,
    pub last_posted: Option<String>,
}

pub fn summarize(transactions: &[Transaction]) -> StatementSummary {
    let mut s = StatementSummary {
        transactions: transactions.len(),
        ..Default::default()
    };
    for tx in transactions {
        match tx.kind {
            TransactionKind::Credit => {
                s.credits += 1;
                s.credit_total += tx.amount;
            }
            TransactionKind::Debit => {
                s.debits += 1;
                s.debit_total += tx.amount;
            }
        }
        s.owed_total += tx.inverted_amount();
    }
    s.first_posted = transactions.iter().map(|t| t.posted_at).min().map(|d| d.to_rfc3339());
    s.last_posted = transactions.iter().map(|t| t.posted_at).max().map(|d| d.to_rfc3339());
    s
}

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(Overrides::from_matches(m))?;
    let path = settings.import_file()?;
    let identity = settings.identity()?;
    if m.try_get_one::<String>("statement_date").ok().flatten().is_some() {
        settings.period()?;
    }

    let statement = import::load_statement(&path)?;
    let transactions = import::normalize(&statement, &identity)?;
    let summary = summarize(&transactions);

    if maybe_print_json(m.get_flag("json"), false, &summary)? {
        return Ok(());
    }
    let rows = vec![
        vec!["Transactions".into(), summary.transactions.to_string()],
        vec!["Credits".into(), format!("{} ({})", summary.credits, summary.credit_total)],
        vec!["Debits".into(), format!("{} ({})", summary.debits, summary.debit_total)],
        vec!["Amount owed".into(), summary.owed_total.to_string()],
        vec!["First posted".into(), summary.first_posted.clone().unwrap_or_default()],
        vec!["Last posted".into(), summary.last_posted.clone().unwrap_or_default()],
    ];
    println!("{}", pretty_table(&["Statement", path.display().to_string().as_str()], rows));
    Ok(())
}
