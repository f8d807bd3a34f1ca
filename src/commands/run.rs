// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The categorization run: import, reconcile, allocate, write.

use crate::allocation::Prompter;
use crate::config::{Overrides, RunConfig, Settings};
use crate::context::{RunContext, open_store};
use crate::import;
use crate::models::Statement;
use crate::reconcile::{self, AllocatedTransaction};
use crate::store::TabularStore;
use anyhow::Result;
use log::info;
use serde::Serialize;
use std::io::{self, BufRead, Write};

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub imported: usize,
    pub skipped: usize,
    pub allocated: usize,
    pub cells_written: usize,
}

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    let settings = Settings::load(Overrides::from_matches(m))?;
    let config = RunConfig::from_settings(&settings)?;
    // The import file is parsed before the store is touched.
    let statement = import::load_statement(&config.import_file)?;
    let store = open_store(config.store, config.credential_dir.as_deref())?;

    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout());
    let summary = execute(&config, &statement, store.as_ref(), &mut prompter)?;
    info!(
        "run finished: {} imported, {} skipped, {} allocated, {} cells",
        summary.imported, summary.skipped, summary.allocated, summary.cells_written
    );
    Ok(())
}

/// Run the whole pipeline against `store`, reading allocations through `prompter`.
///
/// The worksheet header is reconciled before any input is read, and nothing
/// is written until every new transaction has been allocated.
pub fn execute<R: BufRead, W: Write>(
    config: &RunConfig,
    statement: &Statement,
    store: &dyn TabularStore,
    prompter: &mut Prompter<R, W>,
) -> Result<RunSummary> {
    let transactions = import::normalize(statement, &config.identity)?;
    println!("Found {} imported transactions.", transactions.len());

    let mut ctx = RunContext::new(config, store);
    reconcile::prepare_worksheet(&mut ctx)?;
    let ledger = reconcile::load_ledger(&ctx)?;

    let total = transactions.len();
    let mut skipped = 0;
    let mut allocated = Vec::new();
    for (i, tx) in transactions.iter().enumerate() {
        if ledger.is_recorded(tx) {
            writeln!(prompter.output(), "Skipping allocated transaction {} of {}", i + 1, total)?;
            skipped += 1;
            continue;
        }
        writeln!(prompter.output(), "\nClassify transaction {} of {}:", i + 1, total)?;
        prompter.show_transaction(tx)?;
        let allocation = prompter.allocate(ctx.schema(), tx)?;
        allocated.push(AllocatedTransaction {
            transaction: tx.clone(),
            allocation,
        });
    }

    let batch = reconcile::build_batch(allocated);
    let cells_written = reconcile::write_batch(&ctx, ledger.len(), &batch)?;
    Ok(RunSummary {
        imported: total,
        skipped,
        allocated: batch.len(),
        cells_written,
    })
}
