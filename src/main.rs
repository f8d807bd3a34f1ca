// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::process::ExitCode;

use cardsplit::{cli, commands, error::exit_code_for};

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn dispatch(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("run", sub)) => commands::run::handle(sub)?,
        Some(("check", sub)) => commands::check::handle(sub)?,
        Some(("ledger", sub)) => commands::ledger::handle(sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let matches = cli::build_cli().get_matches();
    init_logging(matches.get_flag("verbose"));

    match dispatch(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}
