// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

fn value(id: &'static str, long: &'static str, help: &'static str) -> Arg {
    Arg::new(id).long(long).help(help)
}

fn config_args() -> Vec<Arg> {
    vec![
        value("config_file", "config-file", "JSON config file (default: platform config dir)"),
        value(
            "credential_dir",
            "credential-dir",
            "Directory holding token.json for the sheets store",
        ),
        value("bank_id", "bank-id", "Nine-digit routing number the statement must declare"),
        value(
            "document_id",
            "document-id",
            "Existing workbook to write to; a new one is created when absent",
        ),
        value(
            "alloc_columns",
            "alloc-columns",
            "Colon-separated category keys, e.g. groceries:fuel:misc",
        ),
        value(
            "statement_date",
            "statement-date",
            "Statement period as YYYYMMDD; names the worksheet",
        ),
        value("store", "store", "Workbook backend: local|sheets"),
    ]
}

fn import_arg() -> Arg {
    value("import_file", "ofx-file", "OFX/QFX statement download").visible_alias("import-file")
}

fn json_flags() -> [Arg; 2] {
    [
        Arg::new("json").long("json").action(ArgAction::SetTrue).help("Print JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

pub fn build_cli() -> Command {
    Command::new("cardsplit")
        .about("Categorize credit card statement transactions into a per-statement worksheet")
        .version(crate_version!())
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging (RUST_LOG takes precedence)"),
        )
        .subcommand(
            Command::new("run")
                .about("Import a statement and allocate its new transactions")
                .args(config_args())
                .arg(import_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Parse and validate a statement without touching a workbook")
                .args(config_args())
                .arg(import_arg())
                .arg(Arg::new("json").long("json").action(ArgAction::SetTrue).help("Print JSON")),
        )
        .subcommand(
            Command::new("ledger")
                .about("Inspect a period's worksheet")
                .subcommand(
                    Command::new("list")
                        .about("Show recorded transactions and their allocations")
                        .args(config_args())
                        .args(json_flags()),
                )
                .subcommand(
                    Command::new("export")
                        .about("Export recorded transactions")
                        .args(config_args())
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .help("csv|json"),
                        )
                        .arg(Arg::new("out").long("out").required(true).help("Output file")),
                ),
        )
}
