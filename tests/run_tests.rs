// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cardsplit::allocation::{AllocationSession, Prompter, Transition};
use cardsplit::commands::run::{RunSummary, execute};
use cardsplit::config::{RunConfig, StoreKind};
use cardsplit::error::{SplitError, exit_code_for};
use cardsplit::import::ofx::parse_ofx;
use cardsplit::models::{
    AccountIdentity, CategorySchema, StatementPeriod, Transaction, TransactionKind,
};
use cardsplit::context::RunContext;
use cardsplit::reconcile::{
    AllocatedTransaction, HeaderState, build_batch, expected_header, open_container,
    reconcile_header, target_range,
};
use cardsplit::store::sqlite::LocalStore;
use cardsplit::store::{CellRange, TabularStore};
use chrono::DateTime;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Cursor;
use std::path::PathBuf;

const STATEMENT: &str = "<OFX>
<BANKACCTFROM>
<BANKID>325081403
<ACCTID>XXXX1234
<ACCTTYPE>CREDITLINE
</BANKACCTFROM>
<BANKTRANLIST>
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20241102120000[-5:EST]
<TRNAMT>-44.03
<FITID>2024110201
<NAME>SAFEWAY #1234
<MEMO>
</STMTTRN>
<STMTTRN>
<TRNTYPE>CREDIT
<DTPOSTED>20241101
<TRNAMT>250.00
<FITID>2024110101
<NAME>PAYMENT - THANK YOU
<MEMO>AUTOPAY
</STMTTRN>
</BANKTRANLIST>
</OFX>
";

const LATE_PURCHASE: &str = "<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20241120
<TRNAMT>-9.99
<FITID>2024112001
<NAME>STREAMING
<MEMO>monthly
</STMTTRN>
</BANKTRANLIST>";

fn store() -> LocalStore {
    LocalStore::from_connection(Connection::open_in_memory().unwrap()).unwrap()
}

fn config(keys: &str, document_id: Option<&str>) -> RunConfig {
    let keys: Vec<&str> = keys.split(':').collect();
    RunConfig {
        import_file: PathBuf::from("statement.qfx"),
        period: StatementPeriod::parse("20241126").unwrap(),
        schema: CategorySchema::from_keys(&keys).unwrap(),
        identity: AccountIdentity {
            bank_id: "325081403".into(),
            account_type: "CREDITLINE".into(),
        },
        document_id: document_id.map(str::to_string),
        store: StoreKind::Local,
        credential_dir: None,
    }
}

fn run_capturing(
    cfg: &RunConfig,
    statement: &str,
    store: &LocalStore,
    input: &str,
) -> (anyhow::Result<RunSummary>, String) {
    let statement = parse_ofx(statement).unwrap();
    let mut out = Vec::new();
    let result = {
        let mut prompter = Prompter::new(Cursor::new(input.to_string()), &mut out);
        execute(cfg, &statement, store, &mut prompter)
    };
    (result, String::from_utf8(out).unwrap())
}

fn run(
    cfg: &RunConfig,
    statement: &str,
    store: &LocalStore,
    input: &str,
) -> anyhow::Result<RunSummary> {
    run_capturing(cfg, statement, store, input).0
}

fn worksheet(store: &LocalStore, container: &str, title: &str) -> Vec<Vec<String>> {
    store
        .get_rows(container, &CellRange::worksheet(title))
        .unwrap()
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

#[test]
fn first_run_creates_workbook_and_writes_sorted_batch() {
    let store = store();
    // Debit first (import order), then the payment.
    let summary = run(&config("c:k", None), STATEMENT, &store, "c 20\nk\nc\n").unwrap();
    assert_eq!(
        summary,
        RunSummary {
            imported: 2,
            skipped: 0,
            allocated: 2,
            cells_written: 16,
        }
    );

    let container = store.get_container("1").unwrap();
    assert_eq!(container.title, "CreditCardTransactions");
    assert_eq!(container.worksheets, vec!["20241126"]);

    let rows = worksheet(&store, "1", "20241126");
    assert_eq!(rows[0], row(&["FITID", "DTPOSTED", "TRNTYPE", "TRNAMT", "NAME", "MEMO", "c", "k"]));
    assert_eq!(
        rows[1],
        row(&[
            "2024110101",
            "2024-11-01T00:00:00+00:00",
            "CREDIT",
            "250.00",
            "PAYMENT - THANK YOU",
            "AUTOPAY",
            "-250.00",
        ])
    );
    assert_eq!(
        rows[2],
        row(&[
            "2024110201",
            "2024-11-02T12:00:00-05:00",
            "DEBIT",
            "-44.03",
            "SAFEWAY #1234",
            "",
            "20",
            "24.03",
        ])
    );
    assert_eq!(rows.len(), 3);
}

#[test]
fn second_run_skips_recorded_and_appends_new() {
    let store = store();
    run(&config("c:k", None), STATEMENT, &store, "c 20\nk\nc\n").unwrap();

    // Nothing new: no prompts, nothing written.
    let again = run(&config("c:k", Some("1")), STATEMENT, &store, "").unwrap();
    assert_eq!(again.skipped, 2);
    assert_eq!(again.cells_written, 0);
    assert_eq!(worksheet(&store, "1", "20241126").len(), 3);

    let extended = STATEMENT.replace("</BANKTRANLIST>", LATE_PURCHASE);
    let third = run(&config("c:k", Some("1")), &extended, &store, "k\n").unwrap();
    assert_eq!(third.skipped, 2);
    assert_eq!(third.allocated, 1);

    let rows = worksheet(&store, "1", "20241126");
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[3][0], "2024112001");
    assert_eq!(rows[3][7], "9.99");
}

#[test]
fn header_mismatch_fails_before_any_prompt() {
    let store = store();
    run(&config("c:k", None), STATEMENT, &store, "c 20\nk\nc\n").unwrap();

    let err = run(&config("groceries:fuel", Some("1")), STATEMENT, &store, "groceries\n")
        .unwrap_err();
    match err.downcast_ref::<SplitError>() {
        Some(SplitError::HeaderMismatch { expected, actual }) => {
            assert_eq!(expected.last().map(String::as_str), Some("fuel"));
            assert_eq!(actual.last().map(String::as_str), Some("k"));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(exit_code_for(&err), 4);
    assert_eq!(worksheet(&store, "1", "20241126").len(), 3);
}

#[test]
fn header_differing_in_one_column_fails() {
    let store = store();
    run(&config("c:k", None), STATEMENT, &store, "c 20\nk\nc\n").unwrap();
    let before = worksheet(&store, "1", "20241126");

    for keys in ["c:x", "c:k:extra", "k:c"] {
        let err = run(&config(keys, Some("1")), STATEMENT, &store, "c\nc\n").unwrap_err();
        assert!(
            matches!(err.downcast_ref::<SplitError>(), Some(SplitError::HeaderMismatch { .. })),
            "{} should not match the stored header",
            keys
        );
        assert_eq!(exit_code_for(&err), 4);
        assert_eq!(worksheet(&store, "1", "20241126"), before);
    }
}

#[test]
fn empty_header_on_existing_worksheet_is_written() {
    let store = store();
    let container = store.create_container("CreditCardTransactions").unwrap();
    store
        .rename_worksheet(&container.id, "Sheet1", "20241126")
        .unwrap();

    let cfg = config("c:k", Some(container.id.as_str()));
    let mut ctx = RunContext::new(&cfg, &store);
    open_container(&mut ctx).unwrap();
    assert_eq!(reconcile_header(&ctx).unwrap(), HeaderState::Written);
    assert_eq!(reconcile_header(&ctx).unwrap(), HeaderState::Matched);
    assert_eq!(
        worksheet(&store, &container.id, "20241126"),
        vec![expected_header(&cfg.schema)]
    );
}

#[test]
fn skip_notices_interleave_with_prompts_in_import_order() {
    let store = store();
    // Record only the payment, which sits second in the import.
    let start = STATEMENT.find("<STMTTRN>").unwrap();
    let end = STATEMENT.find("</STMTTRN>").unwrap() + "</STMTTRN>\n".len();
    let payment_only = format!("{}{}", &STATEMENT[..start], &STATEMENT[end..]);
    run(&config("c:k", None), &payment_only, &store, "c\n").unwrap();

    let extended = STATEMENT.replace("</BANKTRANLIST>", LATE_PURCHASE);
    let (result, out) = run_capturing(&config("c:k", Some("1")), &extended, &store, "c\nk\n");
    let summary = result.unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.allocated, 2);

    let first = out.find("Classify transaction 1 of 3:").unwrap();
    let skip = out.find("Skipping allocated transaction 2 of 3").unwrap();
    let third = out.find("Classify transaction 3 of 3:").unwrap();
    assert!(first < skip && skip < third, "{}", out);
}

#[test]
fn closed_input_writes_nothing() {
    let store = store();
    let err = run(&config("c:k", None), STATEMENT, &store, "c 20\nk\n").unwrap_err();
    assert_eq!(exit_code_for(&err), 6);
    let rows = worksheet(&store, "1", "20241126");
    assert_eq!(rows, vec![expected_header(&config("c:k", None).schema)]);
}

#[test]
fn mismatched_account_stops_before_the_store() {
    let store = store();
    let other_bank = STATEMENT.replace("325081403", "314074269");
    let err = run(&config("c:k", None), &other_bank, &store, "").unwrap_err();
    assert_eq!(exit_code_for(&err), 3);
    assert!(store.get_container("1").is_err());
}

#[test]
fn new_period_gets_its_own_worksheet_first() {
    let store = store();
    run(&config("c:k", None), STATEMENT, &store, "c 20\nk\nc\n").unwrap();

    let mut december = config("c:k", Some("1"));
    december.period = StatementPeriod::parse("20241226").unwrap();
    let summary = run(&december, STATEMENT, &store, "c\nk\n").unwrap();
    assert_eq!(summary.skipped, 0);

    let container = store.get_container("1").unwrap();
    assert_eq!(container.worksheets, vec!["20241226", "20241126"]);
    assert_eq!(worksheet(&store, "1", "20241226").len(), 3);
}

fn zero_set(schema: &CategorySchema) -> cardsplit::allocation::AllocationSet {
    match AllocationSession::begin(schema, Decimal::ZERO).unwrap() {
        Transition::Complete(set) => set,
        other => panic!("expected completion, got {:?}", other),
    }
}

fn tx(id: &str, posted: &str) -> Transaction {
    Transaction {
        id: id.into(),
        posted_at: DateTime::parse_from_rfc3339(posted).unwrap(),
        kind: TransactionKind::Debit,
        amount: Decimal::ZERO,
        name: String::new(),
        memo: String::new(),
    }
}

#[test]
fn batch_is_sorted_by_posting_time_and_stable() {
    let schema = CategorySchema::from_keys(&["a", "b"]).unwrap();
    let items = vec![
        ("late", "2024-11-03T00:00:00+00:00"),
        ("tie1", "2024-11-02T00:00:00+00:00"),
        // Same instant as tie1 in another zone.
        ("tie2", "2024-11-01T19:00:00-05:00"),
        ("early", "2024-11-01T00:00:00+00:00"),
    ]
    .into_iter()
    .map(|(id, posted)| AllocatedTransaction {
        transaction: tx(id, posted),
        allocation: zero_set(&schema),
    })
    .collect();

    let batch = build_batch(items);
    let ids: Vec<&str> = batch.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(ids, vec!["early", "tie1", "tie2", "late"]);
    assert!(batch.iter().all(|r| r.len() == 8));
}

#[test]
fn target_range_starts_below_existing_rows() {
    let batch = vec![vec![String::new(); 8]; 3];
    let range = target_range("20241126", 10, &batch).unwrap();
    assert_eq!(range.first_row, 12);
    assert_eq!(range.last_row, Some(14));
    assert_eq!(range.to_string(), "'20241126'!A12:H14");
    assert!(target_range("20241126", 10, &[]).is_none());
}
