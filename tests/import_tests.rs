// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use cardsplit::error::{SplitError, exit_code_for};
use cardsplit::import::{self, ofx::parse_ofx};
use cardsplit::models::{AccountIdentity, TransactionKind};
use rust_decimal::Decimal;
use std::io::Write;
use std::str::FromStr;
use tempfile::NamedTempFile;

const SGML: &str = "OFXHEADER:100
DATA:OFXSGML
VERSION:102

<OFX>
<CREDITCARDMSGSRSV1><CCSTMTTRNRS><CCSTMTRS>
<CURDEF>USD
<BANKACCTFROM>
<BANKID>325081403
<ACCTID>XXXX1234
<ACCTTYPE>CREDITLINE
</BANKACCTFROM>
<BANKTRANLIST>
<DTSTART>20241027
<DTEND>20241126
<STMTTRN>
<TRNTYPE>DEBIT
<DTPOSTED>20241102120000.000[-5:EST]
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
</CCSTMTRS></CCSTMTTRNRS></CREDITCARDMSGSRSV1>
</OFX>
";

fn identity() -> AccountIdentity {
    AccountIdentity {
        bank_id: "325081403".into(),
        account_type: "CREDITLINE".into(),
    }
}

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

#[test]
fn parses_sgml_statement() {
    let st = parse_ofx(SGML).unwrap();
    assert_eq!(st.identity, identity());
    assert_eq!(st.records.len(), 2);
    assert_eq!(st.records[0].id, "2024110201");
    assert_eq!(st.records[0].name, "SAFEWAY #1234");
    assert_eq!(st.records[0].memo, "");
    assert_eq!(st.records[1].memo, "AUTOPAY");
}

#[test]
fn normalizes_in_import_order() {
    let st = parse_ofx(SGML).unwrap();
    let txs = import::normalize(&st, &identity()).unwrap();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].kind, TransactionKind::Debit);
    assert_eq!(txs[0].amount, d("-44.03"));
    assert_eq!(txs[0].inverted_amount(), d("44.03"));
    assert_eq!(txs[0].posted_iso(), "2024-11-02T12:00:00-05:00");
    assert_eq!(txs[1].kind, TransactionKind::Credit);
    assert_eq!(
        txs[1].to_cells(),
        vec![
            "2024110101",
            "2024-11-01T00:00:00+00:00",
            "CREDIT",
            "250.00",
            "PAYMENT - THANK YOU",
            "AUTOPAY"
        ]
    );
}

#[test]
fn bank_id_mismatch_rejects_whole_file() {
    let st = parse_ofx(&SGML.replace("325081403", "314074269")).unwrap();
    let err = import::normalize(&st, &identity()).unwrap_err();
    match &err {
        SplitError::SchemaMismatch { field, expected, actual } => {
            assert_eq!(*field, "BankID");
            assert_eq!(expected, "325081403");
            assert_eq!(actual, "314074269");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn account_type_must_be_credit_line() {
    let st = parse_ofx(&SGML.replace("CREDITLINE", "CHECKING")).unwrap();
    let err = import::normalize(&st, &identity()).unwrap_err();
    assert!(matches!(err, SplitError::SchemaMismatch { .. }));
    assert!(err.to_string().contains("CHECKING"));
}

#[test]
fn credit_with_negative_amount_is_invalid() {
    let st = parse_ofx(&SGML.replace("<TRNAMT>250.00", "<TRNAMT>-250.00")).unwrap();
    let err = import::normalize(&st, &identity()).unwrap_err();
    assert!(matches!(err, SplitError::InvalidRecord { ref id, .. } if id == "2024110101"));
}

#[test]
fn unknown_transaction_type_is_invalid() {
    let st = parse_ofx(&SGML.replace("<TRNTYPE>DEBIT", "<TRNTYPE>FEE")).unwrap();
    let err = import::normalize(&st, &identity()).unwrap_err();
    assert!(matches!(err, SplitError::InvalidRecord { .. }));
}

#[test]
fn amount_precision_is_kept() {
    let st = parse_ofx(&SGML.replace("<TRNAMT>-44.03", "<TRNAMT>-44.0300")).unwrap();
    let txs = import::normalize(&st, &identity()).unwrap();
    assert_eq!(txs[0].amount.to_string(), "-44.0300");
}

#[test]
fn loads_statement_from_file() {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(SGML.as_bytes()).unwrap();
    let st = import::load_statement(f.path()).unwrap();
    assert_eq!(st.records.len(), 2);
}

#[test]
fn missing_account_block_is_an_error() {
    let mut f = NamedTempFile::new().unwrap();
    f.write_all(b"<OFX></OFX>").unwrap();
    let err = import::load_statement(f.path()).unwrap_err();
    assert_eq!(exit_code_for(&err), 1);
    assert!(format!("{:#}", err).contains("BANKACCTFROM"));
}
