// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Minimal OFX reader covering both SGML (1.x) and XML (2.x) downloads.
//!
//! Only the pieces a credit-line statement needs are extracted: the
//! `BANKACCTFROM` identity and the `STMTTRN` list.

use crate::models::{AccountIdentity, RawRecord, Statement};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

static STMTTRN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<STMTTRN>(.*?)</STMTTRN>").expect("valid regex"));

static OFX_DATETIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{8})(\d{6})?(?:\.\d{1,3})?(?:\[([+-]?\d{1,2}(?:\.\d+)?)(?::[^\]]*)?\])?$")
        .expect("valid regex")
});

/// Value of the first `<TAG>` element in `body`, for SGML and XML alike.
fn element(body: &str, tag: &str) -> Option<String> {
    let re = Regex::new(&format!(r"(?i)<{}>([^<\r\n]*)", regex::escape(tag))).ok()?;
    re.captures(body)
        .map(|c| decode_entities(c[1].trim()))
}

fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

pub fn parse_ofx(text: &str) -> Result<Statement> {
    let acct_start = text
        .to_ascii_uppercase()
        .find("<BANKACCTFROM>")
        .ok_or_else(|| anyhow!("No BANKACCTFROM aggregate found"))?;
    let acct = &text[acct_start..];
    let identity = AccountIdentity {
        bank_id: element(acct, "BANKID").context("BANKID missing")?,
        account_type: element(acct, "ACCTTYPE").context("ACCTTYPE missing")?,
    };

    let mut records = Vec::new();
    for cap in STMTTRN.captures_iter(text) {
        let body = &cap[1];
        let id = element(body, "FITID").context("FITID missing")?;
        let posted_raw = element(body, "DTPOSTED")
            .with_context(|| format!("DTPOSTED missing for {}", id))?;
        let posted_at = parse_ofx_datetime(&posted_raw)
            .with_context(|| format!("Invalid DTPOSTED '{}' for {}", posted_raw, id))?;
        records.push(RawRecord {
            type_tag: element(body, "TRNTYPE")
                .with_context(|| format!("TRNTYPE missing for {}", id))?,
            amount: element(body, "TRNAMT")
                .with_context(|| format!("TRNAMT missing for {}", id))?,
            name: element(body, "NAME").unwrap_or_default(),
            memo: element(body, "MEMO").unwrap_or_default(),
            posted_at,
            id,
        });
    }
    Ok(Statement { identity, records })
}

/// Parse `YYYYMMDD[HHMMSS[.XXX]][[gmt offset[:tz name]]]`; no offset means UTC.
pub fn parse_ofx_datetime(s: &str) -> Result<DateTime<FixedOffset>> {
    let caps = OFX_DATETIME
        .captures(s.trim())
        .ok_or_else(|| anyhow!("Unrecognized OFX datetime '{}'", s))?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y%m%d")?;
    let time = match caps.get(2) {
        Some(t) => NaiveTime::parse_from_str(t.as_str(), "%H%M%S")?,
        None => NaiveTime::MIN,
    };
    let offset_secs = match caps.get(3) {
        Some(o) => {
            let hours: f64 = o.as_str().parse()?;
            (hours * 3600.0).round() as i32
        }
        None => 0,
    };
    let tz = FixedOffset::east_opt(offset_secs)
        .ok_or_else(|| anyhow!("Offset out of range in '{}'", s))?;
    tz.from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .ok_or_else(|| anyhow!("Ambiguous OFX datetime '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_defaults_to_utc_midnight() {
        let dt = parse_ofx_datetime("20241101").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-11-01T00:00:00+00:00");
    }

    #[test]
    fn datetime_with_offset_and_zone_name() {
        let dt = parse_ofx_datetime("20241102120000.000[-5:EST]").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-11-02T12:00:00-05:00");
    }

    #[test]
    fn datetime_rejects_garbage() {
        assert!(parse_ofx_datetime("2024-11-02").is_err());
        assert!(parse_ofx_datetime("20241302").is_err());
    }

    #[test]
    fn element_decodes_entities() {
        let body = "<NAME>AT&amp;T WIRELESS\n<MEMO>";
        assert_eq!(element(body, "NAME").as_deref(), Some("AT&T WIRELESS"));
        assert_eq!(element(body, "MEMO").as_deref(), Some(""));
    }
}
