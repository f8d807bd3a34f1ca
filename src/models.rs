// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::SplitError;
use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Fixed leading columns of every statement worksheet.
pub const TRANSACTION_COLUMNS: [&str; 6] =
    ["FITID", "DTPOSTED", "TRNTYPE", "TRNAMT", "NAME", "MEMO"];

/// Index of the amount column within [`TRANSACTION_COLUMNS`].
pub const AMOUNT_COLUMN: usize = 3;

/// Only credit-line statements are categorized.
pub const REQUIRED_ACCOUNT_TYPE: &str = "CREDITLINE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "CREDIT",
            TransactionKind::Debit => "DEBIT",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim() {
            "CREDIT" => Some(TransactionKind::Credit),
            "DEBIT" => Some(TransactionKind::Debit),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ledger event as issued by the card issuer.
///
/// Amounts follow the issuer's sign convention: a CREDIT (payment, refund) is
/// positive and a DEBIT (purchase) is negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub posted_at: DateTime<FixedOffset>,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub name: String,
    pub memo: String,
}

impl Transaction {
    /// The amount owed to the issuer: purchases become positive, payments negative.
    pub fn inverted_amount(&self) -> Decimal {
        -self.amount
    }

    pub fn posted_iso(&self) -> String {
        self.posted_at.to_rfc3339()
    }

    /// Cells in [`TRANSACTION_COLUMNS`] order, as persisted in a worksheet.
    pub fn to_cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.posted_iso(),
            self.kind.as_str().to_string(),
            self.amount.to_string(),
            self.name.clone(),
            self.memo.clone(),
        ]
    }
}

/// Routing identifier and account type declared by an import file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub bank_id: String,
    pub account_type: String,
}

/// A record as produced by an import parser, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub id: String,
    pub posted_at: DateTime<FixedOffset>,
    pub type_tag: String,
    pub amount: String,
    pub name: String,
    pub memo: String,
}

/// Parsed content of one import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub identity: AccountIdentity,
    pub records: Vec<RawRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub long_name: Option<String>,
}

impl Category {
    pub fn new(key: impl Into<String>, long_name: Option<String>) -> Self {
        Self {
            key: key.into(),
            long_name,
        }
    }
}

/// Ordered allocation categories for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySchema {
    categories: Vec<Category>,
}

impl CategorySchema {
    pub fn new(categories: Vec<Category>) -> Result<Self, SplitError> {
        if categories.len() < 2 {
            return Err(SplitError::Config(
                "Two or more allocation columns are required.".into(),
            ));
        }
        let mut seen = HashSet::new();
        for c in &categories {
            if c.key.is_empty() || c.key.chars().any(char::is_whitespace) {
                return Err(SplitError::Config(format!(
                    "Invalid allocation column '{}'",
                    c.key
                )));
            }
            if c.key == "?" {
                return Err(SplitError::Config(
                    "'?' is reserved for help and cannot be an allocation column".into(),
                ));
            }
            if !seen.insert(c.key.as_str()) {
                return Err(SplitError::Config(format!(
                    "Duplicate allocation column '{}'",
                    c.key
                )));
            }
        }
        Ok(Self { categories })
    }

    /// Schema from bare keys, without long names.
    pub fn from_keys<S: AsRef<str>>(keys: &[S]) -> Result<Self, SplitError> {
        Self::new(
            keys.iter()
                .map(|k| Category::new(k.as_ref(), None))
                .collect(),
        )
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.key == key)
    }

    pub fn get(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    pub fn has_long_names(&self) -> bool {
        self.categories.iter().any(|c| c.long_name.is_some())
    }
}

/// Statement closing date in `YYYYMMDD` form; names the period's worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StatementPeriod(String);

impl StatementPeriod {
    pub fn parse(s: &str) -> Result<Self, SplitError> {
        let s = s.trim();
        let invalid = || SplitError::Config(format!("Invalid statement date {}", s));
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = s[0..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[4..6].parse().map_err(|_| invalid())?;
        let day: u32 = s[6..8].parse().map_err(|_| invalid())?;
        if year == 0 || NaiveDate::from_ymd_opt(year, month, day).is_none() {
            return Err(invalid());
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
