// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Splitting one transaction across allocation categories.
//!
//! Amounts are handled the way a card statement shows them: a purchase is a
//! positive amount owed, a payment or refund a negative one. Every allocation
//! must carry that same sign, so a $10 charge can never be split into $1000
//! and -$990.
//!
//! [`AllocationSession::step`] is a pure transition; [`Prompter`] is the thin
//! adapter that blocks on operator input.

use crate::error::SplitError;
use crate::models::{CategorySchema, Transaction};
use crate::utils::{pretty_table, round_cents};
use anyhow::Result;
use rust_decimal::Decimal;
use std::fmt;
use std::io::{BufRead, Write};

/// One line of operator input: `<category> [amount]`, `?` or `<category> ?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationInput {
    Blank,
    Help { category: Option<String> },
    Allocate { category: String, amount: Option<Decimal> },
    BadAmount { category: String, raw: String },
}

impl AllocationInput {
    /// Tokens after the second are ignored.
    pub fn parse(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let Some(first) = tokens.next() else {
            return AllocationInput::Blank;
        };
        if first == "?" {
            return AllocationInput::Help { category: None };
        }
        let category = first.to_string();
        match tokens.next() {
            None => AllocationInput::Allocate {
                category,
                amount: None,
            },
            Some("?") => AllocationInput::Help {
                category: Some(category),
            },
            Some(raw) => match raw.parse::<Decimal>() {
                Ok(amount) => AllocationInput::Allocate {
                    category,
                    amount: Some(amount),
                },
                Err(_) => AllocationInput::BadAmount {
                    category,
                    raw: raw.to_string(),
                },
            },
        }
    }
}

/// Why an input line left the session unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Blank,
    UnknownCategory(String),
    InvalidAmount(String),
    WrongSign(Decimal),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    Started,
    Applied {
        category: String,
        amount: Decimal,
        clamped: bool,
    },
    Help(Option<String>),
    Rejected(Rejection),
}

/// Finalized split of one transaction, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSet {
    keys: Vec<String>,
    amounts: Vec<Decimal>,
}

impl AllocationSet {
    /// Zero for unallocated or unknown categories.
    pub fn amount(&self, key: &str) -> Decimal {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|i| self.amounts[i])
            .unwrap_or(Decimal::ZERO)
    }

    pub fn allocated(&self) -> Vec<(&str, Decimal)> {
        self.keys
            .iter()
            .zip(self.amounts.iter())
            .filter(|(_, a)| !a.is_zero())
            .map(|(k, a)| (k.as_str(), *a))
            .collect()
    }

    pub fn sum(&self) -> Decimal {
        self.amounts.iter().copied().sum()
    }

    /// Trailing worksheet cells; unallocated categories are left blank.
    pub fn to_cells(&self) -> Vec<String> {
        self.amounts
            .iter()
            .map(|a| if a.is_zero() { String::new() } else { a.to_string() })
            .collect()
    }
}

impl fmt::Display for AllocationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .keys
            .iter()
            .zip(self.amounts.iter())
            .map(|(k, a)| format!("{}: {}", k, a))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// In-progress allocation of one amount owed.
#[derive(Debug, Clone)]
pub struct AllocationSession<'s> {
    schema: &'s CategorySchema,
    target: Decimal,
    remaining: Decimal,
    allocations: Vec<Decimal>,
}

#[derive(Debug)]
pub enum Transition<'s> {
    Pending(AllocationSession<'s>, Feedback),
    Complete(AllocationSet),
}

impl<'s> AllocationSession<'s> {
    /// Start allocating `amount_owed`. A zero amount completes immediately.
    pub fn begin(
        schema: &'s CategorySchema,
        amount_owed: Decimal,
    ) -> Result<Transition<'s>, SplitError> {
        let session = Self {
            schema,
            target: amount_owed,
            remaining: amount_owed,
            allocations: vec![Decimal::ZERO; schema.len()],
        };
        if session.remaining.is_zero() {
            return session.finish().map(Transition::Complete);
        }
        Ok(Transition::Pending(session, Feedback::Started))
    }

    pub fn remaining(&self) -> Decimal {
        self.remaining
    }

    pub fn target(&self) -> Decimal {
        self.target
    }

    fn negative(&self) -> bool {
        self.target < Decimal::ZERO
    }

    pub fn step(mut self, input: &AllocationInput) -> Result<Transition<'s>, SplitError> {
        let (category, amount) = match input {
            AllocationInput::Blank => return Ok(self.reject(Rejection::Blank)),
            AllocationInput::Help { category: None } => {
                return Ok(Transition::Pending(self, Feedback::Help(None)));
            }
            AllocationInput::Help {
                category: Some(category),
            } => {
                if self.schema.index_of(category).is_none() {
                    return Ok(self.reject(Rejection::UnknownCategory(category.clone())));
                }
                let category = category.clone();
                return Ok(Transition::Pending(self, Feedback::Help(Some(category))));
            }
            AllocationInput::BadAmount { category, raw } => {
                if self.schema.index_of(category).is_none() {
                    return Ok(self.reject(Rejection::UnknownCategory(category.clone())));
                }
                return Ok(self.reject(Rejection::InvalidAmount(raw.clone())));
            }
            AllocationInput::Allocate { category, amount } => (category, *amount),
        };

        let Some(index) = self.schema.index_of(category) else {
            return Ok(self.reject(Rejection::UnknownCategory(category.clone())));
        };

        let negative = self.negative();
        let mut clamped = false;
        let x = match amount {
            None => self.remaining,
            Some(requested) => {
                if (negative && requested > Decimal::ZERO)
                    || (!negative && requested < Decimal::ZERO)
                {
                    return Ok(self.reject(Rejection::WrongSign(requested)));
                }
                let mut x = round_cents(requested);
                if (negative && x < self.remaining) || (!negative && x > self.remaining) {
                    x = self.remaining;
                    clamped = true;
                }
                if x.is_zero() { Decimal::ZERO } else { x }
            }
        };

        let previous = self.allocations[index];
        self.remaining = round_cents(self.remaining + previous - x);
        self.allocations[index] = x;

        if self.remaining.is_zero() {
            return self.finish().map(Transition::Complete);
        }
        Ok(Transition::Pending(
            self,
            Feedback::Applied {
                category: category.clone(),
                amount: x,
                clamped,
            },
        ))
    }

    fn reject(self, why: Rejection) -> Transition<'s> {
        Transition::Pending(self, Feedback::Rejected(why))
    }

    /// Categories annotated with their current allocation, e.g. `[a(6), b, ?]`.
    pub fn paired_allocations(&self) -> String {
        let mut paired: Vec<String> = self
            .schema
            .keys()
            .zip(self.allocations.iter())
            .map(|(k, a)| if a.is_zero() { k.to_string() } else { format!("{}({})", k, a) })
            .collect();
        if self.schema.has_long_names() {
            paired.push("?".into());
        }
        format!("[{}]", paired.join(", "))
    }

    pub fn prompt(&self) -> String {
        format!(
            "Allocate Transaction {}[{}]: ",
            self.paired_allocations(),
            self.remaining
        )
    }

    fn finish(self) -> Result<AllocationSet, SplitError> {
        let set = AllocationSet {
            keys: self.schema.keys().map(str::to_string).collect(),
            amounts: self.allocations,
        };
        let negative = self.target < Decimal::ZERO;
        let sign_ok = set
            .amounts
            .iter()
            .all(|a| if negative { *a <= Decimal::ZERO } else { *a >= Decimal::ZERO });
        if !sign_ok || round_cents(set.sum()) != round_cents(self.target) {
            return Err(SplitError::AllocationInvariantViolation {
                allocations: set.to_string(),
                expected: self.target.to_string(),
            });
        }
        Ok(set)
    }
}

/// Blocking adapter that drives a session from a line-oriented reader.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    pub fn show_transaction(&mut self, tx: &Transaction) -> Result<()> {
        let rows = vec![
            vec!["TID".to_string(), tx.id.clone()],
            vec!["Date".to_string(), tx.posted_iso()],
            vec!["Type".to_string(), tx.kind.to_string()],
            vec!["Amount".to_string(), tx.amount.to_string()],
            vec!["Name".to_string(), tx.name.clone()],
            vec!["Memo".to_string(), tx.memo.clone()],
        ];
        writeln!(self.output, "{}", pretty_table(&["Field", "Value"], rows))?;
        Ok(())
    }

    fn show_help(&mut self, schema: &CategorySchema, key: Option<&str>) -> Result<()> {
        for c in schema.categories() {
            if key.is_some_and(|k| k != c.key) {
                continue;
            }
            if let Some(long) = &c.long_name {
                writeln!(self.output, "\t{}:\t{}", c.key, long)?;
            }
        }
        Ok(())
    }

    /// Allocate the amount owed on `tx`, re-prompting until it is fully split.
    pub fn allocate(&mut self, schema: &CategorySchema, tx: &Transaction) -> Result<AllocationSet> {
        let mut transition = AllocationSession::begin(schema, tx.inverted_amount())?;
        loop {
            let session = match transition {
                Transition::Complete(set) => return Ok(set),
                Transition::Pending(session, feedback) => {
                    match &feedback {
                        Feedback::Help(key) => self.show_help(schema, key.as_deref())?,
                        Feedback::Rejected(why) => log::debug!("input ignored: {:?}", why),
                        _ => {}
                    }
                    session
                }
            };

            write!(self.output, "{}", session.prompt())?;
            self.output.flush()?;
            let mut buf = Vec::new();
            if self.input.read_until(b'\n', &mut buf)? == 0 {
                return Err(SplitError::InputClosed.into());
            }
            // Undecodable bytes just fail to name a category and get re-prompted.
            let line = String::from_utf8_lossy(&buf);
            transition = session.step(&AllocationInput::parse(&line))?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn parses_category_only() {
        assert_eq!(
            AllocationInput::parse("  groceries \n"),
            AllocationInput::Allocate {
                category: "groceries".into(),
                amount: None
            }
        );
    }

    #[test]
    fn parses_category_and_amount() {
        assert_eq!(
            AllocationInput::parse("c 20.5 trailing words"),
            AllocationInput::Allocate {
                category: "c".into(),
                amount: Some(d("20.5"))
            }
        );
    }

    #[test]
    fn parses_help_forms() {
        assert_eq!(AllocationInput::parse("?"), AllocationInput::Help { category: None });
        assert_eq!(
            AllocationInput::parse("ap ?"),
            AllocationInput::Help {
                category: Some("ap".into())
            }
        );
    }

    #[test]
    fn parses_blank_and_bad_amount() {
        assert_eq!(AllocationInput::parse("   "), AllocationInput::Blank);
        assert_eq!(
            AllocationInput::parse("c twelve"),
            AllocationInput::BadAmount {
                category: "c".into(),
                raw: "twelve".into()
            }
        );
    }

    #[test]
    fn prompt_lists_allocated_amounts() {
        let schema = CategorySchema::from_keys(&["a", "b"]).unwrap();
        let Transition::Pending(session, _) = AllocationSession::begin(&schema, d("10")).unwrap()
        else {
            panic!("expected pending session");
        };
        let input = AllocationInput::parse("a 6");
        let Transition::Pending(session, _) = session.step(&input).unwrap() else {
            panic!("expected pending session");
        };
        assert_eq!(session.prompt(), "Allocate Transaction [a(6), b][4]: ");
    }
}
