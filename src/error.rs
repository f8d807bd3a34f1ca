// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Failure classes surfaced by a categorization run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SplitError {
    /// Malformed or incomplete run configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The import file belongs to a different account than the one configured.
    #[error("Invalid {field}. Got {actual}, expected {expected}")]
    SchemaMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// A single imported record violates the statement conventions.
    #[error("Invalid transaction record {id}: {reason}")]
    InvalidRecord { id: String, reason: String },

    #[error(
        "Worksheet header appears to be invalid.\n\tGot Header:      {actual:?}\n\t\
         Expected Header: {expected:?}"
    )]
    HeaderMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Transaction incorrectly allocated {allocations} != {expected}")]
    AllocationInvariantViolation {
        allocations: String,
        expected: String,
    },

    /// Operator input ended before every transaction was allocated.
    #[error("Input closed before all transactions were allocated; nothing was written")]
    InputClosed,

    #[error("Store error: {0}")]
    Store(String),
}

impl SplitError {
    pub fn exit_code(&self) -> u8 {
        match self {
            SplitError::Config(_) => 2,
            SplitError::SchemaMismatch { .. } | SplitError::InvalidRecord { .. } => 3,
            SplitError::HeaderMismatch { .. } => 4,
            SplitError::Store(_) => 5,
            SplitError::InputClosed => 6,
            SplitError::AllocationInvariantViolation { .. } => 70,
        }
    }
}

/// Exit code for an arbitrary error chain; the first `SplitError` found wins.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|e| e.downcast_ref::<SplitError>())
        .map(SplitError::exit_code)
        .unwrap_or(1)
}
