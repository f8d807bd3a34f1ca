// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{RunConfig, StoreKind};
use crate::models::{CategorySchema, StatementPeriod};
use crate::store::sheets::SheetsStore;
use crate::store::sqlite::LocalStore;
use crate::store::{Container, TabularStore};
use anyhow::{Context, Result};
use std::path::Path;

/// State shared by every stage of one run: the configuration, the store and,
/// once opened, the workbook being written.
pub struct RunContext<'a> {
    pub config: &'a RunConfig,
    pub store: &'a dyn TabularStore,
    pub container: Option<Container>,
}

impl<'a> RunContext<'a> {
    pub fn new(config: &'a RunConfig, store: &'a dyn TabularStore) -> Self {
        Self {
            config,
            store,
            container: None,
        }
    }

    pub fn period(&self) -> &StatementPeriod {
        &self.config.period
    }

    pub fn schema(&self) -> &CategorySchema {
        &self.config.schema
    }

    /// Id of the opened workbook.
    pub fn container_id(&self) -> Result<&str> {
        self.container
            .as_ref()
            .map(|c| c.id.as_str())
            .context("Workbook not opened yet")
    }
}

/// Open the store backend selected by `kind`.
pub fn open_store(kind: StoreKind, credential_dir: Option<&Path>) -> Result<Box<dyn TabularStore>> {
    match kind {
        StoreKind::Local => Ok(Box::new(LocalStore::open_default()?)),
        StoreKind::Sheets => {
            let dir = credential_dir.context("Credential directory unknown!")?;
            Ok(Box::new(SheetsStore::from_credential_dir(dir)?))
        }
    }
}
