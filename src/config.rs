// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Run configuration: command-line values first, then the JSON config file.

use crate::db::project_dirs;
use crate::error::SplitError;
use crate::models::{
    AccountIdentity, Category, CategorySchema, REQUIRED_ACCOUNT_TYPE, StatementPeriod,
};
use crate::utils::expand_home;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};

static BANK_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{9}$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Local,
    Sheets,
}

impl StoreKind {
    pub fn parse(s: &str) -> Result<Self, SplitError> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(StoreKind::Local),
            "sheets" => Ok(StoreKind::Sheets),
            other => Err(SplitError::Config(format!(
                "Unknown store '{}' (use local|sheets)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BankIdValue {
    Text(String),
    Number(u64),
}

impl BankIdValue {
    fn as_digits(&self) -> String {
        match self {
            BankIdValue::Text(s) => s.trim().to_string(),
            BankIdValue::Number(n) => format!("{:09}", n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileCategory {
    pub short: String,
    pub long: String,
}

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub credential_dir: Option<String>,
    pub bank_id: Option<BankIdValue>,
    pub document_id: Option<String>,
    pub alloc_columns: Option<Vec<FileCategory>>,
    pub store: Option<StoreKind>,
}

/// Values given on the command line; each one beats the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_file: Option<String>,
    pub credential_dir: Option<String>,
    pub bank_id: Option<String>,
    pub document_id: Option<String>,
    pub alloc_columns: Option<String>,
    pub import_file: Option<String>,
    pub statement_date: Option<String>,
    pub store: Option<String>,
}

impl Overrides {
    pub fn from_matches(m: &clap::ArgMatches) -> Self {
        let get = |id: &str| -> Option<String> {
            m.try_get_one::<String>(id)
                .ok()
                .flatten()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            config_file: get("config_file"),
            credential_dir: get("credential_dir"),
            bank_id: get("bank_id"),
            document_id: get("document_id"),
            alloc_columns: get("alloc_columns"),
            import_file: get("import_file"),
            statement_date: get("statement_date"),
            store: get("store"),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().ok().map(|p| p.config_dir().join("config.json"))
}

pub fn load_file_config(path: &Path) -> Result<FileConfig, SplitError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        SplitError::Config(format!("Invalid config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        SplitError::Config(format!("Invalid config file {}\n{}", path.display(), e))
    })
}

/// Nine-digit routing number passing the ABA checksum.
pub fn validate_bank_id(bank_id: &str) -> Result<String, SplitError> {
    let bank_id = bank_id.trim();
    let invalid = || SplitError::Config(format!("Invalid bank ID {}", bank_id));
    if !BANK_ID.is_match(bank_id) {
        return Err(invalid());
    }
    let checksum: u32 = bank_id
        .bytes()
        .zip([3u32, 7, 1].iter().cycle())
        .map(|(b, w)| w * u32::from(b - b'0'))
        .sum();
    if checksum % 10 != 0 {
        return Err(invalid());
    }
    Ok(bank_id.to_string())
}

/// Colon-delimited category keys, e.g. `groceries:fuel:misc`.
pub fn parse_alloc_columns(s: &str) -> Result<CategorySchema, SplitError> {
    let keys: Vec<&str> = s.split(':').map(str::trim).collect();
    CategorySchema::from_keys(&keys)
}

fn schema_from_file(cols: &[FileCategory]) -> Result<CategorySchema, SplitError> {
    CategorySchema::new(
        cols.iter()
            .map(|c| Category::new(c.short.trim(), Some(c.long.clone())))
            .collect(),
    )
}

/// Merged configuration; individual values are checked when a command asks for them.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    cli: Overrides,
    file: FileConfig,
}

impl Settings {
    /// Merge `cli` with the config file it names, or the default config file if present.
    pub fn load(cli: Overrides) -> Result<Self, SplitError> {
        let file = match &cli.config_file {
            Some(path) => load_file_config(&expand_home(path))?,
            None => match default_config_path() {
                Some(p) if p.exists() => load_file_config(&p)?,
                _ => FileConfig::default(),
            },
        };
        Ok(Self { cli, file })
    }

    pub fn from_parts(cli: Overrides, file: FileConfig) -> Self {
        Self { cli, file }
    }

    pub fn period(&self) -> Result<StatementPeriod, SplitError> {
        let raw = self
            .cli
            .statement_date
            .as_deref()
            .ok_or_else(|| SplitError::Config("Statement date unknown!".into()))?;
        StatementPeriod::parse(raw)
    }

    pub fn import_file(&self) -> Result<PathBuf, SplitError> {
        let raw = self
            .cli
            .import_file
            .as_deref()
            .ok_or_else(|| SplitError::Config("OFX file unknown!".into()))?;
        let path = expand_home(raw);
        if !path.exists() {
            return Err(SplitError::Config(format!(
                "OFX file not found: {}",
                path.display()
            )));
        }
        Ok(path)
    }

    pub fn identity(&self) -> Result<AccountIdentity, SplitError> {
        let bank_id = match (&self.cli.bank_id, &self.file.bank_id) {
            (Some(b), _) => b.clone(),
            (None, Some(b)) => b.as_digits(),
            (None, None) => return Err(SplitError::Config("Bank ID unknown!".into())),
        };
        Ok(AccountIdentity {
            bank_id: validate_bank_id(&bank_id)?,
            account_type: REQUIRED_ACCOUNT_TYPE.to_string(),
        })
    }

    pub fn schema(&self) -> Result<CategorySchema, SplitError> {
        match (&self.cli.alloc_columns, &self.file.alloc_columns) {
            (Some(cols), _) => parse_alloc_columns(cols),
            (None, Some(cols)) => schema_from_file(cols),
            (None, None) => Err(SplitError::Config("Allocation columns unknown!".into())),
        }
    }

    pub fn document_id(&self) -> Option<String> {
        self.cli
            .document_id
            .clone()
            .or_else(|| self.file.document_id.clone())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn store_kind(&self) -> Result<StoreKind, SplitError> {
        match &self.cli.store {
            Some(s) => StoreKind::parse(s),
            None => Ok(self.file.store.unwrap_or_default()),
        }
    }

    pub fn credential_dir(&self) -> Result<PathBuf, SplitError> {
        let raw = self
            .cli
            .credential_dir
            .as_deref()
            .or(self.file.credential_dir.as_deref())
            .ok_or_else(|| SplitError::Config("Credential directory unknown!".into()))?;
        let path = expand_home(raw);
        if !path.is_dir() {
            return Err(SplitError::Config(format!(
                "Credential directory not found: {}",
                path.display()
            )));
        }
        Ok(path)
    }
}

/// Everything a categorization run needs, validated up front.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub import_file: PathBuf,
    pub period: StatementPeriod,
    pub schema: CategorySchema,
    pub identity: AccountIdentity,
    pub document_id: Option<String>,
    pub store: StoreKind,
    pub credential_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, SplitError> {
        let store = settings.store_kind()?;
        let credential_dir = match store {
            StoreKind::Sheets => Some(settings.credential_dir()?),
            StoreKind::Local => None,
        };
        Ok(Self {
            import_file: settings.import_file()?,
            period: settings.period()?,
            schema: settings.schema()?,
            identity: settings.identity()?,
            document_id: settings.document_id(),
            store,
            credential_dir,
        })
    }
}
