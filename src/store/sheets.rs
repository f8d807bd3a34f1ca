// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Google Sheets v4 backend over the blocking reqwest client.
//!
//! Authentication uses an authorized-user `token.json` in the credential
//! directory. When it carries a refresh token the access token is refreshed
//! once at start-up and written back.

use super::{CellRange, Container, TabularStore};
use crate::models::TRANSACTION_COLUMNS;
use crate::utils::http_client;
use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use reqwest::Url;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Number, Value, json};
use std::path::Path;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Deserialize)]
struct AuthorizedUser {
    #[serde(alias = "access_token")]
    token: Option<String>,
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

pub struct SheetsStore {
    http: Client,
    api_base: String,
    token: String,
}

fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(anyhow!("HTTP {}: {}", status.as_u16(), body.trim()))
}

/// Transaction cells go out as text so they read back unchanged for matching;
/// allocation cells go out as numbers so the sheet can total them.
fn row_values(row: &[String]) -> Vec<Value> {
    row.iter()
        .enumerate()
        .map(|(col, cell)| {
            if col < TRANSACTION_COLUMNS.len() || cell.is_empty() {
                return Value::String(cell.clone());
            }
            cell.parse::<Number>()
                .map(Value::Number)
                .unwrap_or_else(|_| Value::String(cell.clone()))
        })
        .collect()
}

impl SheetsStore {
    pub fn with_base_url(token: String, api_base: String) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Load `token.json` from `credential_dir`, refreshing it when possible.
    pub fn from_credential_dir(credential_dir: &Path) -> Result<Self> {
        let token_file = credential_dir.join("token.json");
        let raw = std::fs::read_to_string(&token_file).with_context(|| {
            format!(
                "Read {}; authorize this tool for the Sheets API and save the \
                 authorized-user token there",
                token_file.display()
            )
        })?;
        let user: AuthorizedUser = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid token file {}", token_file.display()))?;
        let http = http_client()?;

        let token = match (&user.refresh_token, &user.client_id, &user.client_secret) {
            (Some(refresh), Some(id), Some(secret)) => {
                let uri = user.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
                let resp = http
                    .post(uri)
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("refresh_token", refresh.as_str()),
                        ("client_id", id.as_str()),
                        ("client_secret", secret.as_str()),
                    ])
                    .send()
                    .context("Refresh Google access token")?;
                let refreshed: RefreshResponse = check(resp)?.json()?;
                let mut stored: Value = serde_json::from_str(&raw)?;
                stored["token"] = Value::String(refreshed.access_token.clone());
                std::fs::write(&token_file, serde_json::to_string_pretty(&stored)?)
                    .with_context(|| format!("Write {}", token_file.display()))?;
                info!("refreshed access token in {}", token_file.display());
                refreshed.access_token
            }
            _ => user
                .token
                .clone()
                .with_context(|| format!("No usable token in {}", token_file.display()))?,
        };

        Ok(Self {
            http,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .with_context(|| format!("Invalid Sheets API base '{}'", self.api_base))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("Sheets API base cannot carry a path"))?
            .extend(segments);
        Ok(url)
    }

    fn send(&self, req: RequestBuilder) -> Result<Value> {
        let resp = req.bearer_auth(&self.token).send()?;
        Ok(check(resp)?.json()?)
    }

    fn batch_update(&self, container: &str, requests: Value) -> Result<Value> {
        let url = self.url(&[&format!("{}:batchUpdate", container)])?;
        self.send(self.http.post(url).json(&json!({ "requests": requests })))
    }

    fn sheet_id(&self, container: &str, title: &str) -> Result<i64> {
        let meta = self.metadata(container)?;
        meta["sheets"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|s| s["properties"]["title"].as_str() == Some(title))
            .and_then(|s| s["properties"]["sheetId"].as_i64())
            .ok_or_else(|| anyhow!("Worksheet '{}' not found in {}", title, container))
    }

    fn metadata(&self, container: &str) -> Result<Value> {
        let mut url = self.url(&[container])?;
        url.query_pairs_mut()
            .append_pair("fields", "spreadsheetId,properties.title,sheets.properties");
        self.send(self.http.get(url))
    }

    fn values(&self, container: &str, range: &CellRange) -> Result<Vec<Vec<String>>> {
        let url = self.url(&[container, "values", &range.to_string()])?;
        let body = self.send(self.http.get(url))?;
        let rows = body["values"]
            .as_array()
            .map(|rows| {
                rows.iter()
                    .map(|row| {
                        row.as_array()
                            .into_iter()
                            .flatten()
                            .map(|cell| match cell {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(rows)
    }

    fn put_values(&self, container: &str, range: &CellRange, rows: &[Vec<Value>]) -> Result<Value> {
        let mut url = self.url(&[container, "values", &range.to_string()])?;
        // RAW keeps text cells exactly as sent; numbers stay numbers.
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        self.send(self.http.put(url).json(&json!({ "values": rows })))
    }
}

impl TabularStore for SheetsStore {
    fn create_container(&self, title: &str) -> Result<Container> {
        let url = self.url(&[])?;
        let body = self.send(
            self.http
                .post(url)
                .json(&json!({ "properties": { "title": title } })),
        )?;
        let id = body["spreadsheetId"]
            .as_str()
            .context("spreadsheetId missing from create response")?
            .to_string();
        debug!("created spreadsheet {}", id);
        self.get_container(&id)
    }

    fn get_container(&self, id: &str) -> Result<Container> {
        let meta = self.metadata(id)?;
        let worksheets = meta["sheets"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|s| s["properties"]["title"].as_str().map(str::to_string))
            .collect();
        Ok(Container {
            id: meta["spreadsheetId"].as_str().unwrap_or(id).to_string(),
            title: meta["properties"]["title"].as_str().unwrap_or_default().to_string(),
            worksheets,
        })
    }

    fn create_worksheet(&self, container: &str, title: &str) -> Result<()> {
        self.batch_update(
            container,
            json!([{ "addSheet": { "properties": { "title": title, "index": 0 } } }]),
        )?;
        Ok(())
    }

    fn rename_worksheet(&self, container: &str, old: &str, new: &str) -> Result<()> {
        let sheet_id = self.sheet_id(container, old)?;
        self.batch_update(
            container,
            json!([{
                "updateSheetProperties": {
                    "properties": { "sheetId": sheet_id, "title": new },
                    "fields": "title"
                }
            }]),
        )?;
        Ok(())
    }

    fn get_header(&self, container: &str, worksheet: &str) -> Result<Vec<String>> {
        let rows = self.values(container, &CellRange::header(worksheet))?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    fn set_header(&self, container: &str, worksheet: &str, columns: &[String]) -> Result<()> {
        let header = columns.iter().cloned().map(Value::String).collect();
        self.put_values(container, &CellRange::header(worksheet), &[header])?;
        Ok(())
    }

    fn get_rows(&self, container: &str, range: &CellRange) -> Result<Vec<Vec<String>>> {
        self.values(container, range)
    }

    fn append_rows(
        &self,
        container: &str,
        range: &CellRange,
        rows: &[Vec<String>],
    ) -> Result<usize> {
        let values: Vec<Vec<Value>> = rows.iter().map(|r| row_values(r)).collect();
        let body = self.put_values(container, range, &values)?;
        Ok(body["updatedCells"].as_u64().unwrap_or(0) as usize)
    }

    fn apply_presentation(
        &self,
        container: &str,
        worksheet: &str,
        amount_column: usize,
    ) -> Result<()> {
        let sheet_id = self.sheet_id(container, worksheet)?;
        self.batch_update(
            container,
            json!([
                {
                    "repeatCell": {
                        "range": {
                            "sheetId": sheet_id,
                            "startColumnIndex": amount_column,
                            "endColumnIndex": amount_column + 1
                        },
                        "cell": {
                            "userEnteredFormat": {
                                "numberFormat": { "type": "NUMBER", "pattern": "0.00" }
                            }
                        },
                        "fields": "userEnteredFormat.numberFormat"
                    }
                },
                {
                    "updateSheetProperties": {
                        "properties": {
                            "sheetId": sheet_id,
                            "gridProperties": { "frozenRowCount": 1 }
                        },
                        "fields": "gridProperties.frozenRowCount"
                    }
                }
            ]),
        )?;
        Ok(())
    }
}
