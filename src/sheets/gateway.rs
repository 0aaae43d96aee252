// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Sheets gateway with typed table operations.
//!
//! Every call needs a bearer token from the [`TokenManager`], including
//! reads. The in-memory backend mirrors the remote contract for offline use.

use crate::error::{AppError, Result};
use crate::models::{Booking, Stay, User};
use crate::services::oauth::TokenManager;
use crate::sheets::{cell_to_string, col_to_letters, parse_rows, A1Range, SheetRecord, DEFAULT_RANGE};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Acknowledgement of a write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetAck {
    pub updated_range: String,
    pub updated_rows: u32,
}

#[derive(Clone)]
enum Backend {
    Remote {
        http: reqwest::Client,
        base_url: String,
    },
    Memory(Arc<RwLock<HashMap<String, Vec<Vec<String>>>>>),
}

/// Spreadsheet client.
#[derive(Clone)]
pub struct SheetsGateway {
    backend: Backend,
    tokens: Arc<TokenManager>,
}

impl SheetsGateway {
    /// Create a gateway for the given spreadsheet.
    pub fn new(spreadsheet_id: &str, tokens: Arc<TokenManager>) -> Self {
        Self {
            backend: Backend::Remote {
                http: reqwest::Client::new(),
                base_url: format!("{}/{}", SHEETS_API_BASE, spreadsheet_id),
            },
            tokens,
        }
    }

    /// Create an in-memory gateway for testing (offline mode).
    ///
    /// The Users, Stays and Bookings tables start with only their header row.
    pub fn new_mock(tokens: Arc<TokenManager>) -> Self {
        let mut sheets = HashMap::new();
        sheets.insert(User::SHEET.to_string(), vec![header::<User>()]);
        sheets.insert(Stay::SHEET.to_string(), vec![header::<Stay>()]);
        sheets.insert(Booking::SHEET.to_string(), vec![header::<Booking>()]);

        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(sheets))),
            tokens,
        }
    }

    /// Bearer token for the next call, or `AuthRequired`.
    async fn bearer(&self) -> Result<String> {
        self.tokens.get_token().await.map_err(|e| {
            tracing::warn!(error = %e, "No usable OAuth token for Sheets call");
            AppError::AuthRequired(e.to_string())
        })
    }

    // ─── Raw Operations ──────────────────────────────────────────

    /// Read `sheet!range` as rows of cell strings.
    pub async fn read(&self, sheet: &str, range: &str) -> Result<Vec<Vec<String>>> {
        let token = self.bearer().await?;
        tracing::debug!(sheet, range, "Reading sheet");

        match &self.backend {
            Backend::Remote { http, base_url } => {
                let url = format!(
                    "{}/values/{}",
                    base_url,
                    urlencoding::encode(&format!("{}!{}", sheet, range))
                );
                let response = http
                    .get(&url)
                    .bearer_auth(&token)
                    .send()
                    .await
                    .map_err(|e| AppError::Transport(e.to_string()))?;

                let body: ValueRange = check_response_json(response).await?;
                Ok(body
                    .values
                    .iter()
                    .map(|row| row.iter().map(cell_to_string).collect())
                    .collect())
            }
            Backend::Memory(sheets) => {
                let sheets = sheets.read().unwrap_or_else(|p| p.into_inner());
                let rows = sheets.get(sheet).ok_or_else(|| unknown_sheet(sheet))?;
                let range = A1Range::parse(range)
                    .ok_or_else(|| AppError::Transport(format!("Unable to parse range: {}", range)))?;
                Ok(slice_range(rows, &range))
            }
        }
    }

    /// Read the default range of a sheet.
    pub async fn read_all(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        self.read(sheet, DEFAULT_RANGE).await
    }

    /// Append one row after the last row of `sheet`.
    pub async fn append(&self, sheet: &str, row: Vec<Value>) -> Result<SheetAck> {
        let token = self.bearer().await?;
        tracing::debug!(sheet, cells = row.len(), "Appending row");

        match &self.backend {
            Backend::Remote { http, base_url } => {
                let url = format!(
                    "{}/values/{}:append",
                    base_url,
                    urlencoding::encode(&format!("{}!A1", sheet))
                );
                let response = http
                    .post(&url)
                    .bearer_auth(&token)
                    .query(&[("valueInputOption", "RAW")])
                    .json(&serde_json::json!({ "values": [row] }))
                    .send()
                    .await
                    .map_err(|e| AppError::Transport(e.to_string()))?;

                let body: AppendResponse = check_response_json(response).await?;
                Ok(body.updates.into())
            }
            Backend::Memory(sheets) => {
                let mut sheets = sheets.write().unwrap_or_else(|p| p.into_inner());
                let rows = sheets.get_mut(sheet).ok_or_else(|| unknown_sheet(sheet))?;
                let cells: Vec<String> = row.iter().map(cell_to_string).collect();
                let width = cells.len().max(1);
                rows.push(cells);
                let n = rows.len();
                Ok(SheetAck {
                    updated_range: format!("{}!A{}:{}{}", sheet, n, col_to_letters(width - 1), n),
                    updated_rows: 1,
                })
            }
        }
    }

    /// Overwrite the cells of `sheet!range` with `row`.
    pub async fn update(&self, sheet: &str, range: &str, row: Vec<Value>) -> Result<SheetAck> {
        let token = self.bearer().await?;
        tracing::debug!(sheet, range, "Updating row");

        match &self.backend {
            Backend::Remote { http, base_url } => {
                let url = format!(
                    "{}/values/{}",
                    base_url,
                    urlencoding::encode(&format!("{}!{}", sheet, range))
                );
                let response = http
                    .put(&url)
                    .bearer_auth(&token)
                    .query(&[("valueInputOption", "RAW")])
                    .json(&serde_json::json!({ "values": [row] }))
                    .send()
                    .await
                    .map_err(|e| AppError::Transport(e.to_string()))?;

                let body: UpdateResponse = check_response_json(response).await?;
                Ok(body.into())
            }
            Backend::Memory(sheets) => {
                let target = A1Range::parse(range)
                    .ok_or_else(|| AppError::Transport(format!("Unable to parse range: {}", range)))?;
                let mut sheets = sheets.write().unwrap_or_else(|p| p.into_inner());
                let rows = sheets.get_mut(sheet).ok_or_else(|| unknown_sheet(sheet))?;

                while rows.len() < target.start_row {
                    rows.push(Vec::new());
                }
                let dest = &mut rows[target.start_row - 1];
                for (offset, cell) in row.iter().enumerate() {
                    let col = target.start_col + offset;
                    if dest.len() <= col {
                        dest.resize(col + 1, String::new());
                    }
                    dest[col] = cell_to_string(cell);
                }

                Ok(SheetAck {
                    updated_range: format!("{}!{}", sheet, range),
                    updated_rows: 1,
                })
            }
        }
    }

    // ─── Typed Operations ────────────────────────────────────────

    /// Read and decode every row of `T`'s table.
    pub async fn fetch_records<T: SheetRecord>(&self) -> Result<Vec<T>> {
        let values = self.read_all(T::SHEET).await?;
        Ok(parse_rows(&values).iter().map(T::from_record).collect())
    }

    /// Append one record to `T`'s table.
    pub async fn append_record<T: SheetRecord>(&self, record: &T) -> Result<SheetAck> {
        self.append(T::SHEET, record.to_row()).await
    }
}

fn header<T: SheetRecord>() -> Vec<String> {
    T::COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn unknown_sheet(sheet: &str) -> AppError {
    AppError::Transport(format!("Unable to parse range: {}", sheet))
}

/// Rows and columns of `rows` inside `range`, without trailing empty cells.
fn slice_range(rows: &[Vec<String>], range: &A1Range) -> Vec<Vec<String>> {
    let first = range.start_row - 1;
    let last = range.end_row.unwrap_or(rows.len()).min(rows.len());

    rows.iter()
        .take(last)
        .skip(first)
        .map(|row| {
            let end = range
                .end_col
                .map(|c| (c + 1).min(row.len()))
                .unwrap_or(row.len());
            let mut cells: Vec<String> = row
                .get(range.start_col.min(end)..end)
                .map(|s| s.to_vec())
                .unwrap_or_default();
            while cells.last().is_some_and(|c| c.is_empty()) {
                cells.pop();
            }
            cells
        })
        .collect()
}

// ─── Wire Types ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UpdateResponse {
    #[serde(default)]
    updated_range: String,
    #[serde(default)]
    updated_rows: u32,
}

#[derive(Deserialize)]
struct AppendResponse {
    #[serde(default)]
    updates: UpdateResponse,
}

impl From<UpdateResponse> for SheetAck {
    fn from(r: UpdateResponse) -> Self {
        SheetAck {
            updated_range: r.updated_range,
            updated_rows: r.updated_rows,
        }
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Check response status and parse JSON, surfacing the API's error message.
async fn check_response_json<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Google Sheets API error".to_string());
        tracing::warn!(status = %status, message = %message, "Sheets API call failed");
        return Err(AppError::Transport(message));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))
}
