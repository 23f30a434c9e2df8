use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use log::{debug, info, warn};
use reqwest::{Client, Response};
use serde_json::{json, Value};
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;
use uuid::Uuid;

use super::traits::LedgerSource;
use crate::errors::CoreError;
use crate::models::quote::{normalize_symbol, PriceSnapshot};
use crate::models::transaction::{Transaction, TransactionType};
use crate::models::watchlist::WatchlistItem;
use crate::session::Session;

const BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const PROVIDER: &str = "Google Sheets";

/// Data rows of each sheet (row 1 holds the headers).
pub const TRANSACTIONS_RANGE: &str = "Transactions!A2:J";
pub const WATCHLIST_RANGE: &str = "Watchlist!A2:E";
pub const PRICE_HISTORY_RANGE: &str = "PriceHistory!A2:H";

const TRANSACTIONS_APPEND: &str = "Transactions!A:J";
const WATCHLIST_APPEND: &str = "Watchlist!A:E";
const PRICE_HISTORY_APPEND: &str = "PriceHistory!A:H";

const SHEET_HEADERS: [(&str, &[&str]); 3] = [
    (
        "Transactions!A1:J1",
        &[
            "ID",
            "Symbol",
            "Name",
            "Type",
            "Quantity",
            "Price Per Share",
            "Total Cost",
            "Date",
            "Exchange",
            "Notes",
        ],
    ),
    (
        "Watchlist!A1:E1",
        &["Symbol", "Name", "Date Added", "Price When Added", "Exchange"],
    ),
    (
        "PriceHistory!A1:H1",
        &["Symbol", "Date", "Price", "Open", "High", "Low", "Close", "Volume"],
    ),
];

/// Transaction log, watchlist and price history kept in a Google spreadsheet.
///
/// - **Requires**: API key and spreadsheet id (both stored in the credential vault).
/// - **Layout**: one sheet per record type, headers in row 1, one record per row.
///
/// Rows are read with `UNFORMATTED_VALUE`, so numbers usually arrive as JSON
/// numbers; text cells holding numbers are accepted too. Rows that cannot be
/// parsed are logged and skipped, blank rows are ignored.
pub struct GoogleSheetsLedger {
    client: Client,
    api_key: String,
    spreadsheet_id: String,
    base_url: String,
}

impl GoogleSheetsLedger {
    pub fn new(api_key: impl Into<String>, spreadsheet_id: impl Into<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key: api_key.into(),
            spreadsheet_id: spreadsheet_id.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Build the ledger client from an unlocked session.
    pub fn from_session(session: &Session) -> Result<Self, CoreError> {
        let keys = session.api_keys()?;
        Ok(Self::new(
            keys.google_sheets_api_key.clone(),
            keys.google_sheet_id.clone(),
        ))
    }

    /// Point the client at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    // ── HTTP ────────────────────────────────────────────────────────

    fn values_url(&self, range: &str) -> String {
        format!("{}/{}/values/{range}", self.base_url, self.spreadsheet_id)
    }

    async fn read_range(&self, range: &str) -> Result<Value, CoreError> {
        let response = self
            .client
            .get(self.values_url(range))
            .query(&[
                ("valueRenderOption", "UNFORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response, &format!("read {range}")).await?;

        response
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse {range}: {e}")))
    }

    async fn append_rows(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<(), CoreError> {
        let response = self
            .client
            .post(format!("{}:append", self.values_url(range)))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
                ("key", self.api_key.as_str()),
            ])
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        check_status(response, &format!("append to {range}")).await?;
        Ok(())
    }

    async fn update_range(&self, range: &str, rows: Vec<Vec<Value>>) -> Result<(), CoreError> {
        let response = self
            .client
            .put(self.values_url(range))
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("key", self.api_key.as_str()),
            ])
            .json(&json!({ "values": rows }))
            .send()
            .await?;
        check_status(response, &format!("update {range}")).await?;
        Ok(())
    }

    // ── Ledger operations ───────────────────────────────────────────

    /// Append a transaction to the log.
    pub async fn add_transaction(&self, transaction: &Transaction) -> Result<(), CoreError> {
        self.append_rows(TRANSACTIONS_APPEND, vec![Self::transaction_row(transaction)])
            .await?;
        debug!("Appended {} {}", transaction.transaction_type, transaction.symbol);
        Ok(())
    }

    pub async fn add_to_watchlist(&self, item: &WatchlistItem) -> Result<(), CoreError> {
        self.append_rows(WATCHLIST_APPEND, vec![Self::watchlist_row(item)])
            .await
    }

    /// Clear the first watchlist row for `symbol`. Returns whether one was found.
    ///
    /// The row is blanked rather than deleted, so later row numbers do not move.
    pub async fn remove_from_watchlist(&self, symbol: &str) -> Result<bool, CoreError> {
        let payload = self.read_range(WATCHLIST_RANGE).await?;
        let Some(row_number) = Self::watchlist_row_number(&payload, symbol) else {
            return Ok(false);
        };
        let range = format!("Watchlist!A{row_number}:E{row_number}");
        self.update_range(&range, vec![vec![json!(""); 5]]).await?;
        debug!("Cleared watchlist row {row_number} ({symbol})");
        Ok(true)
    }

    pub async fn save_price_snapshot(&self, snapshot: &PriceSnapshot) -> Result<(), CoreError> {
        self.append_rows(PRICE_HISTORY_APPEND, vec![Self::price_snapshot_row(snapshot)])
            .await
    }

    /// The most recent `limit` snapshots for `symbol`, oldest first.
    pub async fn get_price_history(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<Vec<PriceSnapshot>, CoreError> {
        let payload = self.read_range(PRICE_HISTORY_RANGE).await?;
        Ok(Self::parse_price_history(&payload, symbol, limit))
    }

    /// Write the header row of every sheet that cannot be read or has none.
    pub async fn initialize_sheets(&self) -> Result<(), CoreError> {
        for (range, headers) in SHEET_HEADERS {
            let has_header = match self.read_range(range).await {
                Ok(payload) => !rows(&payload).is_empty(),
                Err(_) => false,
            };
            if !has_header {
                let row = headers.iter().map(|h| json!(h)).collect();
                self.update_range(range, vec![row]).await?;
                info!("Initialized sheet header {range}");
            }
        }
        Ok(())
    }

    // ── Row parsing ─────────────────────────────────────────────────

    /// Parse one Transactions row. `row_number` is the sheet row (for messages
    /// and for ids of rows that carry none).
    ///
    /// Ids that are not UUIDs map to a stable name-based UUID.
    /// A missing total cost is taken as `quantity * price_per_share`.
    pub fn parse_transaction_row(row: &[Value], row_number: usize) -> Result<Transaction, CoreError> {
        let missing =
            |field: &str| CoreError::InvalidFormat(format!("Transactions row {row_number}: missing {field}"));

        let id = match cell_text(row, 0) {
            Some(raw) => Uuid::parse_str(&raw)
                .unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes())),
            None => Uuid::new_v5(
                &Uuid::NAMESPACE_OID,
                format!("Transactions row {row_number}").as_bytes(),
            ),
        };
        let symbol = cell_text(row, 1).ok_or_else(|| missing("symbol"))?;
        let transaction_type = match cell_text(row, 3).map(|t| t.to_uppercase()).as_deref() {
            Some("BUY") => TransactionType::Buy,
            Some("SELL") => TransactionType::Sell,
            Some(other) => {
                return Err(CoreError::InvalidFormat(format!(
                    "Transactions row {row_number}: unknown type {other}"
                )))
            }
            None => return Err(missing("type")),
        };
        let quantity = cell_number(row, 4).ok_or_else(|| missing("quantity"))?;
        let price_per_share = cell_number(row, 5).ok_or_else(|| missing("price per share"))?;
        let total_cost = cell_number(row, 6).unwrap_or(quantity * price_per_share);
        let date = cell_date(row, 7).ok_or_else(|| missing("date"))?;

        Ok(Transaction {
            id,
            symbol: normalize_symbol(&symbol),
            name: cell_text(row, 2).unwrap_or_default(),
            transaction_type,
            quantity,
            price_per_share,
            total_cost,
            date,
            exchange: cell_text(row, 8).unwrap_or_default(),
            notes: cell_text(row, 9),
        })
    }

    /// Every parseable transaction in a `values` response, in sheet order.
    pub fn parse_transactions(payload: &Value) -> Vec<Transaction> {
        parse_rows(payload, "Transactions", Self::parse_transaction_row)
    }

    /// Parse one Watchlist row. Derived fields start at zero.
    pub fn parse_watchlist_row(row: &[Value], row_number: usize) -> Result<WatchlistItem, CoreError> {
        let missing =
            |field: &str| CoreError::InvalidFormat(format!("Watchlist row {row_number}: missing {field}"));

        let symbol = cell_text(row, 0).ok_or_else(|| missing("symbol"))?;
        let date_added = cell_date(row, 2).ok_or_else(|| missing("date added"))?;
        let price_when_added = cell_number(row, 3).ok_or_else(|| missing("price when added"))?;

        Ok(WatchlistItem::new(
            symbol,
            cell_text(row, 1).unwrap_or_default(),
            date_added,
            price_when_added,
            cell_text(row, 4).unwrap_or_default(),
        ))
    }

    pub fn parse_watchlist(payload: &Value) -> Vec<WatchlistItem> {
        parse_rows(payload, "Watchlist", Self::parse_watchlist_row)
    }

    /// Sheet row number of the first watchlist row for `symbol`.
    pub fn watchlist_row_number(payload: &Value, symbol: &str) -> Option<usize> {
        let wanted = normalize_symbol(symbol);
        rows(payload)
            .iter()
            .position(|row| {
                row.as_array()
                    .and_then(|cells| cell_text(cells, 0))
                    .is_some_and(|s| normalize_symbol(&s) == wanted)
            })
            .map(|index| index + 2)
    }

    pub fn parse_price_snapshot_row(row: &[Value], row_number: usize) -> Result<PriceSnapshot, CoreError> {
        let missing =
            |field: &str| CoreError::InvalidFormat(format!("PriceHistory row {row_number}: missing {field}"));

        Ok(PriceSnapshot {
            symbol: normalize_symbol(&cell_text(row, 0).ok_or_else(|| missing("symbol"))?),
            date: cell_date(row, 1).ok_or_else(|| missing("date"))?,
            price: cell_number(row, 2).ok_or_else(|| missing("price"))?,
            open: cell_number(row, 3),
            high: cell_number(row, 4),
            low: cell_number(row, 5),
            close: cell_number(row, 6),
            volume: cell_number(row, 7),
        })
    }

    /// The last `limit` snapshots for `symbol`, in sheet order.
    pub fn parse_price_history(payload: &Value, symbol: &str, limit: usize) -> Vec<PriceSnapshot> {
        let wanted = normalize_symbol(symbol);
        let matching: Vec<PriceSnapshot> =
            parse_rows(payload, "PriceHistory", Self::parse_price_snapshot_row)
                .into_iter()
                .filter(|s| s.symbol == wanted)
                .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).collect()
    }

    // ── Row writing ─────────────────────────────────────────────────

    pub fn transaction_row(transaction: &Transaction) -> Vec<Value> {
        vec![
            json!(transaction.id.to_string()),
            json!(transaction.symbol),
            json!(transaction.name),
            json!(transaction.transaction_type.to_string()),
            json!(transaction.quantity),
            json!(transaction.price_per_share),
            json!(transaction.total_cost),
            json!(transaction.date.format("%Y-%m-%d").to_string()),
            json!(transaction.exchange),
            json!(transaction.notes.clone().unwrap_or_default()),
        ]
    }

    pub fn watchlist_row(item: &WatchlistItem) -> Vec<Value> {
        vec![
            json!(item.symbol),
            json!(item.name),
            json!(item.date_added.format("%Y-%m-%d").to_string()),
            json!(item.price_when_added),
            json!(item.exchange),
        ]
    }

    /// Missing optional prices are written as empty cells.
    pub fn price_snapshot_row(snapshot: &PriceSnapshot) -> Vec<Value> {
        let optional = |v: Option<f64>| v.map_or_else(|| json!(""), |n| json!(n));
        vec![
            json!(snapshot.symbol),
            json!(snapshot.date.format("%Y-%m-%d").to_string()),
            json!(snapshot.price),
            optional(snapshot.open),
            optional(snapshot.high),
            optional(snapshot.low),
            optional(snapshot.close),
            optional(snapshot.volume),
        ]
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LedgerSource for GoogleSheetsLedger {
    async fn get_transactions(&self) -> Result<Vec<Transaction>, CoreError> {
        let payload = self.read_range(TRANSACTIONS_RANGE).await?;
        Ok(Self::parse_transactions(&payload))
    }

    async fn get_watchlist(&self) -> Result<Vec<WatchlistItem>, CoreError> {
        let payload = self.read_range(WATCHLIST_RANGE).await?;
        Ok(Self::parse_watchlist(&payload))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}

/// Turn a non-2xx response into an API error carrying Google's message.
async fn check_status(response: Response, action: &str) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    Err(api_error(format!("Failed to {action}: HTTP {}: {detail}", status.as_u16())))
}

/// The `values` array of a range response; absent when the range is empty.
fn rows(payload: &Value) -> &[Value] {
    payload
        .get("values")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn parse_rows<T>(
    payload: &Value,
    sheet: &str,
    parse: impl Fn(&[Value], usize) -> Result<T, CoreError>,
) -> Vec<T> {
    let mut parsed = Vec::new();
    for (index, row) in rows(payload).iter().enumerate() {
        let cells = row.as_array().map(Vec::as_slice).unwrap_or(&[]);
        if is_blank(cells) {
            continue;
        }
        match parse(cells, index + 2) {
            Ok(record) => parsed.push(record),
            Err(e) => warn!("Skipping {sheet} row: {e}"),
        }
    }
    debug!("Read {} {sheet} rows", parsed.len());
    parsed
}

fn is_blank(cells: &[Value]) -> bool {
    cells.iter().all(|cell| match cell {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

fn cell_text(row: &[Value], index: usize) -> Option<String> {
    match row.get(index)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts JSON numbers and text such as `"1,234.50"`.
fn cell_number(row: &[Value], index: usize) -> Option<f64> {
    match row.get(index)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps (watchlist rows written by
/// older clients carry the full time of adding).
fn cell_date(row: &[Value], index: usize) -> Option<NaiveDate> {
    let text = cell_text(row, index)?;
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(&text).ok().map(|d| d.date_naive()))
        .or_else(|| {
            text.get(..10)
                .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        })
}
