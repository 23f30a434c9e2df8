use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::quote::{normalize_symbol, StockQuote, StockSearchResult};
use super::traits::QuoteProvider;

const BASE_URL: &str = "https://api.twelvedata.com";
const PROVIDER: &str = "Twelve Data";

/// Twelve Data API provider for equity quotes and symbol search.
///
/// - **Requires**: API key (stored in the credential vault).
/// - **Coverage**: global equities, ETFs and funds, including LSE listings.
/// - **Batching**: `/quote` accepts a comma-separated symbol list.
///
/// Numeric fields come back as JSON strings; missing ones are read as 0.
pub struct TwelveDataProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TwelveDataProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key: api_key.into(),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the provider at a different host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value, CoreError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(format!(
                "/{endpoint} returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| api_error(format!("Failed to parse /{endpoint} response: {e}")))
    }

    /// Parse a single `/quote` payload.
    ///
    /// `close` is preferred over `price`. A payload with `"status": "error"`
    /// becomes an API error carrying the provider's message.
    pub fn parse_quote(payload: &Value, exchange: Option<&str>) -> Result<StockQuote, CoreError> {
        if payload.get("status").and_then(Value::as_str) == Some("error") {
            let message = payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Failed to get quote");
            return Err(api_error(message.to_string()));
        }

        let symbol = text_field(payload, "symbol")
            .ok_or_else(|| api_error("Quote payload has no symbol".into()))?;

        let price = number_field(payload, "close")
            .or_else(|| number_field(payload, "price"))
            .ok_or_else(|| api_error(format!("Quote for {symbol} has no price")))?;

        Ok(StockQuote {
            name: text_field(payload, "name").unwrap_or_default(),
            price,
            change: number_field(payload, "change").unwrap_or(0.0),
            change_percent: number_field(payload, "percent_change").unwrap_or(0.0),
            open: number_field(payload, "open").unwrap_or(0.0),
            high: number_field(payload, "high").unwrap_or(0.0),
            low: number_field(payload, "low").unwrap_or(0.0),
            previous_close: number_field(payload, "previous_close").unwrap_or(0.0),
            volume: number_field(payload, "volume").unwrap_or(0.0),
            exchange: text_field(payload, "exchange")
                .or_else(|| exchange.map(str::to_string))
                .unwrap_or_default(),
            timestamp: text_field(payload, "datetime")
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
            symbol,
        })
    }

    /// Parse a batch `/quote` payload, keyed by uppercased symbol.
    ///
    /// Accepts a single quote object, an array of quotes, or an object keyed
    /// by symbol. Entries that fail to parse are skipped.
    pub fn parse_quotes(payload: &Value) -> HashMap<String, StockQuote> {
        let items: Vec<&Value> = match payload {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) if map.contains_key("symbol") || map.contains_key("status") => {
                vec![payload]
            }
            Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        };

        items
            .into_iter()
            .filter_map(|item| Self::parse_quote(item, None).ok())
            .map(|quote| (normalize_symbol(&quote.symbol), quote))
            .collect()
    }

    /// Parse a `/symbol_search` payload.
    pub fn parse_search(payload: Value) -> Result<Vec<StockSearchResult>, CoreError> {
        let response: SearchResponse = serde_json::from_value(payload)?;
        Ok(response
            .data
            .into_iter()
            .map(|item| StockSearchResult {
                symbol: item.symbol,
                name: item.instrument_name,
                exchange: item.exchange,
                instrument_type: item.instrument_type,
                currency: item.currency,
            })
            .collect())
    }
}

// ── Twelve Data API response types ──────────────────────────────────

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    symbol: String,
    #[serde(default)]
    instrument_name: String,
    #[serde(default)]
    exchange: String,
    #[serde(default)]
    instrument_type: String,
    #[serde(default)]
    currency: String,
}

fn api_error(message: String) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message,
    }
}

fn text_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers arrive as strings ("123.45") or, occasionally, as JSON numbers.
fn number_field(payload: &Value, key: &str) -> Option<f64> {
    match payload.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl QuoteProvider for TwelveDataProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_quote(
        &self,
        symbol: &str,
        exchange: Option<&str>,
    ) -> Result<StockQuote, CoreError> {
        let symbol = normalize_symbol(symbol);
        let mut params = vec![("symbol", symbol.as_str())];
        if let Some(exchange) = exchange {
            params.push(("exchange", exchange));
        }
        let payload = self.get_json("quote", &params).await?;
        Self::parse_quote(&payload, exchange)
    }

    async fn get_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, StockQuote>, CoreError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = symbols
            .iter()
            .map(|s| normalize_symbol(s))
            .collect::<Vec<_>>()
            .join(",");
        let payload = self.get_json("quote", &[("symbol", joined.as_str())]).await?;
        // Request-level failures (bad key, rate limit) come back as one error object
        if payload.get("status").and_then(Value::as_str) == Some("error") {
            return Self::parse_quote(&payload, None).map(|q| HashMap::from([(q.symbol.clone(), q)]));
        }
        Ok(Self::parse_quotes(&payload))
    }

    async fn search(
        &self,
        query: &str,
        exchange: Option<&str>,
    ) -> Result<Vec<StockSearchResult>, CoreError> {
        let mut params = vec![("symbol", query)];
        if let Some(exchange) = exchange {
            params.push(("exchange", exchange));
        }
        let payload = self.get_json("symbol_search", &params).await?;
        Self::parse_search(payload)
    }
}
