use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keys the bridge returns that a typed record does not name explicitly.
pub type Extra = Map<String, Value>;

/// Venue-specific request extras, keyed by parameter name.
pub type Params = Map<String, Value>;

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// A tradeable market as listed by the venue (e.g. `NESS/BTS`).
///
/// Fields are lenient: whatever the venue omits stays `None`, and keys not
/// modelled here are kept in `extra` so callers see the full record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Market {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
    #[serde(default)]
    pub quote: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// Last-trade / best bid-ask snapshot for one market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub last: Option<f64>,
    #[serde(default)]
    pub bid: Option<f64>,
    #[serde(default)]
    pub ask: Option<f64>,
    #[serde(default)]
    pub base_volume: Option<f64>,
    #[serde(default)]
    pub quote_volume: Option<f64>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "opt_millis")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub info: Value,
    #[serde(flatten)]
    pub extra: Extra,
}

/// One `[price, amount]` level of an order book side.
///
/// Either slot may be missing when the venue could not parse it; extra
/// trailing elements (order counts and the like) are ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Value>", into = "(Option<f64>, Option<f64>)")]
pub struct PriceLevel {
    pub price: Option<f64>,
    pub amount: Option<f64>,
}

impl PriceLevel {
    pub fn new(price: f64, amount: f64) -> Self {
        Self {
            price: Some(price),
            amount: Some(amount),
        }
    }
}

impl From<Vec<Value>> for PriceLevel {
    fn from(row: Vec<Value>) -> Self {
        Self {
            price: row.first().and_then(number),
            amount: row.get(1).and_then(number),
        }
    }
}

impl From<PriceLevel> for (Option<f64>, Option<f64>) {
    fn from(level: PriceLevel) -> Self {
        (level.price, level.amount)
    }
}

/// Aggregated bids and asks for one market.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_millis")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub bids: Vec<PriceLevel>,
    #[serde(default)]
    pub asks: Vec<PriceLevel>,
    #[serde(default)]
    pub info: Value,
    #[serde(flatten)]
    pub extra: Extra,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<PriceLevel> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<PriceLevel> {
        self.asks.first().copied()
    }
}

/// A public trade print.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, deserialize_with = "opt_millis")]
    pub timestamp: Option<i64>,
    /// ISO-8601 rendering of `timestamp`.
    #[serde(default)]
    pub datetime: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub info: Value,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Wire form of a candle: `[timestamp, open, high, low, close, volume]`.
type CandleRow = (
    Option<i64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
);

/// A single OHLCV candle.
///
/// Serialized as the six-element array exchanges use on the wire. Slots the
/// venue left `null` stay `None` rather than failing the whole series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Value>", into = "CandleRow")]
pub struct Candle {
    /// Candle open time, milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl Candle {
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }
}

impl From<Vec<Value>> for Candle {
    fn from(row: Vec<Value>) -> Self {
        let slot = |i: usize| row.get(i).and_then(number);
        Self {
            timestamp: row.first().and_then(millis),
            open: slot(1),
            high: slot(2),
            low: slot(3),
            close: slot(4),
            volume: slot(5),
        }
    }
}

impl From<Candle> for CandleRow {
    fn from(c: Candle) -> Self {
        (c.timestamp, c.open, c.high, c.low, c.close, c.volume)
    }
}

// ---------------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------------

/// Unified account balance: three parallel maps keyed by asset code.
///
/// `info` carries the payload exactly as the venue returned it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub info: Value,
    pub free: BTreeMap<String, f64>,
    pub used: BTreeMap<String, f64>,
    pub total: BTreeMap<String, f64>,
}

impl Balances {
    pub fn new(info: Value) -> Self {
        Self {
            info,
            ..Default::default()
        }
    }

    /// Record all three quantities for one asset.
    pub fn insert(&mut self, asset: impl Into<String>, free: f64, used: f64, total: f64) {
        let asset = asset.into();
        self.free.insert(asset.clone(), free);
        self.used.insert(asset.clone(), used);
        self.total.insert(asset, total);
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty() && self.free.is_empty() && self.used.is_empty()
    }

    /// Asset codes present in any of the three maps, sorted.
    pub fn assets(&self) -> Vec<&str> {
        let mut assets: Vec<&str> = self
            .total
            .keys()
            .chain(self.free.keys())
            .chain(self.used.keys())
            .map(String::as_str)
            .collect();
        assets.sort_unstable();
        assets.dedup();
        assets
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(format!("unknown order side: {other}")),
        }
    }
}

/// The type of order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Market => "market",
            OrderType::Limit => "limit",
            OrderType::Stop => "stop",
            OrderType::StopLimit => "stop_limit",
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "market" => Ok(OrderType::Market),
            "limit" => Ok(OrderType::Limit),
            "stop" => Ok(OrderType::Stop),
            "stop_limit" | "stop-limit" => Ok(OrderType::StopLimit),
            other => Err(format!("unknown order type: {other}")),
        }
    }
}

/// Everything needed to place (or replace) an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    pub side: Side,
    pub amount: f64,
    pub price: Option<f64>,
    /// Venue-specific extras forwarded untouched.
    pub params: Params,
}

impl OrderRequest {
    /// Create a new limit order request.
    pub fn limit(symbol: &str, side: Side, amount: f64, price: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            order_type: OrderType::Limit,
            side,
            amount,
            price: Some(price),
            params: Map::new(),
        }
    }

    /// Create a new market order request.
    pub fn market(symbol: &str, side: Side, amount: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            order_type: OrderType::Market,
            side,
            amount,
            price: None,
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }
}

/// An order record as reported by the venue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default, rename = "type")]
    pub order_type: Option<String>,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub info: Value,
    #[serde(flatten)]
    pub extra: Extra,
}

// ---------------------------------------------------------------------------
// Exchange Description
// ---------------------------------------------------------------------------

/// Static self-description of an exchange adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeDescription {
    pub id: String,
    pub name: String,
    pub countries: Vec<String>,
    /// Minimum spacing between requests, in milliseconds.
    pub rate_limit: u64,
    pub pro: bool,
    /// Unified operation name (e.g. `fetchOHLCV`) to whether it is supported.
    pub has: BTreeMap<String, bool>,
    /// Unified timeframe to venue timeframe.
    pub timeframes: BTreeMap<String, String>,
    pub urls: ExchangeUrls,
    pub options: Map<String, Value>,
}

impl ExchangeDescription {
    pub fn supports(&self, operation: &str) -> bool {
        self.has.get(operation).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeUrls {
    pub api: String,
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Venues disagree on whether ids are strings or numbers; accept both.
fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Timestamps arrive as integers, floats or numeric strings depending on the venue.
fn opt_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(millis))
}

/// A finite number from a JSON number or numeric string.
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| number(value).map(|f| f.trunc() as i64)),
        _ => number(value).map(|f| f.trunc() as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_keeps_unknown_keys() {
        let m: Market = serde_json::from_value(json!({
            "id": "NESS_BTS",
            "symbol": "NESS/BTS",
            "base": "NESS",
            "quote": "BTS",
            "active": true,
            "spot": true
        }))
        .unwrap();
        assert_eq!(m.symbol.as_deref(), Some("NESS/BTS"));
        assert_eq!(m.active, Some(true));
        assert_eq!(m.extra.get("spot"), Some(&json!(true)));

        let back = serde_json::to_value(&m).unwrap();
        assert_eq!(back["spot"], json!(true));
        assert_eq!(back["id"], json!("NESS_BTS"));
    }

    #[test]
    fn test_numeric_trade_id() {
        let t: Trade = serde_json::from_value(json!({"id": 42, "price": 1.5})).unwrap();
        assert_eq!(t.id.as_deref(), Some("42"));
        assert_eq!(t.price, Some(1.5));
        assert!(t.side.is_none());
    }

    #[test]
    fn test_candle_wire_form() {
        let c: Candle = serde_json::from_value(json!([1700000000000i64, 1.0, 2.0, 0.5, 1.5, 100.0])).unwrap();
        assert_eq!(c.timestamp, Some(1_700_000_000_000));
        assert_eq!(c.close, Some(1.5));
        assert_eq!(
            serde_json::to_value(c).unwrap(),
            json!([1700000000000i64, 1.0, 2.0, 0.5, 1.5, 100.0])
        );
        assert_eq!(c.datetime().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_candle_with_null_slots() {
        let c: Candle = serde_json::from_value(json!([2000, 1, 1, 1, 1, null])).unwrap();
        assert_eq!(c.timestamp, Some(2000));
        assert_eq!(c.open, Some(1.0));
        assert_eq!(c.volume, None);
        assert_eq!(serde_json::to_value(c).unwrap(), json!([2000, 1.0, 1.0, 1.0, 1.0, null]));

        let c: Candle = serde_json::from_value(json!([null, "0.5", 1.0])).unwrap();
        assert!(c.timestamp.is_none());
        assert!(c.datetime().is_none());
        assert_eq!(c.open, Some(0.5));
        assert_eq!(c.low, None);
    }

    #[test]
    fn test_order_book_tolerates_null_levels_and_float_timestamp() {
        let book: OrderBook = serde_json::from_value(json!({
            "timestamp": 1700000000000.0,
            "bids": [[0.5, null], [0.4, 3.0, 2]],
            "asks": []
        }))
        .unwrap();
        assert_eq!(book.timestamp, Some(1_700_000_000_000));
        assert_eq!(book.best_bid(), Some(PriceLevel { price: Some(0.5), amount: None }));
        assert_eq!(book.bids[1], PriceLevel::new(0.4, 3.0));
        assert!(book.best_ask().is_none());
    }

    #[test]
    fn test_trade_timestamp_forms() {
        let t: Trade = serde_json::from_value(json!({"timestamp": "1700000000000"})).unwrap();
        assert_eq!(t.timestamp, Some(1_700_000_000_000));
        let t: Trade = serde_json::from_value(json!({"timestamp": null})).unwrap();
        assert!(t.timestamp.is_none());
    }

    #[test]
    fn test_ticker_camel_case() {
        let t: Ticker = serde_json::from_value(json!({
            "symbol": "NESS/BTS",
            "last": 0.1,
            "baseVolume": 12.0,
            "percentage": 3.2
        }))
        .unwrap();
        assert_eq!(t.base_volume, Some(12.0));
        assert_eq!(t.extra.get("percentage"), Some(&json!(3.2)));
    }

    #[test]
    fn test_order_type_parse() {
        assert_eq!("LIMIT".parse::<OrderType>().unwrap(), OrderType::Limit);
        assert_eq!("stop-limit".parse::<OrderType>().unwrap(), OrderType::StopLimit);
        assert!("iceberg".parse::<OrderType>().is_err());
        assert_eq!("Sell".parse::<Side>().unwrap(), Side::Sell);
    }

    #[test]
    fn test_balance_assets_dedup() {
        let mut b = Balances::new(Value::Null);
        b.insert("BTS", 1.0, 0.0, 1.0);
        b.free.insert("USD".into(), 2.0);
        assert_eq!(b.assets(), vec!["BTS", "USD"]);
        assert!(!b.is_empty());
    }
}
