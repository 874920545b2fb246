use crate::models::*;
use async_trait::async_trait;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures talking to a venue over HTTP.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP {status} from {url}: {body}")]
    Status { status: u16, url: String, body: String },
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid request URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
    #[error("Could not decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    /// HTTP status code, if the venue answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Errors surfaced by unified exchange operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExchangeError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// The call needs credentials or an explicit argument the caller did not supply.
    #[error("Arguments required: {0}")]
    ArgumentsRequired(String),
    #[error("Not supported: {0}")]
    NotSupported(String),
    /// The venue rejected the supplied credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(TransportError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// ---------------------------------------------------------------------------
// Exchange Trait
// ---------------------------------------------------------------------------

/// The unified exchange interface trading frameworks program against.
///
/// Required methods cover the core market-data and trading surface. The
/// remaining operations default to [`ExchangeError::NotSupported`]; check
/// [`ExchangeDescription::has`] before calling them.
///
/// `params` are venue-specific extras merged into the request's query
/// string. They may override the symbol but never `since` or `limit`.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Static capability description.
    fn describe(&self) -> ExchangeDescription;

    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError>;

    async fn fetch_ticker(&self, symbol: &str, params: &Params) -> Result<Ticker, ExchangeError>;

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<u32>,
        params: &Params,
    ) -> Result<OrderBook, ExchangeError>;

    /// `since` is milliseconds since the Unix epoch.
    async fn fetch_trades(
        &self,
        symbol: &str,
        since: Option<i64>,
        limit: Option<u32>,
        params: &Params,
    ) -> Result<Vec<Trade>, ExchangeError>;

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<u32>,
        params: &Params,
    ) -> Result<Vec<Candle>, ExchangeError>;

    /// Balance of the signed-in account, or of `account` when given.
    async fn fetch_balance(&self, account: Option<&str>) -> Result<Balances, ExchangeError>;

    async fn fetch_open_orders(
        &self,
        symbol: Option<&str>,
        params: &Params,
    ) -> Result<Vec<Order>, ExchangeError>;

    /// `Ok(None)` means the venue accepted the order but sent no record back.
    async fn create_order(&self, request: OrderRequest) -> Result<Option<Order>, ExchangeError>;

    async fn cancel_order(
        &self,
        id: &str,
        symbol: Option<&str>,
        params: &Params,
    ) -> Result<Value, ExchangeError>;

    async fn fetch_currencies(&self) -> Result<Value, ExchangeError> {
        Err(not_supported("fetchCurrencies"))
    }

    async fn fetch_trading_fees(&self) -> Result<Value, ExchangeError> {
        Err(not_supported("fetchTradingFees"))
    }

    async fn fetch_trading_limits(&self, _symbols: &[String]) -> Result<Value, ExchangeError> {
        Err(not_supported("fetchTradingLimits"))
    }

    async fn fetch_order(&self, _id: &str, _symbol: Option<&str>) -> Result<Order, ExchangeError> {
        Err(not_supported("fetchOrder"))
    }

    async fn fetch_orders(
        &self,
        _symbol: Option<&str>,
        _since: Option<i64>,
        _limit: Option<u32>,
    ) -> Result<Vec<Order>, ExchangeError> {
        Err(not_supported("fetchOrders"))
    }

    async fn fetch_my_trades(
        &self,
        _symbol: Option<&str>,
        _since: Option<i64>,
        _limit: Option<u32>,
    ) -> Result<Vec<Trade>, ExchangeError> {
        Err(not_supported("fetchMyTrades"))
    }

    async fn edit_order(
        &self,
        _id: &str,
        _request: OrderRequest,
    ) -> Result<Option<Order>, ExchangeError> {
        Err(not_supported("editOrder"))
    }
}

fn not_supported(operation: &str) -> ExchangeError {
    ExchangeError::NotSupported(format!("{operation} is not implemented by this exchange"))
}
