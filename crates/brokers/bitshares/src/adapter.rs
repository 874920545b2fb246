use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dexbridge_core::*;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::balance::unify_balance;
use crate::client::BridgeHttp;
use crate::config::*;
use crate::credentials::*;
use crate::ohlcv::filter_candles;
use crate::protocol::{id_query, paths, window_query, Endpoint, OrderBody};
use crate::session::Session;

const NO_QUERY: &[(&str, &str)] = &[];

/// Timeframes the bridge can serve. It currently only builds hourly candles.
const TIMEFRAMES: &[(&str, &str)] = &[("1h", "1h")];

/// Unified operations this adapter answers, as reported by `describe()`.
const CAPABILITIES: &[&str] = &[
    "fetchMarkets",
    "fetchTicker",
    "fetchOrderBook",
    "fetchTrades",
    "fetchOHLCV",
    "fetchBalance",
    "createOrder",
    "cancelOrder",
    "fetchOpenOrders",
    "signIn",
    "fetchCurrencies",
    "fetchTradingFees",
    "fetchTradingLimits",
    "fetchOrder",
    "fetchOrders",
    "fetchMyTrades",
    "editOrder",
];

/// BitShares DEX adapter.
///
/// Forwards unified exchange calls to the local BitShares bridge REST API
/// and normalizes what comes back. Private calls sign in lazily the first
/// time they run, using whatever credentials can be resolved.
pub struct BitsharesDex {
    options: BridgeOptions,
    api: ApiCredentials,
    env: Arc<dyn EnvSource>,
    http: BridgeHttp,
    session: Mutex<Session>,
}

impl BitsharesDex {
    pub const ID: &'static str = "bitshares-dex";
    pub const NAME: &'static str = "BitShares DEX (via local CCXT bridge)";

    pub fn new(options: BridgeOptions) -> Result<Self, ExchangeError> {
        Ok(Self {
            options,
            api: ApiCredentials::default(),
            env: Arc::new(ProcessEnv),
            http: BridgeHttp::new()?,
            session: Mutex::new(Session::default()),
        })
    }

    /// Set the unified `apiKey` (account name) and `secret` (key or password).
    pub fn with_api_credentials(mut self, api_key: Option<String>, secret: Option<String>) -> Self {
        self.api = ApiCredentials { api_key, secret };
        self
    }

    /// Read environment variables from `env` instead of the process.
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn options(&self) -> &BridgeOptions {
        &self.options
    }

    /// Options are re-read on every call, so edits apply to the next request.
    pub fn options_mut(&mut self) -> &mut BridgeOptions {
        &mut self.options
    }

    pub fn base_url(&self) -> String {
        resolve_base_url(&self.options, self.env.as_ref())
    }

    /// Snapshot of the current sign-in state.
    pub async fn session(&self) -> Session {
        self.session.lock().await.clone()
    }

    /// Sign in to the bridge with explicit credentials.
    pub async fn sign_in(&self, credentials: &LoginCredentials) -> Result<Value, ExchangeError> {
        let mut session = self.session.lock().await;
        self.login(&mut session, credentials).await
    }

    /// Sign in if not already signed in and credentials are available.
    ///
    /// Returns whether the session is authenticated afterwards. Missing
    /// credentials are not an error: the bridge will refuse private calls.
    async fn ensure_logged_in(&self) -> Result<bool, ExchangeError> {
        let mut session = self.session.lock().await;
        if session.is_authenticated() {
            return Ok(true);
        }
        match resolve_login(&self.options, &self.api, self.env.as_ref()) {
            Some(credentials) => {
                self.login(&mut session, &credentials).await?;
                Ok(true)
            }
            None => {
                debug!("No bridge credentials configured, skipping sign-in");
                Ok(false)
            }
        }
    }

    async fn login(
        &self,
        session: &mut Session,
        credentials: &LoginCredentials,
    ) -> Result<Value, ExchangeError> {
        let base = self.base_url();
        let response: Value = self
            .http
            .post(&base, paths::LOGIN, credentials)
            .await
            .map_err(|e| match e {
                TransportError::Status { .. } => {
                    warn!(account = %credentials.account, error = %e, "Bridge rejected sign-in");
                    ExchangeError::AuthenticationFailed(e)
                }
                other => ExchangeError::Transport(other),
            })?;
        session.mark_authenticated(&credentials.account);
        info!(account = %credentials.account, "Signed in to BitShares bridge");
        Ok(response)
    }

    async fn get<'e, T, Q>(
        &self,
        endpoint: impl Into<Endpoint<'e>> + Send,
        query: &Q,
    ) -> Result<T, ExchangeError>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + Sync + ?Sized,
    {
        Ok(self.http.get(&self.base_url(), endpoint, query).await?)
    }

    /// The order has already reached the venue by the time this runs, so an
    /// unexpected record shape must not turn into an error.
    fn placed_order(raw: Value) -> Option<Order> {
        match raw {
            Value::Null => {
                warn!("Bridge accepted the order but returned no order record");
                None
            }
            raw => Some(serde_json::from_value(raw.clone()).unwrap_or_else(|e| {
                warn!(error = %e, "Unrecognized order record from bridge, keeping it raw");
                Order {
                    info: raw,
                    ..Default::default()
                }
            })),
        }
    }

    fn require_limit(request: &OrderRequest) -> Result<(), ExchangeError> {
        if request.order_type != OrderType::Limit {
            return Err(ExchangeError::NotSupported(format!(
                "Only limit orders are supported by the BitShares DEX bridge (got {})",
                request.order_type.as_str()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Exchange for BitsharesDex {
    fn describe(&self) -> ExchangeDescription {
        let base = self.base_url();
        let has: BTreeMap<String, bool> = CAPABILITIES
            .iter()
            .map(|op| (op.to_string(), true))
            .collect();
        let timeframes = TIMEFRAMES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut options = Map::new();
        options.insert("baseUrl".to_string(), json!(base));

        ExchangeDescription {
            id: Self::ID.to_string(),
            name: Self::NAME.to_string(),
            countries: vec!["XBS".to_string()],
            rate_limit: 200,
            pro: false,
            has,
            timeframes,
            urls: ExchangeUrls { api: base },
            options,
        }
    }

    async fn fetch_markets(&self) -> Result<Vec<Market>, ExchangeError> {
        self.get(paths::MARKETS, NO_QUERY).await
    }

    async fn fetch_ticker(&self, symbol: &str, params: &Params) -> Result<Ticker, ExchangeError> {
        self.get(paths::TICKER, &window_query(Some(symbol), None, None, params))
            .await
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<u32>,
        params: &Params,
    ) -> Result<OrderBook, ExchangeError> {
        self.get(paths::ORDER_BOOK, &window_query(Some(symbol), None, limit, params))
            .await
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        since: Option<i64>,
        limit: Option<u32>,
        params: &Params,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.get(paths::TRADES, &window_query(Some(symbol), since, limit, params))
            .await
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<u32>,
        params: &Params,
    ) -> Result<Vec<Candle>, ExchangeError> {
        if !TIMEFRAMES.iter().any(|(tf, _)| *tf == timeframe) {
            debug!(timeframe, "Bridge only serves 1h candles, timeframe ignored");
        }
        // since and limit are applied here, not by the bridge.
        let candles: Vec<Candle> = self
            .get(paths::OHLCV, &window_query(Some(symbol), None, None, params))
            .await?;
        Ok(filter_candles(candles, since, limit))
    }

    async fn fetch_balance(&self, account: Option<&str>) -> Result<Balances, ExchangeError> {
        // An explicit account means a public lookup is acceptable, so no sign-in attempt.
        let authenticated = match account {
            Some(_) => self.session.lock().await.is_authenticated(),
            None => self.ensure_logged_in().await?,
        };
        if authenticated {
            let raw: Value = self.get(paths::BALANCE, NO_QUERY).await?;
            return Ok(unify_balance(raw));
        }

        let account = resolve_public_account(account, &self.options, &self.api, self.env.as_ref())
            .ok_or_else(|| {
                ExchangeError::ArgumentsRequired(
                    "fetch_balance requires bridge credentials or an account for public balance"
                        .to_string(),
                )
            })?;
        let raw: Value = self
            .get(paths::BALANCE_PUBLIC, &[("account", account.as_str())])
            .await?;
        Ok(unify_balance(raw))
    }

    async fn fetch_open_orders(
        &self,
        _symbol: Option<&str>,
        params: &Params,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.ensure_logged_in().await?;
        self.get(paths::OPEN_ORDERS, &window_query(None, None, None, params))
            .await
    }

    async fn create_order(&self, request: OrderRequest) -> Result<Option<Order>, ExchangeError> {
        Self::require_limit(&request)?;
        self.ensure_logged_in().await?;
        let raw: Value = self
            .http
            .post(&self.base_url(), paths::ORDER, &OrderBody::from(&request))
            .await?;
        Ok(Self::placed_order(raw))
    }

    async fn cancel_order(
        &self,
        id: &str,
        _symbol: Option<&str>,
        params: &Params,
    ) -> Result<Value, ExchangeError> {
        self.ensure_logged_in().await?;
        let result = self
            .http
            .delete(&self.base_url(), paths::ORDER, &id_query(id, params))
            .await?;
        Ok(result)
    }

    async fn fetch_currencies(&self) -> Result<Value, ExchangeError> {
        self.get(paths::CURRENCIES, NO_QUERY).await
    }

    async fn fetch_trading_fees(&self) -> Result<Value, ExchangeError> {
        self.get(paths::TRADING_FEES, NO_QUERY).await
    }

    async fn fetch_trading_limits(&self, symbols: &[String]) -> Result<Value, ExchangeError> {
        if symbols.is_empty() {
            return self.get(paths::TRADING_LIMITS, NO_QUERY).await;
        }
        self.get(paths::TRADING_LIMITS, &[("symbols", symbols.join(","))])
            .await
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<Order, ExchangeError> {
        self.ensure_logged_in().await?;
        self.get(
            paths::order_by_id(id),
            &window_query(symbol, None, None, &Params::new()),
        )
        .await
    }

    async fn fetch_orders(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<Order>, ExchangeError> {
        self.ensure_logged_in().await?;
        self.get(paths::ORDERS, &window_query(symbol, since, limit, &Params::new()))
            .await
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<Trade>, ExchangeError> {
        self.ensure_logged_in().await?;
        self.get(paths::MY_TRADES, &window_query(symbol, since, limit, &Params::new()))
            .await
    }

    async fn edit_order(
        &self,
        id: &str,
        request: OrderRequest,
    ) -> Result<Option<Order>, ExchangeError> {
        Self::require_limit(&request)?;
        self.ensure_logged_in().await?;
        let raw: Value = self
            .http
            .put(&self.base_url(), paths::order_by_id(id), &OrderBody::from(&request))
            .await?;
        Ok(Self::placed_order(raw))
    }
}
