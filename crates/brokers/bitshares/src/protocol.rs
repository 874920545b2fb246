use std::collections::BTreeMap;

use dexbridge_core::{OrderRequest, OrderType, Params, Side, TransportError};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

/// Query string of one bridge call.
pub type Query = BTreeMap<String, String>;

/// REST paths exposed by the bridge.
pub mod paths {
    use super::Endpoint;

    pub const MARKETS: &str = "/markets";
    pub const TICKER: &str = "/ticker";
    pub const ORDER_BOOK: &str = "/orderbook";
    pub const TRADES: &str = "/trades";
    pub const OHLCV: &str = "/ohlcv";
    pub const LOGIN: &str = "/login";
    pub const BALANCE: &str = "/balance";
    pub const BALANCE_PUBLIC: &str = "/balancePublic";
    pub const OPEN_ORDERS: &str = "/openOrders";
    pub const ORDER: &str = "/order";
    pub const ORDERS: &str = "/orders";
    pub const MY_TRADES: &str = "/myTrades";
    pub const CURRENCIES: &str = "/currencies";
    pub const TRADING_FEES: &str = "/tradingFees";
    pub const TRADING_LIMITS: &str = "/tradingLimits";

    /// `/order/{id}`, used to fetch or replace a single order.
    pub fn order_by_id(id: &str) -> Endpoint<'_> {
        Endpoint {
            path: ORDER,
            id: Some(id),
        }
    }
}

/// A bridge path, optionally followed by one record id segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub path: &'static str,
    pub id: Option<&'a str>,
}

impl From<&'static str> for Endpoint<'_> {
    fn from(path: &'static str) -> Self {
        Self { path, id: None }
    }
}

impl Endpoint<'_> {
    /// Join onto `base`; the id is percent-encoded as a single path segment.
    pub fn url(&self, base: &str) -> Result<Url, TransportError> {
        let raw = format!("{base}{}", self.path);
        let invalid = |message: String| TransportError::InvalidUrl {
            url: raw.clone(),
            message,
        };
        let mut url = Url::parse(&raw).map_err(|e| invalid(e.to_string()))?;
        if let Some(id) = self.id {
            url.path_segments_mut()
                .map_err(|_| invalid("base URL cannot take a path".to_string()))?
                .push(id);
        }
        Ok(url)
    }
}

/// Body of `POST /order` and `PUT /order/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBody<'a> {
    pub symbol: &'a str,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: Side,
    pub amount: f64,
    pub price: Option<f64>,
    pub params: &'a Params,
}

impl<'a> From<&'a OrderRequest> for OrderBody<'a> {
    fn from(req: &'a OrderRequest) -> Self {
        Self {
            symbol: &req.symbol,
            order_type: req.order_type,
            side: req.side,
            amount: req.amount,
            price: req.price,
            params: &req.params,
        }
    }
}

/// Query for endpoints that take `symbol`, `since` and `limit`.
///
/// Caller `params` may replace the symbol; explicit `since` and `limit`
/// always win.
pub fn window_query(
    symbol: Option<&str>,
    since: Option<i64>,
    limit: Option<u32>,
    params: &Params,
) -> Query {
    let mut query = Query::new();
    if let Some(symbol) = symbol {
        query.insert("symbol".to_string(), symbol.to_string());
    }
    merge_params(&mut query, params);
    if let Some(since) = since {
        query.insert("since".to_string(), since.to_string());
    }
    if let Some(limit) = limit {
        query.insert("limit".to_string(), limit.to_string());
    }
    query
}

/// Query addressing one record by `id`, plus caller `params`.
pub fn id_query(id: &str, params: &Params) -> Query {
    let mut query = Query::from([("id".to_string(), id.to_string())]);
    merge_params(&mut query, params);
    query
}

fn merge_params(query: &mut Query, params: &Params) {
    for (key, value) in params {
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        query.insert(key.clone(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::LoginCredentials;
    use serde_json::json;

    #[test]
    fn test_order_body_shape() {
        let req = OrderRequest::limit("NESS/BTS", Side::Buy, 10.0, 0.25).with_param("fillOrKill", false);
        let body = serde_json::to_value(OrderBody::from(&req)).unwrap();
        assert_eq!(
            body,
            json!({
                "symbol": "NESS/BTS",
                "type": "limit",
                "side": "buy",
                "amount": 10.0,
                "price": 0.25,
                "params": {"fillOrKill": false}
            })
        );
    }

    #[test]
    fn test_login_body_shape() {
        let creds = LoginCredentials {
            account: "alice".into(),
            key_or_password: "5K...".into(),
            is_password: false,
            node: None,
        };
        assert_eq!(
            serde_json::to_value(&creds).unwrap(),
            json!({"account": "alice", "keyOrPassword": "5K...", "isPassword": false, "node": null})
        );
    }

    fn query(pairs: &[(&str, &str)]) -> Query {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_window_query_omits_unset() {
        assert_eq!(
            window_query(Some("NESS/BTS"), None, Some(5), &Params::new()),
            query(&[("symbol", "NESS/BTS"), ("limit", "5")])
        );
        assert!(window_query(None, None, None, &Params::new()).is_empty());
    }

    #[test]
    fn test_params_merge_order() {
        let mut params = Params::new();
        params.insert("symbol".into(), json!("OTHER/BTS"));
        params.insert("limit".into(), json!(99));
        params.insert("depth".into(), json!(3));
        params.insert("skip".into(), Value::Null);
        params.insert("raw".into(), json!(true));
        assert_eq!(
            window_query(Some("NESS/BTS"), None, Some(5), &params),
            query(&[("symbol", "OTHER/BTS"), ("limit", "5"), ("depth", "3"), ("raw", "true")])
        );
        assert_eq!(
            id_query("1.7.5", &params),
            query(&[
                ("id", "1.7.5"),
                ("symbol", "OTHER/BTS"),
                ("limit", "99"),
                ("depth", "3"),
                ("raw", "true")
            ])
        );
    }

    #[test]
    fn test_order_endpoint_encodes_id() {
        let base = "http://localhost:8787";
        assert_eq!(
            paths::order_by_id("1.7.42").url(base).unwrap().as_str(),
            "http://localhost:8787/order/1.7.42"
        );
        assert_eq!(
            paths::order_by_id("a/b?c#d").url(base).unwrap().as_str(),
            "http://localhost:8787/order/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            Endpoint::from(paths::MARKETS).url("http://host/api").unwrap().as_str(),
            "http://host/api/markets"
        );
        assert!(matches!(
            Endpoint::from(paths::MARKETS).url("not a url"),
            Err(TransportError::InvalidUrl { .. })
        ));
    }
}
