use std::time::Duration;

use dexbridge_core::{ExchangeError, TransportError};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::protocol::Endpoint;

/// Timeout for GET and DELETE calls.
pub const READ_TIMEOUT: Duration = Duration::from_secs(20);
/// Timeout for POST and PUT calls.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin JSON-over-HTTP transport to the bridge.
///
/// One request per call, no retries. The base URL is passed in on every
/// call because the adapter re-resolves it each time.
#[derive(Debug, Clone)]
pub struct BridgeHttp {
    client: Client,
}

impl BridgeHttp {
    pub fn new() -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .user_agent(concat!("dexbridge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExchangeError::InvalidConfig(format!("HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub async fn get<'e, T, Q>(
        &self,
        base: &str,
        endpoint: impl Into<Endpoint<'e>> + Send,
        query: &Q,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let endpoint: Endpoint = endpoint.into();
        let url = endpoint.url(base)?;
        let req = self
            .client
            .request(Method::GET, url.clone())
            .query(query)
            .timeout(READ_TIMEOUT);
        self.execute(Method::GET, url.to_string(), req).await
    }

    pub async fn post<'e, T, B>(
        &self,
        base: &str,
        endpoint: impl Into<Endpoint<'e>> + Send,
        body: &B,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let endpoint: Endpoint = endpoint.into();
        let url = endpoint.url(base)?;
        let req = self
            .client
            .request(Method::POST, url.clone())
            .json(body)
            .timeout(WRITE_TIMEOUT);
        self.execute(Method::POST, url.to_string(), req).await
    }

    pub async fn put<'e, T, B>(
        &self,
        base: &str,
        endpoint: impl Into<Endpoint<'e>> + Send,
        body: &B,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let endpoint: Endpoint = endpoint.into();
        let url = endpoint.url(base)?;
        let req = self
            .client
            .request(Method::PUT, url.clone())
            .json(body)
            .timeout(WRITE_TIMEOUT);
        self.execute(Method::PUT, url.to_string(), req).await
    }

    pub async fn delete<'e, T, Q>(
        &self,
        base: &str,
        endpoint: impl Into<Endpoint<'e>> + Send,
        query: &Q,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let endpoint: Endpoint = endpoint.into();
        let url = endpoint.url(base)?;
        let req = self
            .client
            .request(Method::DELETE, url.clone())
            .query(query)
            .timeout(READ_TIMEOUT);
        self.execute(Method::DELETE, url.to_string(), req).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        req: RequestBuilder,
    ) -> Result<T, TransportError> {
        let response = req.send().await.map_err(|e| network_error(&url, e))?;
        let status = response.status();
        debug!(method = %method, url = %url, status = status.as_u16(), "Bridge response");

        let body = response.text().await.map_err(|e| network_error(&url, e))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        // An empty 2xx body decodes as JSON null.
        let text = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(text).map_err(|e| TransportError::Decode {
            url,
            message: e.to_string(),
        })
    }
}

fn network_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Network(e.to_string())
    }
}
