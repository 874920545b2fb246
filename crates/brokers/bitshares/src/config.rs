use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Bridge address used when neither an option nor the environment names one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8787";

pub const ENV_BRIDGE_URL: &str = "BITSHARES_CCXT_BRIDGE_URL";
pub const ENV_ACCOUNT: &str = "BTS_ACCOUNT";
pub const ENV_KEY_OR_PASSWORD: &str = "BTS_WIF";
pub const ENV_IS_PASSWORD: &str = "BTS_IS_PASSWORD";
pub const ENV_NODE: &str = "BTS_NODE";

/// Per-instance options for the BitShares bridge adapter.
///
/// Every field is optional; unset fields fall back to the environment and
/// then to built-in defaults at call time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeOptions {
    /// Bridge REST root, e.g. "http://localhost:8787".
    pub base_url: Option<String>,
    /// BitShares account name to sign in as.
    pub account: Option<String>,
    /// Active private key (WIF) or account password.
    pub key_or_password: Option<String>,
    /// Whether `key_or_password` is a password rather than a raw key.
    pub is_password: Option<bool>,
    /// BitShares API node the bridge should connect to.
    pub node: Option<String>,
}

impl BridgeOptions {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_key_or_password(mut self, secret: impl Into<String>, is_password: bool) -> Self {
        self.key_or_password = Some(secret.into());
        self.is_password = Some(is_password);
        self
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Fill every unset field from `other`. Fields already set win.
    pub fn merge(mut self, other: BridgeOptions) -> Self {
        self.base_url = self.base_url.or(other.base_url);
        self.account = self.account.or(other.account);
        self.key_or_password = self.key_or_password.or(other.key_or_password);
        self.is_password = self.is_password.or(other.is_password);
        self.node = self.node.or(other.node);
        self
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Source of environment variables.
///
/// The adapter reads through this seam so tests can supply a fixed map
/// instead of mutating the process environment.
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// `1`, `true` and `yes` (any case) are truthy; everything else is not.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// Resolve the bridge base URL: explicit option, then environment, then default.
///
/// Empty values are skipped and a trailing slash is removed.
pub fn resolve_base_url(options: &BridgeOptions, env: &dyn EnvSource) -> String {
    let url = crate::credentials::first_present([
        options.base_url.clone(),
        env.var(ENV_BRIDGE_URL),
    ])
    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_base_url_default() {
        let url = resolve_base_url(&BridgeOptions::default(), &env(&[]));
        assert_eq!(url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_from_env() {
        let url = resolve_base_url(
            &BridgeOptions::default(),
            &env(&[(ENV_BRIDGE_URL, "http://bridge:9000")]),
        );
        assert_eq!(url, "http://bridge:9000");
    }

    #[test]
    fn test_base_url_option_beats_env() {
        let options = BridgeOptions::default().with_base_url("http://explicit:1234/");
        let url = resolve_base_url(&options, &env(&[(ENV_BRIDGE_URL, "http://bridge:9000")]));
        assert_eq!(url, "http://explicit:1234");
    }

    #[test]
    fn test_empty_option_falls_through() {
        let options = BridgeOptions::default().with_base_url("");
        let url = resolve_base_url(&options, &env(&[(ENV_BRIDGE_URL, "http://bridge:9000")]));
        assert_eq!(url, "http://bridge:9000");
    }

    #[test]
    fn test_truthy_values() {
        for v in ["1", "true", "TRUE", "yes", " Yes "] {
            assert!(is_truthy(v), "{v} should be truthy");
        }
        for v in ["0", "false", "no", "", "on"] {
            assert!(!is_truthy(v), "{v} should not be truthy");
        }
    }

    #[test]
    fn test_merge_prefers_self() {
        let cli = BridgeOptions::default().with_account("alice");
        let file = BridgeOptions::default()
            .with_account("bob")
            .with_node("wss://node.xbts.io/ws");
        let merged = cli.merge(file);
        assert_eq!(merged.account.as_deref(), Some("alice"));
        assert_eq!(merged.node.as_deref(), Some("wss://node.xbts.io/ws"));
    }

    #[test]
    fn test_options_from_toml() {
        let options: BridgeOptions = toml::from_str(
            r#"
            baseUrl = "http://localhost:9999"
            account = "alice"
            isPassword = true
            "#,
        )
        .unwrap();
        assert_eq!(options.base_url.as_deref(), Some("http://localhost:9999"));
        assert_eq!(options.is_password, Some(true));
        assert!(options.node.is_none());
    }
}
