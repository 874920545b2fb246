//! Ordered credential resolution.
//!
//! Each field is taken from the first tier that has it: explicit options,
//! then the unified `apiKey`/`secret` fields, then the environment.

use serde::Serialize;

use crate::config::*;

/// First candidate that is present and non-empty.
pub fn first_present<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}

/// Unified-interface credential fields (`apiKey` doubles as the account name).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiCredentials {
    pub api_key: Option<String>,
    pub secret: Option<String>,
}

/// Credentials complete enough to sign in to the bridge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginCredentials {
    pub account: String,
    pub key_or_password: String,
    pub is_password: bool,
    pub node: Option<String>,
}

/// Gather sign-in credentials, or `None` when account or key is missing.
pub fn resolve_login(
    options: &BridgeOptions,
    api: &ApiCredentials,
    env: &dyn EnvSource,
) -> Option<LoginCredentials> {
    let account = first_present([
        options.account.clone(),
        api.api_key.clone(),
        env.var(ENV_ACCOUNT),
    ])?;
    let key_or_password = first_present([
        options.key_or_password.clone(),
        api.secret.clone(),
        env.var(ENV_KEY_OR_PASSWORD),
    ])?;
    let is_password = options
        .is_password
        .or_else(|| env.var(ENV_IS_PASSWORD).map(|v| is_truthy(&v)))
        .unwrap_or(false);
    let node = first_present([options.node.clone(), env.var(ENV_NODE)]);

    Some(LoginCredentials {
        account,
        key_or_password,
        is_password,
        node,
    })
}

/// Account to query public balances for: explicit override first.
pub fn resolve_public_account(
    requested: Option<&str>,
    options: &BridgeOptions,
    api: &ApiCredentials,
    env: &dyn EnvSource,
) -> Option<String> {
    first_present([
        requested.map(str::to_string),
        options.account.clone(),
        api.api_key.clone(),
        env.var(ENV_ACCOUNT),
    ])
}
