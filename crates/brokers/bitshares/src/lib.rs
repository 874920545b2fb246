//! BitShares DEX broker adapter.
//!
//! Talks to the local BitShares bridge REST service and exposes it through
//! the unified [`Exchange`](dexbridge_core::Exchange) interface.

pub mod adapter;
pub mod balance;
pub mod client;
pub mod config;
pub mod credentials;
pub mod ohlcv;
pub mod protocol;
pub mod session;

pub use adapter::BitsharesDex;
pub use balance::{unify_balance, BalancePayload};
pub use config::{BridgeOptions, EnvSource, ProcessEnv};
pub use credentials::{ApiCredentials, LoginCredentials};
pub use session::Session;
