mod check;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dexbridge_brokers_bitshares::credentials::resolve_login;
use dexbridge_brokers_bitshares::{
    ApiCredentials, BitsharesDex, BridgeOptions, EnvSource, LoginCredentials, ProcessEnv,
};
use dexbridge_core::*;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "btsdex")]
#[command(about = "BitShares DEX through the local bridge, via the unified exchange interface")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// TOML file with bridge options (baseUrl, account, keyOrPassword, isPassword, node)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bridge base URL (falls back to BITSHARES_CCXT_BRIDGE_URL, then http://localhost:8787)
    #[arg(long)]
    base_url: Option<String>,

    /// BitShares account name
    #[arg(long)]
    account: Option<String>,

    /// Active key (WIF) or password
    #[arg(long)]
    key_or_password: Option<String>,

    /// Treat --key-or-password as a password
    #[arg(long)]
    is_password: bool,

    /// BitShares API node for the bridge to use
    #[arg(long)]
    node: Option<String>,

    /// Extra query parameter for market-data, open-orders and cancel calls (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    params: Vec<(String, String)>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the adapter's capability description
    Describe,

    /// List markets
    Markets,

    /// Fetch a ticker
    Ticker {
        /// Market symbol (e.g. "NESS/BTS")
        symbol: String,
    },

    /// Fetch an order book
    Orderbook {
        symbol: String,
        /// Depth per side
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Fetch recent public trades
    Trades {
        symbol: String,
        /// Only trades at or after this time (ms since epoch)
        #[arg(long)]
        since: Option<i64>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Fetch OHLCV candles
    Ohlcv {
        symbol: String,
        #[arg(long, default_value = "1h")]
        timeframe: String,
        #[arg(long)]
        since: Option<i64>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Fetch account balance (public lookup when --for is given)
    Balance {
        /// Account to look up without signing in
        #[arg(long = "for")]
        for_account: Option<String>,
    },

    /// List open orders
    OpenOrders,

    /// Place a limit order
    CreateOrder {
        symbol: String,
        /// buy or sell
        side: Side,
        amount: f64,
        price: f64,
        /// Order type; only "limit" is accepted by the bridge
        #[arg(long = "type", default_value = "limit")]
        order_type: OrderType,
    },

    /// Cancel an order by id
    CancelOrder { id: String },

    /// Sign in explicitly with the resolved credentials
    Login,

    /// List currencies
    Currencies,

    /// Show trading fees
    Fees,

    /// Show trading limits
    Limits {
        /// Restrict to these symbols
        symbols: Vec<String>,
    },

    /// Fetch one order by id
    Order {
        id: String,
        #[arg(long)]
        symbol: Option<String>,
    },

    /// List orders
    Orders {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        since: Option<i64>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// List own trades
    MyTrades {
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        since: Option<i64>,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Walk the public surface of a live bridge and report PASS/FAIL
    Check {
        /// Account for the public balance check
        account: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let options = load_options(&cli)?;
    let params = call_params(&cli.params);
    let exchange = BitsharesDex::new(options)?;
    tracing::debug!(base_url = %exchange.base_url(), "Using bridge");

    match cli.command {
        Commands::Describe => print_json(&exchange.describe())?,
        Commands::Markets => print_json(&exchange.fetch_markets().await?)?,
        Commands::Ticker { symbol } => print_json(&exchange.fetch_ticker(&symbol, &params).await?)?,
        Commands::Orderbook { symbol, limit } => {
            print_json(&exchange.fetch_order_book(&symbol, limit, &params).await?)?
        }
        Commands::Trades {
            symbol,
            since,
            limit,
        } => print_json(&exchange.fetch_trades(&symbol, since, limit, &params).await?)?,
        Commands::Ohlcv {
            symbol,
            timeframe,
            since,
            limit,
        } => {
            let candles = exchange
                .fetch_ohlcv(&symbol, &timeframe, since, limit, &params)
                .await?;
            print_candles(&candles);
        }
        Commands::Balance { for_account } => {
            print_json(&exchange.fetch_balance(for_account.as_deref()).await?)?
        }
        Commands::OpenOrders => print_json(&exchange.fetch_open_orders(None, &params).await?)?,
        Commands::CreateOrder {
            symbol,
            side,
            amount,
            price,
            order_type,
        } => {
            let request = OrderRequest {
                order_type,
                ..OrderRequest::limit(&symbol, side, amount, price)
            };
            tracing::info!(symbol = %symbol, side = side.as_str(), amount, price, "Placing order");
            print_json(&exchange.create_order(request).await?)?
        }
        Commands::CancelOrder { id } => print_json(&exchange.cancel_order(&id, None, &params).await?)?,
        Commands::Login => {
            let credentials = login_credentials(exchange.options(), &ProcessEnv)?;
            print_json(&exchange.sign_in(&credentials).await?)?
        }
        Commands::Currencies => print_json(&exchange.fetch_currencies().await?)?,
        Commands::Fees => print_json(&exchange.fetch_trading_fees().await?)?,
        Commands::Limits { symbols } => {
            print_json(&exchange.fetch_trading_limits(&symbols).await?)?
        }
        Commands::Order { id, symbol } => {
            print_json(&exchange.fetch_order(&id, symbol.as_deref()).await?)?
        }
        Commands::Orders {
            symbol,
            since,
            limit,
        } => print_json(&exchange.fetch_orders(symbol.as_deref(), since, limit).await?)?,
        Commands::MyTrades {
            symbol,
            since,
            limit,
        } => print_json(
            &exchange
                .fetch_my_trades(symbol.as_deref(), since, limit)
                .await?,
        )?,
        Commands::Check { account } => check::run(&exchange, account).await?,
    }

    Ok(())
}

/// Command-line flags over the config file; the adapter handles env/defaults.
fn load_options(cli: &Cli) -> Result<BridgeOptions> {
    let file = match &cli.config {
        Some(path) => read_options(path)?,
        None => BridgeOptions::default(),
    };
    let flags = BridgeOptions {
        base_url: cli.base_url.clone(),
        account: cli.account.clone(),
        key_or_password: cli.key_or_password.clone(),
        is_password: cli.is_password.then_some(true),
        node: cli.node.clone(),
    };
    Ok(flags.merge(file))
}

fn read_options(path: &Path) -> Result<BridgeOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

/// Same precedence the adapter uses for its own lazy sign-in.
fn login_credentials(options: &BridgeOptions, env: &dyn EnvSource) -> Result<LoginCredentials> {
    resolve_login(options, &ApiCredentials::default(), env).context(
        "an account and key are required to log in \
         (--account/--key-or-password, the config file, or BTS_ACCOUNT/BTS_WIF)",
    )
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

fn call_params(pairs: &[(String, String)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_candles(candles: &[Candle]) {
    println!(
        "{:<20} {:>14} {:>14} {:>14} {:>14} {:>16}",
        "time", "open", "high", "low", "close", "volume"
    );
    for c in candles {
        let time = c
            .datetime()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| cell(c.timestamp.map(|t| t as f64), 0));
        println!(
            "{:<20} {:>14} {:>14} {:>14} {:>14} {:>16}",
            time,
            cell(c.open, 8),
            cell(c.high, 8),
            cell(c.low, 8),
            cell(c.close, 8),
            cell(c.volume, 4)
        );
    }
}

fn cell(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}
