use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chain identifier. Kept as a plain enum rather than an open string so the
/// exclusion list and adapter registry (see `alpha-adapters`) can match on it
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainId {
    Ethereum,
    Base,
    Arbitrum,
    Solana,
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChainId::Ethereum => "ethereum",
            ChainId::Base => "base",
            ChainId::Arbitrum => "arbitrum",
            ChainId::Solana => "solana",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ChainId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ethereum" | "eth" => Ok(ChainId::Ethereum),
            "base" => Ok(ChainId::Base),
            "arbitrum" | "arb" => Ok(ChainId::Arbitrum),
            "solana" | "sol" => Ok(ChainId::Solana),
            other => Err(format!("unknown chain id: {other}")),
        }
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Token metadata and risk indicators. Unique by `token_address`; `chain_id`
/// is a property of the token, not part of its identity (a given address
/// belongs to exactly one chain in this model).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub token_address: String,
    pub chain_id: ChainId,
    pub symbol: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_price_usd: Option<f64>,
    pub last_liquidity_usd: Option<f64>,
    pub is_honeypot: Option<bool>,
    pub buy_tax_pct: Option<f64>,
    pub sell_tax_pct: Option<f64>,
}

impl Token {
    pub fn new(token_address: impl Into<String>, chain_id: ChainId, now: DateTime<Utc>) -> Self {
        Self {
            token_address: token_address.into(),
            chain_id,
            symbol: None,
            first_seen_at: now,
            last_price_usd: None,
            last_liquidity_usd: None,
            is_honeypot: None,
            buy_tax_pct: None,
            sell_tax_pct: None,
        }
    }
}

/// Append-only "trending" observation. Uniqueness is per
/// `(token_address, source, snapshot_ts)`; `id` is a synthetic key assigned
/// by the store on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedToken {
    pub id: Option<i64>,
    pub token_address: String,
    pub chain_id: ChainId,
    pub source: String,
    pub snapshot_ts: DateTime<Utc>,
    pub rank_24h: Option<u32>,
    pub vol_24h_usd: Option<f64>,
    pub pct_change_24h: Option<f64>,
}

/// A wallet observed trading. `is_bot` flagging is sticky — once true it is
/// never cleared automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub chain_id: ChainId,
    pub is_contract: bool,
    pub is_bot: bool,
    pub first_seen_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Wallet {
    pub fn new(address: impl Into<String>, chain_id: ChainId, now: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            chain_id,
            is_contract: false,
            is_bot: false,
            first_seen_at: now,
            last_active_at: Some(now),
        }
    }
}

/// A single on-chain trade. `tx_hash` is the idempotency key — re-inserting
/// the same hash is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub tx_hash: String,
    pub ts: DateTime<Utc>,
    pub chain_id: ChainId,
    pub wallet_address: String,
    pub token_address: String,
    pub side: Side,
    pub qty_token: f64,
    pub price_usd: f64,
    pub usd_value: f64,
    pub fee_usd: Option<f64>,
    pub venue: Option<String>,
}

impl Trade {
    pub fn fee(&self) -> f64 {
        self.fee_usd.unwrap_or(0.0)
    }
}

/// Derived FIFO position for one `(wallet, token)` pair. Recomputed
/// deterministically from `Trade` history by `alpha-analytics`; never
/// mutated directly by ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub wallet_address: String,
    pub token_address: String,
    pub chain_id: ChainId,
    pub qty: f64,
    pub cost_basis_usd: f64,
    pub realized_pnl_usd: f64,
    pub unrealized_pnl_usd: f64,
    pub last_price_usd: Option<f64>,
    pub last_update: DateTime<Utc>,
}

/// Rolling 30-day stats aggregated per wallet, the input to the watchlist
/// ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletStats30D {
    pub wallet_address: String,
    pub chain_id: ChainId,
    pub trades_count: u32,
    pub realized_pnl_usd: f64,
    pub unrealized_pnl_usd: f64,
    pub best_trade_multiple: f64,
    pub earlyscore_median: Option<f64>,
    pub max_drawdown_pct: f64,
    pub last_update: DateTime<Utc>,
}

impl WalletStats30D {
    pub fn empty(wallet_address: impl Into<String>, chain_id: ChainId, now: DateTime<Utc>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            chain_id,
            trades_count: 0,
            realized_pnl_usd: 0.0,
            unrealized_pnl_usd: 0.0,
            best_trade_multiple: 1.0,
            earlyscore_median: None,
            max_drawdown_pct: 0.0,
            last_update: now,
        }
    }
}

/// User-curated "always monitor" wallet. Independent of the auto-discovered
/// pool; removal is soft (`is_active = false`), never a hard delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomWatchlistWallet {
    pub address: String,
    pub chain_id: ChainId,
    pub added_at: DateTime<Utc>,
    pub label: Option<String>,
    pub is_active: bool,
    pub notes: Option<String>,
}

/// The kind of signal an [`Alert`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Single,
    Confluence,
}

/// Immutable record of an emitted signal. `payload` captures enough to
/// reconstruct the triggering conditions (wallets, prices, rule id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Option<i64>,
    pub ts: DateTime<Utc>,
    pub alert_type: AlertType,
    pub token_address: String,
    pub chain_id: ChainId,
    pub wallet_set: Vec<String>,
    pub rule_id: Option<String>,
    pub payload: serde_json::Value,
}
