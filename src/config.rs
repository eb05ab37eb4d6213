//! Process configuration, loaded from environment variables (via a `.env`
//! file if present) into typed, validated structs — the `brain::config`
//! pattern: one `Config::from_env()` entry point, sub-structs grouping
//! related options, and a `validate()` pass before anything is wired up.

use alpha_entities::ChainId;
use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub chains: ChainsConfig,
    pub confluence: ConfluenceConfig,
    pub watchlist: WatchlistConfig,
    pub scheduler: SchedulerConfig,
    pub paper_trader: PaperConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone)]
pub struct ChainsConfig {
    pub active: Vec<ChainId>,
}

#[derive(Debug, Clone)]
pub struct ConfluenceConfig {
    pub window_minutes: i64,
    pub grace_minutes: i64,
    pub min_wallets: usize,
}

#[derive(Debug, Clone)]
pub struct WatchlistConfig {
    pub min_unique_buyers_24h: u32,
    pub auto_min_unrealized_pnl_usd: f64,
    pub auto_min_trades: u32,
    pub add_min_trades_30d: u32,
    pub add_min_realized_pnl_30d_usd: f64,
    pub add_min_best_trade_multiple: f64,
    pub remove_if_realized_pnl_30d_lt: f64,
    pub remove_if_max_drawdown_pct_gt: f64,
    pub remove_if_trades_30d_lt: u32,
    pub top_k: usize,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub runner_poll_minutes: u64,
    pub wallet_backfill_days: i64,
    pub recent_seed_horizon_hours: i64,
    pub whale_min_usd_value: f64,
    pub pool_detect_min_occurrences: usize,
}

#[derive(Debug, Clone)]
pub struct PaperConfig {
    pub starting_balance_usd: f64,
    pub max_open_positions: usize,
    pub min_cash_to_enter_usd: f64,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub bind_address: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv::dotenv();

        Ok(Config {
            chains: ChainsConfig {
                active: get_env_string("CHAINS", "ethereum,base,arbitrum,solana")?
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| ChainId::from_str(s).map_err(anyhow::Error::msg))
                    .collect::<Result<Vec<_>>>()
                    .context("invalid CHAINS value")?,
            },
            confluence: ConfluenceConfig {
                window_minutes: get_env_i64("CONFLUENCE_MINUTES", 30)?,
                grace_minutes: get_env_i64("CONFLUENCE_GRACE_MINUTES", 10)?,
                min_wallets: get_env_usize("CONFLUENCE_MIN_WALLETS", 2)?,
            },
            watchlist: WatchlistConfig {
                min_unique_buyers_24h: get_env_u32("MIN_UNIQUE_BUYERS_24H", 30)?,
                auto_min_unrealized_pnl_usd: get_env_f64("AUTO_MIN_UNREALIZED_PNL_USD", 500.0)?,
                auto_min_trades: get_env_u32("AUTO_MIN_TRADES", 2)?,
                add_min_trades_30d: get_env_u32("ADD_MIN_TRADES_30D", 5)?,
                add_min_realized_pnl_30d_usd: get_env_f64(
                    "ADD_MIN_REALIZED_PNL_30D_USD",
                    50_000.0,
                )?,
                add_min_best_trade_multiple: get_env_f64("ADD_MIN_BEST_TRADE_MULTIPLE", 3.0)?,
                remove_if_realized_pnl_30d_lt: get_env_f64(
                    "REMOVE_IF_REALIZED_PNL_30D_LT",
                    0.0,
                )?,
                remove_if_max_drawdown_pct_gt: get_env_f64(
                    "REMOVE_IF_MAX_DRAWDOWN_PCT_GT",
                    50.0,
                )?,
                remove_if_trades_30d_lt: get_env_u32("REMOVE_IF_TRADES_30D_LT", 2)?,
                top_k: get_env_usize("WATCHLIST_TOP_K", 30)?,
            },
            scheduler: SchedulerConfig {
                runner_poll_minutes: get_env_u64("RUNNER_POLL_MINUTES", 5)?,
                wallet_backfill_days: get_env_i64("WALLET_BACKFILL_DAYS", 30)?,
                recent_seed_horizon_hours: get_env_i64("RECENT_SEED_HORIZON_HOURS", 24)?,
                whale_min_usd_value: get_env_f64("WHALE_MIN_USD_VALUE", 10_000.0)?,
                pool_detect_min_occurrences: get_env_usize("POOL_DETECT_MIN_OCCURRENCES", 2)?,
            },
            paper_trader: PaperConfig {
                starting_balance_usd: get_env_f64("STARTING_PAPER_BALANCE", 1000.0)?,
                max_open_positions: get_env_usize("MAX_OPEN_POSITIONS", 3)?,
                min_cash_to_enter_usd: get_env_f64("MIN_CASH_TO_ENTER_USD", 10.0)?,
                log_path: PathBuf::from(get_env_string(
                    "PAPER_TRADER_LOG_PATH",
                    "./data/paper_trader.json",
                )?),
            },
            dashboard: DashboardConfig {
                bind_address: SocketAddr::from_str(&get_env_string(
                    "DASHBOARD_BIND_ADDRESS",
                    "127.0.0.1:8080",
                )?)
                .context("invalid DASHBOARD_BIND_ADDRESS")?,
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.chains.active.is_empty() {
            anyhow::bail!("CHAINS must name at least one chain");
        }
        if self.confluence.window_minutes <= 0 {
            anyhow::bail!("CONFLUENCE_MINUTES must be > 0");
        }
        if self.confluence.min_wallets == 0 {
            anyhow::bail!("CONFLUENCE_MIN_WALLETS must be > 0");
        }
        if self.watchlist.top_k == 0 {
            anyhow::bail!("WATCHLIST_TOP_K must be > 0");
        }
        if self.scheduler.runner_poll_minutes == 0 {
            anyhow::bail!("RUNNER_POLL_MINUTES must be > 0");
        }
        if self.paper_trader.starting_balance_usd <= 0.0 {
            anyhow::bail!("STARTING_PAPER_BALANCE must be > 0");
        }
        if self.paper_trader.max_open_positions == 0 {
            anyhow::bail!("MAX_OPEN_POSITIONS must be > 0");
        }
        Ok(())
    }
}

fn get_env_string(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn get_env_u32(key: &str, default: u32) -> Result<u32> {
    env::var(key)
        .ok()
        .map(|s| s.parse())
        .transpose()
        .with_context(|| format!("invalid {key} value"))
        .map(|v| v.unwrap_or(default))
}

fn get_env_u64(key: &str, default: u64) -> Result<u64> {
    env::var(key)
        .ok()
        .map(|s| s.parse())
        .transpose()
        .with_context(|| format!("invalid {key} value"))
        .map(|v| v.unwrap_or(default))
}

fn get_env_i64(key: &str, default: i64) -> Result<i64> {
    env::var(key)
        .ok()
        .map(|s| s.parse())
        .transpose()
        .with_context(|| format!("invalid {key} value"))
        .map(|v| v.unwrap_or(default))
}

fn get_env_usize(key: &str, default: usize) -> Result<usize> {
    env::var(key)
        .ok()
        .map(|s| s.parse())
        .transpose()
        .with_context(|| format!("invalid {key} value"))
        .map(|v| v.unwrap_or(default))
}

fn get_env_f64(key: &str, default: f64) -> Result<f64> {
    env::var(key)
        .ok()
        .map(|s| s.parse())
        .transpose()
        .with_context(|| format!("invalid {key} value"))
        .map(|v| v.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_and_validate() {
        // Construct directly rather than through from_env so the test does
        // not depend on (or clobber) the process environment.
        let config = Config {
            chains: ChainsConfig {
                active: vec![ChainId::Ethereum, ChainId::Solana],
            },
            confluence: ConfluenceConfig {
                window_minutes: 30,
                grace_minutes: 10,
                min_wallets: 2,
            },
            watchlist: WatchlistConfig {
                min_unique_buyers_24h: 30,
                auto_min_unrealized_pnl_usd: 500.0,
                auto_min_trades: 2,
                add_min_trades_30d: 5,
                add_min_realized_pnl_30d_usd: 50_000.0,
                add_min_best_trade_multiple: 3.0,
                remove_if_realized_pnl_30d_lt: 0.0,
                remove_if_max_drawdown_pct_gt: 50.0,
                remove_if_trades_30d_lt: 2,
                top_k: 30,
            },
            scheduler: SchedulerConfig {
                runner_poll_minutes: 5,
                wallet_backfill_days: 30,
                recent_seed_horizon_hours: 24,
                whale_min_usd_value: 10_000.0,
                pool_detect_min_occurrences: 2,
            },
            paper_trader: PaperConfig {
                starting_balance_usd: 1000.0,
                max_open_positions: 3,
                min_cash_to_enter_usd: 10.0,
                log_path: PathBuf::from("./data/paper_trader.json"),
            },
            dashboard: DashboardConfig {
                bind_address: SocketAddr::from_str("127.0.0.1:8080").unwrap(),
            },
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_top_k_fails_validation() {
        let mut config = minimal_config();
        config.watchlist.top_k = 0;
        assert!(config.validate().is_err());
    }

    fn minimal_config() -> Config {
        Config {
            chains: ChainsConfig {
                active: vec![ChainId::Ethereum],
            },
            confluence: ConfluenceConfig {
                window_minutes: 30,
                grace_minutes: 10,
                min_wallets: 2,
            },
            watchlist: WatchlistConfig {
                min_unique_buyers_24h: 30,
                auto_min_unrealized_pnl_usd: 500.0,
                auto_min_trades: 2,
                add_min_trades_30d: 5,
                add_min_realized_pnl_30d_usd: 50_000.0,
                add_min_best_trade_multiple: 3.0,
                remove_if_realized_pnl_30d_lt: 0.0,
                remove_if_max_drawdown_pct_gt: 50.0,
                remove_if_trades_30d_lt: 2,
                top_k: 30,
            },
            scheduler: SchedulerConfig {
                runner_poll_minutes: 5,
                wallet_backfill_days: 30,
                recent_seed_horizon_hours: 24,
                whale_min_usd_value: 10_000.0,
                pool_detect_min_occurrences: 2,
            },
            paper_trader: PaperConfig {
                starting_balance_usd: 1000.0,
                max_open_positions: 3,
                min_cash_to_enter_usd: 10.0,
                log_path: PathBuf::from("./data/paper_trader.json"),
            },
            dashboard: DashboardConfig {
                bind_address: SocketAddr::from_str("127.0.0.1:8080").unwrap(),
            },
        }
    }
}
