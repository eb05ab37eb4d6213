//! The paper-trading state machine: a virtual cash balance, at most one
//! open position per token, and an append-only closed trade log, all
//! mutated through a single owner and persisted to a durable JSON log
//! after every mutation via an atomic temp-file-then-rename write.
//!
//! All state is local — this never issues a real order. Safety invariant:
//! a position is never exited on a mark where the price router returned 0.

pub mod policy;

pub use policy::{sizing_for_whale_count, ExitPolicyConfig, ExitReason, SizingTier};

use alpha_entities::ChainId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PaperTraderError {
    #[error("failed to read paper trader log: {0}")]
    Read(std::io::Error),
    #[error("failed to parse paper trader log: {0}")]
    Parse(serde_json::Error),
    #[error("failed to persist paper trader log: {0}")]
    Write(std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenPosition {
    pub token_address: String,
    pub chain_id: ChainId,
    pub qty: f64,
    pub entry_price_usd: f64,
    pub cost_basis_usd: f64,
    pub bought_at: DateTime<Utc>,
    pub num_whales: usize,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    pub peak_profit_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClosedTrade {
    pub token_address: String,
    pub chain_id: ChainId,
    pub qty: f64,
    pub entry_price_usd: f64,
    pub exit_price_usd: f64,
    pub entry_reason: String,
    pub exit_reason: ExitReason,
    pub pnl_usd: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
}

/// The full persisted state, written to the log file verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaperTraderState {
    pub starting_balance_usd: f64,
    pub cash_balance_usd: f64,
    pub open_positions: HashMap<String, OpenPosition>,
    pub closed_trades: Vec<ClosedTrade>,
    pub wins: u32,
    pub losses: u32,
    pub last_updated: DateTime<Utc>,
}

impl PaperTraderState {
    fn fresh(starting_balance_usd: f64, now: DateTime<Utc>) -> Self {
        Self {
            starting_balance_usd,
            cash_balance_usd: starting_balance_usd,
            open_positions: HashMap::new(),
            closed_trades: Vec::new(),
            wins: 0,
            losses: 0,
            last_updated: now,
        }
    }
}

/// The meme-coin entry filter: price within a band, a minimum 24h volume,
/// and a minimum liquidity.
#[derive(Debug, Clone, Copy)]
pub struct MemeCoinFilter {
    pub min_price_usd: f64,
    pub max_price_usd: f64,
    pub min_vol_24h_usd: f64,
    pub min_liquidity_usd: f64,
}

impl Default for MemeCoinFilter {
    fn default() -> Self {
        Self {
            min_price_usd: 0.0,
            max_price_usd: 10.0,
            min_vol_24h_usd: 10_000.0,
            min_liquidity_usd: 5_000.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PaperTraderConfig {
    pub starting_balance_usd: f64,
    pub max_open_positions: usize,
    pub min_cash_to_enter_usd: f64,
    pub meme_coin_filter: MemeCoinFilter,
    pub exit_policy: ExitPolicyConfig,
}

impl Default for PaperTraderConfig {
    fn default() -> Self {
        Self {
            starting_balance_usd: 1000.0,
            max_open_positions: 3,
            min_cash_to_enter_usd: 10.0,
            meme_coin_filter: MemeCoinFilter::default(),
            exit_policy: ExitPolicyConfig::default(),
        }
    }
}

/// The entry request a confluence hit builds for `try_enter`.
#[derive(Debug, Clone)]
pub struct EntryRequest {
    pub token_address: String,
    pub chain_id: ChainId,
    pub price_usd: f64,
    pub num_whales: usize,
    pub vol_24h_usd: Option<f64>,
    pub liquidity_usd: Option<f64>,
}

/// Single-owner paper-trading engine. Other components submit events
/// (`try_enter`, `mark`) or query status (`snapshot`) — nothing outside
/// this type mutates `PaperTraderState` directly.
pub struct PaperTrader {
    config: PaperTraderConfig,
    log_path: PathBuf,
    state: Mutex<PaperTraderState>,
}

impl PaperTrader {
    /// Loads existing state from `log_path` if present, otherwise starts
    /// fresh with `config.starting_balance_usd`.
    pub async fn load_or_init(
        log_path: impl Into<PathBuf>,
        config: PaperTraderConfig,
    ) -> Result<Self, PaperTraderError> {
        let log_path = log_path.into();
        let state = match tokio::fs::read_to_string(&log_path).await {
            Ok(contents) => {
                let state: PaperTraderState =
                    serde_json::from_str(&contents).map_err(PaperTraderError::Parse)?;
                info!(path = %log_path.display(), balance = state.cash_balance_usd, "loaded paper trader state");
                state
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %log_path.display(), "no paper trader log found, starting fresh");
                PaperTraderState::fresh(config.starting_balance_usd, Utc::now())
            }
            Err(err) => return Err(PaperTraderError::Read(err)),
        };

        Ok(Self {
            config,
            log_path,
            state: Mutex::new(state),
        })
    }

    pub fn config(&self) -> &PaperTraderConfig {
        &self.config
    }

    pub async fn snapshot(&self) -> PaperTraderState {
        self.state.lock().await.clone()
    }

    fn passes_meme_coin_filter(&self, req: &EntryRequest) -> bool {
        let filter = &self.config.meme_coin_filter;
        if req.price_usd <= 0.0 {
            return false;
        }
        if req.price_usd < filter.min_price_usd || req.price_usd > filter.max_price_usd {
            return false;
        }
        if req.vol_24h_usd.unwrap_or(0.0) < filter.min_vol_24h_usd {
            return false;
        }
        if req.liquidity_usd.unwrap_or(0.0) < filter.min_liquidity_usd {
            return false;
        }
        true
    }

    /// Opens a new position from a buy-side confluence hit. Returns
    /// `Some(OpenPosition)` on success, `None` if any precondition failed
    /// (already holding, at capacity, insufficient cash, or the meme-coin
    /// filter rejected the token) — never an error, since these are all
    /// ordinary "don't trade" outcomes, not failures.
    pub async fn try_enter(&self, req: EntryRequest, now: DateTime<Utc>) -> Option<OpenPosition> {
        if !self.passes_meme_coin_filter(&req) {
            return None;
        }

        let mut state = self.state.lock().await;
        if state.open_positions.contains_key(&req.token_address) {
            return None;
        }
        if state.open_positions.len() >= self.config.max_open_positions {
            return None;
        }
        if state.cash_balance_usd < self.config.min_cash_to_enter_usd {
            return None;
        }

        let tier = sizing_for_whale_count(req.num_whales);
        let size_usd = state.cash_balance_usd * tier.size_pct_of_cash;
        let qty = size_usd / req.price_usd;

        state.cash_balance_usd -= size_usd;
        let position = OpenPosition {
            token_address: req.token_address.clone(),
            chain_id: req.chain_id,
            qty,
            entry_price_usd: req.price_usd,
            cost_basis_usd: size_usd,
            bought_at: now,
            num_whales: req.num_whales,
            take_profit_pct: tier.take_profit_pct,
            stop_loss_pct: tier.stop_loss_pct,
            peak_profit_pct: None,
        };
        state.open_positions.insert(req.token_address.clone(), position.clone());
        state.last_updated = now;
        info!(
            token = %req.token_address,
            size_usd,
            qty,
            num_whales = req.num_whales,
            "paper trader entered position"
        );
        self.persist(&state).await;
        Some(position)
    }

    /// Marks one open position at `mark_price_usd` and exits it if the
    /// first-hit-wins policy fires. `mark_price_usd <= 0.0` ("stale", the
    /// price router's total-failure sentinel) always holds the position —
    /// it is never exited on a bad mark. `whale_sell_confluence` is
    /// supplied by the caller (the confluence detector's sell-side check
    /// for this token), since that store lives in a separate crate.
    pub async fn mark(
        &self,
        token_address: &str,
        mark_price_usd: f64,
        now: DateTime<Utc>,
        whale_sell_confluence: bool,
    ) -> Option<ClosedTrade> {
        if mark_price_usd <= 0.0 {
            warn!(token = token_address, "skipping mark: price unavailable (stale)");
            return None;
        }

        let mut state = self.state.lock().await;
        let current_return_pct = {
            let position = state.open_positions.get(token_address)?;
            (mark_price_usd - position.entry_price_usd) / position.entry_price_usd
        };

        let (take_profit_pct, stop_loss_pct, bought_at, peak_before) = {
            let position = state.open_positions.get(token_address).unwrap();
            (
                position.take_profit_pct,
                position.stop_loss_pct,
                position.bought_at,
                position.peak_profit_pct,
            )
        };

        let peak_after = policy::update_peak(peak_before, current_return_pct, &self.config.exit_policy);
        if let Some(position) = state.open_positions.get_mut(token_address) {
            position.peak_profit_pct = peak_after;
        }

        let exit_reason = policy::evaluate_exit(
            current_return_pct,
            take_profit_pct,
            stop_loss_pct,
            bought_at,
            now,
            peak_after,
            whale_sell_confluence,
            &self.config.exit_policy,
        )?;

        let position = state.open_positions.remove(token_address).unwrap();
        let proceeds_usd = position.qty * mark_price_usd;
        let pnl_usd = proceeds_usd - position.cost_basis_usd;

        state.cash_balance_usd += proceeds_usd;
        if pnl_usd >= 0.0 {
            state.wins += 1;
        } else {
            state.losses += 1;
        }

        let closed = ClosedTrade {
            token_address: position.token_address.clone(),
            chain_id: position.chain_id,
            qty: position.qty,
            entry_price_usd: position.entry_price_usd,
            exit_price_usd: mark_price_usd,
            entry_reason: format!("{}-whale buy confluence", position.num_whales),
            exit_reason,
            pnl_usd,
            opened_at: position.bought_at,
            closed_at: now,
        };
        state.closed_trades.push(closed.clone());
        state.last_updated = now;

        info!(
            token = token_address,
            exit_reason = ?closed.exit_reason,
            pnl_usd,
            cash_balance = state.cash_balance_usd,
            "paper trader exited position"
        );
        self.persist(&state).await;
        Some(closed)
    }

    async fn persist(&self, state: &PaperTraderState) {
        if let Err(err) = save_atomic(&self.log_path, state).await {
            warn!(error = %err, path = %self.log_path.display(), "failed to persist paper trader state");
        }
    }
}

/// Write-to-temp-then-rename so a crash mid-write never corrupts the log.
async fn save_atomic(path: &Path, state: &PaperTraderState) -> Result<(), PaperTraderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(PaperTraderError::Write)?;
        }
    }
    let contents = serde_json::to_string_pretty(state).map_err(PaperTraderError::Parse)?;
    let temp_path = path.with_extension("tmp");
    tokio::fs::write(&temp_path, contents)
        .await
        .map_err(PaperTraderError::Write)?;
    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(PaperTraderError::Write)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry_req(token: &str, price: f64, num_whales: usize) -> EntryRequest {
        EntryRequest {
            token_address: token.into(),
            chain_id: ChainId::Ethereum,
            price_usd: price,
            num_whales,
            vol_24h_usd: Some(50_000.0),
            liquidity_usd: Some(20_000.0),
        }
    }

    async fn fresh_trader(log_path: &Path) -> PaperTrader {
        PaperTrader::load_or_init(log_path, PaperTraderConfig::default())
            .await
            .unwrap()
    }

    /// S6. Paper entry & TP exit.
    #[tokio::test]
    async fn entry_sizing_and_take_profit_exit_matches_scenario_s6() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("paper.json");
        let trader = fresh_trader(&log_path).await;
        let now = Utc::now();

        let position = trader
            .try_enter(entry_req("tokenT", 0.001, 2), now)
            .await
            .unwrap();
        assert_eq!(position.cost_basis_usd, 400.0);
        assert!((position.take_profit_pct - 0.30).abs() < 1e-9);
        assert!((position.stop_loss_pct - (-0.15)).abs() < 1e-9);

        let closed = trader
            .mark("tokenT", 0.0013, now + Duration::minutes(5), false)
            .await
            .unwrap();
        assert_eq!(closed.exit_reason, ExitReason::TakeProfit);
        assert!((closed.pnl_usd - 120.0).abs() < 1e-6);

        let snapshot = trader.snapshot().await;
        assert!((snapshot.cash_balance_usd - 1120.0).abs() < 1e-6);
        assert!(snapshot.open_positions.is_empty());
        assert_eq!(snapshot.wins, 1);
    }

    #[tokio::test]
    async fn never_exits_on_stale_zero_price_mark() {
        let dir = tempfile::tempdir().unwrap();
        let trader = fresh_trader(&dir.path().join("paper.json")).await;
        let now = Utc::now();
        trader.try_enter(entry_req("tokenT", 1.0, 2), now).await.unwrap();
        let result = trader.mark("tokenT", 0.0, now, false).await;
        assert!(result.is_none());
        assert_eq!(trader.snapshot().await.open_positions.len(), 1);
    }

    #[tokio::test]
    async fn at_most_one_position_per_token_and_capacity_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let trader = fresh_trader(&dir.path().join("paper.json")).await;
        let now = Utc::now();

        assert!(trader.try_enter(entry_req("tokenA", 0.01, 2), now).await.is_some());
        // Re-entering the same token while already held is rejected.
        assert!(trader.try_enter(entry_req("tokenA", 0.01, 2), now).await.is_none());

        assert!(trader.try_enter(entry_req("tokenB", 0.01, 2), now).await.is_some());
        assert!(trader.try_enter(entry_req("tokenC", 0.01, 2), now).await.is_some());
        // Fourth distinct token exceeds max_open_positions (3).
        assert!(trader.try_enter(entry_req("tokenD", 0.01, 2), now).await.is_none());
    }

    #[tokio::test]
    async fn meme_coin_filter_rejects_out_of_band_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let trader = fresh_trader(&dir.path().join("paper.json")).await;
        let now = Utc::now();
        let mut req = entry_req("tokenT", 50.0, 2); // above default max_price_usd
        req.liquidity_usd = Some(20_000.0);
        assert!(trader.try_enter(req, now).await.is_none());
    }

    #[tokio::test]
    async fn state_survives_reload_from_log() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("paper.json");
        let now = Utc::now();
        {
            let trader = fresh_trader(&log_path).await;
            trader.try_enter(entry_req("tokenT", 0.01, 2), now).await.unwrap();
        }
        let reloaded = PaperTrader::load_or_init(&log_path, PaperTraderConfig::default())
            .await
            .unwrap();
        let snapshot = reloaded.snapshot().await;
        assert_eq!(snapshot.open_positions.len(), 1);
        assert!(snapshot.open_positions.contains_key("tokenT"));
    }

    #[tokio::test]
    async fn whale_exit_confluence_closes_position() {
        let dir = tempfile::tempdir().unwrap();
        let trader = fresh_trader(&dir.path().join("paper.json")).await;
        let now = Utc::now();
        trader.try_enter(entry_req("tokenT", 1.0, 2), now).await.unwrap();
        // Small move that would not trip TP/SL/trailing on its own.
        let closed = trader.mark("tokenT", 1.02, now, true).await.unwrap();
        assert_eq!(closed.exit_reason, ExitReason::WhaleExit);
    }
}
