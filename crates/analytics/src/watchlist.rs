//! Watchlist ranker: composite scoring over auto-discovered wallets, union
//! with the custom watchlist, and the nightly add/remove maintenance rules.
//!
//! This module is deliberately ignorant of [`alpha_entities::EntityStore`] —
//! it scores and filters the `WalletStats30D` rows a caller already fetched,
//! so the ranking math can be unit tested without a store at all.

use tracing::debug;

/// One candidate's stats as the ranker needs them. A thin projection of
/// `alpha_entities::WalletStats30D` plus the identity fields the caller
/// needs back out.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoDiscoveredCandidate {
    pub wallet_address: String,
    pub unrealized_pnl_usd: f64,
    pub realized_pnl_usd: f64,
    pub trades_count: u32,
    pub earlyscore_median: Option<f64>,
    pub best_trade_multiple: f64,
    pub max_drawdown_pct: f64,
}

/// Composite score weights. [`Self::adapt`] shifts them based on trailing
/// alert win-rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchlistWeights {
    pub pnl: f64,
    pub trades: f64,
    pub earlyscore: f64,
}

impl Default for WatchlistWeights {
    fn default() -> Self {
        Self {
            pnl: 0.30,
            trades: 0.30,
            earlyscore: 0.40,
        }
    }
}

impl WatchlistWeights {
    /// Shift weight toward EarlyScore when the trailing 7-day alert win-rate
    /// is low (timing matters more when confluence hasn't been paying off),
    /// and toward P&L when win-rate is high (follow proven winners).
    /// Bounded so no single signal can dominate and the three always sum to
    /// 1.0 — this is recomputed from `Alert` history on every maintenance
    /// run, never persisted, so a restart simply starts from the default.
    pub fn adapt(win_rate_7d: f64) -> Self {
        let win_rate = win_rate_7d.clamp(0.0, 1.0);
        let shift = (win_rate - 0.5) * 0.2;
        let pnl = (0.30 + shift).clamp(0.10, 0.50);
        let earlyscore = (0.40 - shift).clamp(0.20, 0.60);
        let trades = 0.30;
        let total = pnl + trades + earlyscore;
        Self {
            pnl: pnl / total,
            trades: trades / total,
            earlyscore: earlyscore / total,
        }
    }
}

/// Thresholds gating the auto-discovered population and nightly maintenance.
#[derive(Debug, Clone, Copy)]
pub struct MaintenanceThresholds {
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

impl Default for MaintenanceThresholds {
    fn default() -> Self {
        Self {
            auto_min_unrealized_pnl_usd: 500.0,
            auto_min_trades: 2,
            add_min_trades_30d: 5,
            add_min_realized_pnl_30d_usd: 50_000.0,
            add_min_best_trade_multiple: 3.0,
            remove_if_realized_pnl_30d_lt: 0.0,
            remove_if_max_drawdown_pct_gt: 50.0,
            remove_if_trades_30d_lt: 2,
            top_k: 30,
        }
    }
}

/// Nightly maintenance output: addresses to add to (or soft-reactivate on)
/// the custom watchlist, and addresses to soft-remove (tombstone, never a
/// hard delete — watchlist removal keeps the row, it only flips
/// `is_active = false`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenancePlan {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

pub struct WatchlistRanker {
    weights: WatchlistWeights,
    thresholds: MaintenanceThresholds,
}

impl WatchlistRanker {
    pub fn new(weights: WatchlistWeights, thresholds: MaintenanceThresholds) -> Self {
        Self {
            weights,
            thresholds,
        }
    }

    /// Rank the auto-discovered population (non-bot wallets meeting the
    /// minimum P&L/trade-count bar are the only ones eligible — the caller
    /// is expected to have already filtered out bots and inactive wallets)
    /// and return the top-K addresses by composite score, highest first.
    pub fn rank_top_k(&self, candidates: &[AutoDiscoveredCandidate]) -> Vec<String> {
        let eligible: Vec<&AutoDiscoveredCandidate> = candidates
            .iter()
            .filter(|c| {
                c.unrealized_pnl_usd > self.thresholds.auto_min_unrealized_pnl_usd
                    && c.trades_count >= self.thresholds.auto_min_trades
            })
            .collect();

        let pnl_values: Vec<f64> = eligible.iter().map(|c| c.unrealized_pnl_usd).collect();

        let mut scored: Vec<(f64, String)> = eligible
            .iter()
            .map(|c| {
                let pnl_pctile = percentile_rank(&pnl_values, c.unrealized_pnl_usd);
                let trades_component = (c.trades_count as f64 * 10.0).min(100.0);
                let early_component = c.earlyscore_median.unwrap_or(0.0);
                let score = self.weights.pnl * pnl_pctile
                    + self.weights.trades * trades_component
                    + self.weights.earlyscore * early_component;
                (score, c.wallet_address.clone())
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());
        scored.truncate(self.thresholds.top_k);
        scored.into_iter().map(|(_, addr)| addr).collect()
    }

    /// The monitored set: `top K auto-discovered ∪ custom`, deduplicated by
    /// address, preserving no particular order beyond "auto-discovered
    /// first" (callers needing a stable order should sort the result
    /// themselves — the set membership is the contract, not the order).
    pub fn monitored_set(
        &self,
        candidates: &[AutoDiscoveredCandidate],
        custom_active: &[String],
    ) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for addr in self.rank_top_k(candidates).into_iter().chain(custom_active.iter().cloned()) {
            if seen.insert(addr.clone()) {
                out.push(addr);
            }
        }
        out
    }

    /// Nightly add/remove maintenance over the full (non-bot) wallet
    /// population, independent of the top-K auto-discovered ranking above —
    /// a wallet can be nightly-added to the custom watchlist even if it
    /// currently falls outside the top K, and can be soft-removed even if
    /// it's still in the top K (the two mechanisms compose; the watchlist
    /// union always re-derives from current `is_active` state).
    pub fn nightly_maintenance(&self, candidates: &[AutoDiscoveredCandidate]) -> MaintenancePlan {
        let mut plan = MaintenancePlan::default();
        for c in candidates {
            let adds = c.trades_count >= self.thresholds.add_min_trades_30d
                && c.realized_pnl_usd >= self.thresholds.add_min_realized_pnl_30d_usd
                && c.best_trade_multiple >= self.thresholds.add_min_best_trade_multiple;
            if adds {
                plan.to_add.push(c.wallet_address.clone());
            }

            let removes = c.realized_pnl_usd < self.thresholds.remove_if_realized_pnl_30d_lt
                || c.max_drawdown_pct > self.thresholds.remove_if_max_drawdown_pct_gt
                || c.trades_count < self.thresholds.remove_if_trades_30d_lt;
            if removes {
                plan.to_remove.push(c.wallet_address.clone());
            }
        }
        debug!(
            adds = plan.to_add.len(),
            removes = plan.to_remove.len(),
            "nightly watchlist maintenance computed"
        );
        plan
    }
}

/// Percentile of `value` within `population`, mapped to `[0, 100]`. Returns
/// 0.0 for an empty population (nothing to rank against).
fn percentile_rank(population: &[f64], value: f64) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    let at_or_below = population.iter().filter(|&&v| v <= value).count();
    100.0 * at_or_below as f64 / population.len() as f64
}
