//! Bot / MEV-sniper detection heuristics.
//!
//! Four independent signals; any one firing flags the wallet. Flagging is
//! sticky at the store layer — this module only decides yes/no for a given
//! snapshot of trades, it never un-flags anything.

use alpha_entities::{Side, Trade, Wallet};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct BotFilterConfig {
    /// Below this average hold time (seconds), with enough trades to be
    /// meaningful, the wallet looks like a sniper bot.
    pub max_avg_hold_secs: i64,
    /// Minimum trade count before the hold-time signal is trusted at all.
    pub min_trades_for_hold_time_signal: usize,
    /// Two trades this close together count as "same block" for the
    /// consecutive-trade-spacing signal.
    pub same_block_window_secs: i64,
    pub same_block_ratio_threshold: f64,
    /// A wallet that buys-once-sells-once on almost every token it touches
    /// looks like an automated flipper rather than a discretionary trader.
    pub single_flip_ratio_threshold: f64,
}

impl Default for BotFilterConfig {
    fn default() -> Self {
        Self {
            max_avg_hold_secs: 60,
            min_trades_for_hold_time_signal: 10,
            same_block_window_secs: 15,
            same_block_ratio_threshold: 0.5,
            single_flip_ratio_threshold: 0.7,
        }
    }
}

pub struct BotFilter {
    config: BotFilterConfig,
}

impl BotFilter {
    pub fn new() -> Self {
        Self {
            config: BotFilterConfig::default(),
        }
    }

    pub fn with_config(config: BotFilterConfig) -> Self {
        Self { config }
    }

    /// `trades` is every trade by this wallet, in any order; this function
    /// sorts its own copy by timestamp before evaluating time-sensitive
    /// signals.
    pub fn is_bot(&self, wallet: &Wallet, trades: &[Trade]) -> bool {
        if wallet.is_contract {
            debug!(wallet = %wallet.address, "bot signal: is_contract");
            return true;
        }

        let mut sorted: Vec<&Trade> = trades.iter().collect();
        sorted.sort_by_key(|t| t.ts);

        if self.avg_hold_time_flags(&sorted) {
            debug!(wallet = %wallet.address, "bot signal: avg_hold_time");
            return true;
        }
        if self.same_block_ratio_flags(&sorted) {
            debug!(wallet = %wallet.address, "bot signal: same_block_ratio");
            return true;
        }
        if self.single_flip_ratio_flags(&sorted) {
            debug!(wallet = %wallet.address, "bot signal: single_flip_ratio");
            return true;
        }

        false
    }

    /// Pairs each buy with the next chronological sell of the same token and
    /// averages the hold time. Exempt below `min_trades_for_hold_time_signal`
    /// total trades — too few data points to trust the average.
    fn avg_hold_time_flags(&self, sorted: &[&Trade]) -> bool {
        if sorted.len() < self.config.min_trades_for_hold_time_signal {
            return false;
        }

        let mut open_buy: HashMap<&str, &Trade> = HashMap::new();
        let mut hold_secs: Vec<i64> = Vec::new();

        for trade in sorted {
            match trade.side {
                Side::Buy => {
                    open_buy.entry(trade.token_address.as_str()).or_insert(trade);
                }
                Side::Sell => {
                    if let Some(buy) = open_buy.remove(trade.token_address.as_str()) {
                        hold_secs.push((trade.ts - buy.ts).num_seconds());
                    }
                }
            }
        }

        if hold_secs.is_empty() {
            return false;
        }
        let avg = hold_secs.iter().sum::<i64>() as f64 / hold_secs.len() as f64;
        avg < self.config.max_avg_hold_secs as f64
    }

    /// Computed across ALL of the wallet's trades in chronological order —
    /// not per token — matching how a sniper bot's cadence shows up
    /// regardless of which token it is hitting at the time.
    fn same_block_ratio_flags(&self, sorted: &[&Trade]) -> bool {
        if sorted.len() < 2 {
            return false;
        }
        let close_pairs = sorted
            .windows(2)
            .filter(|w| (w[1].ts - w[0].ts).num_seconds() <= self.config.same_block_window_secs)
            .count();
        let ratio = close_pairs as f64 / (sorted.len() - 1) as f64;
        ratio > self.config.same_block_ratio_threshold
    }

    /// Fraction of distinct tokens traded where the wallet made exactly one
    /// buy and one sell and nothing else.
    fn single_flip_ratio_flags(&self, sorted: &[&Trade]) -> bool {
        let mut per_token: HashMap<&str, (u32, u32)> = HashMap::new();
        for trade in sorted {
            let entry = per_token.entry(trade.token_address.as_str()).or_insert((0, 0));
            match trade.side {
                Side::Buy => entry.0 += 1,
                Side::Sell => entry.1 += 1,
            }
        }
        if per_token.is_empty() {
            return false;
        }
        let single_flips = per_token
            .values()
            .filter(|(buys, sells)| *buys == 1 && *sells == 1)
            .count();
        let ratio = single_flips as f64 / per_token.len() as f64;
        ratio > self.config.single_flip_ratio_threshold
    }
}

impl Default for BotFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_entities::ChainId;
    use chrono::{TimeZone, Utc};

    fn wallet(is_contract: bool) -> Wallet {
        let now = Utc::now();
        Wallet {
            address: "0xw".into(),
            chain_id: ChainId::Ethereum,
            is_contract,
            is_bot: false,
            first_seen_at: now,
            last_active_at: Some(now),
        }
    }

    fn trade(token: &str, side: Side, secs_offset: i64) -> Trade {
        Trade {
            tx_hash: format!("{token}-{side}-{secs_offset}"),
            ts: Utc.timestamp_opt(1_700_000_000 + secs_offset, 0).unwrap(),
            chain_id: ChainId::Ethereum,
            wallet_address: "0xw".into(),
            token_address: token.into(),
            side,
            qty_token: 1.0,
            price_usd: 1.0,
            usd_value: 1.0,
            fee_usd: None,
            venue: None,
        }
    }

    #[test]
    fn contract_wallet_is_always_flagged() {
        let filter = BotFilter::new();
        assert!(filter.is_bot(&wallet(true), &[]));
    }

    #[test]
    fn fast_flip_across_many_tokens_flags_on_hold_time() {
        let filter = BotFilter::new();
        let mut trades = Vec::new();
        for i in 0..10 {
            let token = format!("tok{i}");
            trades.push(trade(&token, Side::Buy, i * 1000));
            trades.push(trade(&token, Side::Sell, i * 1000 + 5));
        }
        assert!(filter.is_bot(&wallet(false), &trades));
    }

    #[test]
    fn patient_trader_with_long_holds_is_not_flagged() {
        let filter = BotFilter::new();
        let mut trades = Vec::new();
        for i in 0..10 {
            let token = format!("tok{i}");
            trades.push(trade(&token, Side::Buy, i * 100_000));
            trades.push(trade(&token, Side::Sell, i * 100_000 + 86_400));
        }
        assert!(!filter.is_bot(&wallet(false), &trades));
    }

    #[test]
    fn same_block_ratio_computed_across_all_trades_not_per_token() {
        let filter = BotFilter::new();
        // Interleaved trades across two tokens, each pair 5s apart — well
        // under the 10-trade hold-time exemption but enough to exercise the
        // global spacing signal directly.
        let trades = vec![
            trade("a", Side::Buy, 0),
            trade("b", Side::Buy, 5),
            trade("a", Side::Sell, 10),
            trade("b", Side::Sell, 15),
        ];
        let filter_low_min = BotFilter::with_config(BotFilterConfig {
            min_trades_for_hold_time_signal: 1000,
            ..BotFilterConfig::default()
        });
        assert!(filter_low_min.is_bot(&wallet(false), &trades));
        // The default-tuned filter would also fire the hold-time signal
        // first on this fixture; both paths flag the wallet.
        assert!(filter.is_bot(&wallet(false), &trades));
    }

    #[test]
    fn single_flip_ratio_flags_pure_one_shot_flippers() {
        let filter = BotFilter::with_config(BotFilterConfig {
            min_trades_for_hold_time_signal: 1000,
            same_block_ratio_threshold: 2.0, // disable that signal for this test
            ..BotFilterConfig::default()
        });
        let mut trades = Vec::new();
        for i in 0..5 {
            let token = format!("tok{i}");
            trades.push(trade(&token, Side::Buy, i * 100_000));
            trades.push(trade(&token, Side::Sell, i * 100_000 + 100_000));
        }
        assert!(filter.is_bot(&wallet(false), &trades));
    }
}
