//! Self-scoring reward/punishment tracker for emitted alerts.
//!
//! Every alert earns or loses points
//! based on confluence size, detection latency, the triggering whale's
//! track record, and the token's subsequent price move. The running score
//! feeds the watchlist ranker's win-rate input (`[[watchlist]]`) and is
//! surfaced read-only on the dashboard — it never gates or alters the
//! paper trader's deterministic entry/exit policy.

use alpha_entities::Alert;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct PerformanceWeights {
    pub fast_detection_bonus: i32,
    pub fast_detection_secs: i64,
    pub slow_detection_penalty: i32,
    pub slow_detection_secs: i64,
    pub confluence_bonus_per_extra_whale: i32,
    pub pump_reward_50pct_1h: i32,
    pub pump_reward_20pct_4h: i32,
    pub dump_penalty_20pct_1h: i32,
    pub profitable_whale_bonus: i32,
    pub unprofitable_whale_penalty: i32,
}

impl Default for PerformanceWeights {
    fn default() -> Self {
        Self {
            fast_detection_bonus: 25,
            fast_detection_secs: 5 * 60,
            slow_detection_penalty: -10,
            slow_detection_secs: 15 * 60,
            confluence_bonus_per_extra_whale: 15,
            pump_reward_50pct_1h: 100,
            pump_reward_20pct_4h: 50,
            dump_penalty_20pct_1h: -50,
            profitable_whale_bonus: 10,
            unprofitable_whale_penalty: -5,
        }
    }
}

/// One scored alert: the score delta plus a human-readable breakdown,
/// matching the original tracker's reward/punishment log lines in spirit.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvaluation {
    pub alert_ts: chrono::DateTime<chrono::Utc>,
    pub token_address: String,
    pub score_delta: i32,
    pub notes: Vec<String>,
}

/// Running totals across every evaluated alert.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceScore {
    pub score: i32,
    pub total_rewards: i32,
    pub total_punishments: i32,
}

impl PerformanceScore {
    pub fn apply(&mut self, evaluation: &AlertEvaluation) {
        self.score += evaluation.score_delta;
        if evaluation.score_delta > 0 {
            self.total_rewards += evaluation.score_delta;
        } else if evaluation.score_delta < 0 {
            self.total_punishments += evaluation.score_delta.abs();
        }
    }
}

/// Stateless evaluator — every input needed to score one alert is passed
/// in by the caller (the dashboard/maintenance job reads it out of
/// `EntityStore`/`PriceSource` history); this module never queries a store
/// itself, matching the rest of `alpha-analytics`.
pub struct PerformanceTracker {
    weights: PerformanceWeights,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self {
            weights: PerformanceWeights::default(),
        }
    }

    pub fn with_weights(weights: PerformanceWeights) -> Self {
        Self { weights }
    }

    /// `detection_latency_secs` is the time between the triggering trade
    /// and the alert being emitted. `price_change_pct_1h`/`_4h` are the
    /// token's price move in the hours following the alert, when known
    /// (`None` if not enough time has passed yet to evaluate). `whale_total_pnl_usd`
    /// is the triggering wallet's realized+unrealized P&L at alert time, for
    /// single-wallet alerts only (confluence alerts pass `None` — no single
    /// whale to validate).
    pub fn evaluate_alert(
        &self,
        alert: &Alert,
        detection_latency_secs: i64,
        price_change_pct_1h: Option<f64>,
        price_change_pct_4h: Option<f64>,
        whale_total_pnl_usd: Option<f64>,
    ) -> AlertEvaluation {
        let w = &self.weights;
        let mut score_delta = 0;
        let mut notes = Vec::new();

        if detection_latency_secs <= w.fast_detection_secs {
            score_delta += w.fast_detection_bonus;
            notes.push(format!("+{}: alert within {}s of trade", w.fast_detection_bonus, w.fast_detection_secs));
        } else if detection_latency_secs > w.slow_detection_secs {
            score_delta += w.slow_detection_penalty;
            notes.push(format!("{}: alert {}s after trade (slow)", w.slow_detection_penalty, detection_latency_secs));
        }

        let num_wallets = alert.wallet_set.len();
        if num_wallets > 1 {
            let bonus = w.confluence_bonus_per_extra_whale * (num_wallets as i32 - 1);
            score_delta += bonus;
            notes.push(format!("+{bonus}: confluence across {num_wallets} whales"));
        }

        if let Some(pnl) = whale_total_pnl_usd {
            if pnl > 0.0 {
                score_delta += w.profitable_whale_bonus;
                notes.push(format!("+{}: triggering whale is profitable (${pnl:.0})", w.profitable_whale_bonus));
            } else {
                score_delta += w.unprofitable_whale_penalty;
                notes.push(format!("{}: triggering whale has negative P&L (${pnl:.0})", w.unprofitable_whale_penalty));
            }
        }

        if let Some(change) = price_change_pct_1h {
            if change >= 0.50 {
                score_delta += w.pump_reward_50pct_1h;
                notes.push(format!("+{}: token up {:.0}% within 1h", w.pump_reward_50pct_1h, change * 100.0));
            } else if change <= -0.20 {
                score_delta += w.dump_penalty_20pct_1h;
                notes.push(format!("{}: token down {:.0}% within 1h", w.dump_penalty_20pct_1h, change * 100.0));
            }
        }
        if let Some(change) = price_change_pct_4h {
            if change >= 0.20 {
                score_delta += w.pump_reward_20pct_4h;
                notes.push(format!("+{}: token up {:.0}% within 4h", w.pump_reward_20pct_4h, change * 100.0));
            }
        }

        debug!(token = %alert.token_address, score_delta, "alert outcome scored");

        AlertEvaluation {
            alert_ts: alert.ts,
            token_address: alert.token_address.clone(),
            score_delta,
            notes,
        }
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_entities::{AlertType, ChainId};
    use chrono::Utc;

    fn alert(wallet_set: Vec<&str>) -> Alert {
        Alert {
            id: Some(1),
            ts: Utc::now(),
            alert_type: if wallet_set.len() > 1 { AlertType::Confluence } else { AlertType::Single },
            token_address: "0xtoken".into(),
            chain_id: ChainId::Ethereum,
            wallet_set: wallet_set.into_iter().map(String::from).collect(),
            rule_id: Some("buy-confluence".into()),
            payload: serde_json::json!({}),
        }
    }

    #[test]
    fn fast_confluence_alert_that_pumps_scores_positively() {
        let tracker = PerformanceTracker::new();
        let eval = tracker.evaluate_alert(&alert(vec!["w1", "w2", "w3"]), 60, Some(0.6), None, None);
        // fast(25) + confluence(15*2=30) + pump(100) = 155
        assert_eq!(eval.score_delta, 155);
    }

    #[test]
    fn slow_single_wallet_alert_that_dumps_scores_negatively() {
        let tracker = PerformanceTracker::new();
        let eval = tracker.evaluate_alert(&alert(vec!["w1"]), 20 * 60, Some(-0.3), None, Some(-500.0));
        // slow(-10) + unprofitable_whale(-5) + dump(-50) = -65
        assert_eq!(eval.score_delta, -65);
    }

    #[test]
    fn score_accumulates_rewards_and_punishments_separately() {
        let tracker = PerformanceTracker::new();
        let mut score = PerformanceScore::default();
        score.apply(&tracker.evaluate_alert(&alert(vec!["w1", "w2"]), 60, Some(0.6), None, None));
        score.apply(&tracker.evaluate_alert(&alert(vec!["w1"]), 20 * 60, Some(-0.3), None, None));
        assert!(score.total_rewards > 0);
        assert!(score.total_punishments > 0);
        assert_eq!(score.score, score.total_rewards - score.total_punishments);
    }
}
