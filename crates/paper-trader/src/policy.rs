//! Pure entry-sizing and exit-policy decisions, kept free of any
//! locking/persistence so the state-machine rules are unit testable on
//! their own.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Entry sizing/exit tier selected by the number of independent whales in
/// the triggering confluence. The 5/7/10 tiers are the "confident"
/// schedule; anything below 5 (including the simpler 2-whale default)
/// uses the same entry as the 5-6 tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingTier {
    pub size_pct_of_cash: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
}

pub fn sizing_for_whale_count(num_whales: usize) -> SizingTier {
    if num_whales >= 10 {
        SizingTier {
            size_pct_of_cash: 0.60,
            take_profit_pct: 0.40,
            stop_loss_pct: -0.15,
        }
    } else if num_whales >= 7 {
        SizingTier {
            size_pct_of_cash: 0.50,
            take_profit_pct: 0.35,
            stop_loss_pct: -0.15,
        }
    } else {
        SizingTier {
            size_pct_of_cash: 0.40,
            take_profit_pct: 0.30,
            stop_loss_pct: -0.15,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExitPolicyConfig {
    pub max_hold: Duration,
    pub trailing_trigger_pct: f64,
    pub trailing_drawdown_pct: f64,
}

impl Default for ExitPolicyConfig {
    fn default() -> Self {
        Self {
            max_hold: Duration::hours(24),
            trailing_trigger_pct: 0.15,
            trailing_drawdown_pct: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    MaxHold,
    TrailingStop,
    WhaleExit,
}

/// First-hit-wins exit evaluation, checked in this fixed order:
/// take-profit, stop-loss, max-hold, trailing-stop, whale-exit confluence.
/// `peak_profit_pct` is the caller's current high-water mark for this
/// position (already updated for the current return before calling, or
/// `None` if the trailing trigger has never fired) — this function never
/// mutates it, it only reads.
#[allow(clippy::too_many_arguments)]
pub fn evaluate_exit(
    current_return_pct: f64,
    take_profit_pct: f64,
    stop_loss_pct: f64,
    bought_at: DateTime<Utc>,
    now: DateTime<Utc>,
    peak_profit_pct: Option<f64>,
    whale_sell_confluence: bool,
    config: &ExitPolicyConfig,
) -> Option<ExitReason> {
    if current_return_pct >= take_profit_pct {
        return Some(ExitReason::TakeProfit);
    }
    if current_return_pct <= stop_loss_pct {
        return Some(ExitReason::StopLoss);
    }
    if now - bought_at >= config.max_hold {
        return Some(ExitReason::MaxHold);
    }
    if let Some(peak) = peak_profit_pct {
        if peak >= config.trailing_trigger_pct && peak - current_return_pct >= config.trailing_drawdown_pct {
            return Some(ExitReason::TrailingStop);
        }
    }
    if whale_sell_confluence {
        return Some(ExitReason::WhaleExit);
    }
    None
}

/// Folds the current return into the running peak, returning the updated
/// peak. The peak only starts tracking once the return has reached the
/// trailing trigger threshold at least once.
pub fn update_peak(
    peak_profit_pct: Option<f64>,
    current_return_pct: f64,
    config: &ExitPolicyConfig,
) -> Option<f64> {
    if current_return_pct >= config.trailing_trigger_pct {
        Some(peak_profit_pct.map_or(current_return_pct, |p| p.max(current_return_pct)))
    } else {
        peak_profit_pct
    }
}
