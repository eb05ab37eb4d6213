//! FIFO realized/unrealized P&L.
//!
//! Given the chronologically ordered trades for one `(wallet, token)` pair,
//! maintains a FIFO queue of open lots and matches sells against the oldest
//! lots first, prorating cost basis on partial consumption.

use alpha_entities::{Side, Trade};
use tracing::warn;

/// One open buy lot: `(quantity, cost_basis_usd_including_fee)`.
#[derive(Debug, Clone, Copy)]
struct Lot {
    qty: f64,
    cost_basis_usd: f64,
}

/// P&L result for a single `(wallet, token)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenPnl {
    pub realized_pnl_usd: f64,
    pub unrealized_pnl_usd: f64,
    pub open_qty: f64,
    pub open_cost_basis_usd: f64,
}

/// FIFO matching engine. Stateless — every call recomputes from the full
/// trade slice, so re-running it over the same history always yields the
/// same result.
pub struct FifoEngine;

impl FifoEngine {
    /// `trades` MUST already be in ascending timestamp order and belong to a
    /// single `(wallet, token)` pair. `mark_price` is the price to value
    /// remaining open lots at — callers resolve the price-router-vs-last-
    /// trade-price fallback themselves before calling in.
    pub fn compute_token_pnl(trades: &[Trade], mark_price: f64) -> TokenPnl {
        let mut lots: Vec<Lot> = Vec::new();
        let mut realized_pnl_usd = 0.0;

        for trade in trades {
            match trade.side {
                Side::Buy => {
                    lots.push(Lot {
                        qty: trade.qty_token,
                        cost_basis_usd: trade.usd_value + trade.fee(),
                    });
                }
                Side::Sell => {
                    let mut remaining_sell_qty = trade.qty_token;
                    let sell_proceeds = trade.usd_value - trade.fee();

                    while remaining_sell_qty > 0.0 && !lots.is_empty() {
                        let lot = lots[0];

                        if remaining_sell_qty >= lot.qty {
                            remaining_sell_qty -= lot.qty;
                            let proportion = lot.qty / trade.qty_token;
                            realized_pnl_usd += (sell_proceeds * proportion) - lot.cost_basis_usd;
                            lots.remove(0);
                        } else {
                            let proportion = remaining_sell_qty / trade.qty_token;
                            let cost_proportion =
                                (remaining_sell_qty / lot.qty) * lot.cost_basis_usd;
                            realized_pnl_usd += (sell_proceeds * proportion) - cost_proportion;

                            lots[0] = Lot {
                                qty: lot.qty - remaining_sell_qty,
                                cost_basis_usd: lot.cost_basis_usd - cost_proportion,
                            };
                            remaining_sell_qty = 0.0;
                        }
                    }

                    if remaining_sell_qty > 0.0 {
                        warn!(
                            tx_hash = %trade.tx_hash,
                            excess_qty = remaining_sell_qty,
                            "sell exceeds open FIFO queue; excess truncated, not modeled as short"
                        );
                    }
                }
            }
        }

        let open_qty: f64 = lots.iter().map(|l| l.qty).sum();
        let open_cost_basis_usd: f64 = lots.iter().map(|l| l.cost_basis_usd).sum();
        let unrealized_pnl_usd = lots
            .iter()
            .map(|l| l.qty * mark_price - l.cost_basis_usd)
            .sum();

        TokenPnl {
            realized_pnl_usd,
            unrealized_pnl_usd,
            open_qty,
            open_cost_basis_usd,
        }
    }

    /// `best_trade_multiple = max over tokens of avg_sell_price / avg_buy_price`,
    /// defined only for tokens with both a buy and a sell; default 1.0 when
    /// no token qualifies.
    pub fn best_trade_multiple<'a>(trades_by_token: impl Iterator<Item = &'a [Trade]>) -> f64 {
        let mut best = 1.0f64;
        for trades in trades_by_token {
            let buys: Vec<&Trade> = trades.iter().filter(|t| t.side == Side::Buy).collect();
            let sells: Vec<&Trade> = trades.iter().filter(|t| t.side == Side::Sell).collect();
            if buys.is_empty() || sells.is_empty() {
                continue;
            }
            let avg_buy = buys.iter().map(|t| t.price_usd).sum::<f64>() / buys.len() as f64;
            let avg_sell = sells.iter().map(|t| t.price_usd).sum::<f64>() / sells.len() as f64;
            if avg_buy > 0.0 {
                best = best.max(avg_sell / avg_buy);
            }
        }
        best
    }
}
