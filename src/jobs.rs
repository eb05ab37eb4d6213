//! Concrete `Job` implementations for the scheduled cadence table.
//! Each job borrows the shared [`AppContext`] and nothing else — state
//! lives in the entity store, the price router, the confluence store, or
//! the paper trader, never in the job struct itself, so a job is safe to
//! run again immediately after a failed or timed-out attempt.

use crate::context::AppContext;
use alpha_adapters::{classify_transfer, detect_pools, is_excluded};
use alpha_analytics::{
    AutoDiscoveredCandidate, BotFilter, EarlyScorer, FifoEngine, MaintenanceThresholds,
    PerformanceScore, PerformanceTracker, WatchlistRanker, WatchlistWeights,
};
use alpha_entities::{ChainId, CustomWatchlistWallet, Position, Side, Token, Trade, WalletStats30D};
use alpha_paper_trader::EntryRequest;
use alpha_scheduler::Job;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use tracing::{info, warn};

pub struct RunnerSeedJob {
    pub ctx: AppContext,
}

#[async_trait]
impl Job for RunnerSeedJob {
    fn id(&self) -> &'static str {
        "runner_seed"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        for chain in &self.ctx.config.chains.active {
            for source in self.ctx.trending_sources.iter() {
                let entries = match source.top_n(*chain, 50).await {
                    Ok(entries) => entries,
                    Err(err) => {
                        warn!(source = source.name(), %chain, error = %err, "trending fetch failed");
                        continue;
                    }
                };
                for entry in entries {
                    let mut token = self
                        .ctx
                        .store
                        .get_token(&entry.token_address)
                        .await?
                        .unwrap_or_else(|| Token::new(entry.token_address.clone(), entry.chain_id, now));
                    token.symbol = entry.symbol.clone().or(token.symbol);
                    token.last_price_usd = entry.price_usd.or(token.last_price_usd);
                    token.last_liquidity_usd = entry.liquidity_usd.or(token.last_liquidity_usd);
                    self.ctx.store.upsert_token(token).await?;

                    self.ctx
                        .store
                        .insert_seed_token(alpha_entities::SeedToken {
                            id: None,
                            token_address: entry.token_address,
                            chain_id: entry.chain_id,
                            source: source.name().to_string(),
                            snapshot_ts: now,
                            rank_24h: entry.rank_24h,
                            vol_24h_usd: entry.vol_24h_usd,
                            pct_change_24h: entry.pct_change_24h,
                        })
                        .await?;
                }
            }
        }
        Ok(())
    }
}

/// Shared harvesting logic for `wallet_discovery` and `whale_discovery`:
/// page a seed token's recent transfers, classify buy/sell via the pool
/// heuristic, and upsert the resulting wallets/trades. `min_usd_value`
/// filters which classified trades are kept (0.0 keeps everything).
async fn harvest_seed_token_trades(
    ctx: &AppContext,
    chain: ChainId,
    token_address: &str,
    limit: usize,
    min_occurrences: usize,
    min_usd_value: f64,
) -> anyhow::Result<()> {
    let Some(adapter) = ctx.chain_adapter(chain) else {
        return Ok(());
    };
    let transfers = match adapter.recent_token_buyers(token_address, limit).await {
        Ok(transfers) => transfers,
        Err(err) => {
            warn!(%chain, token = token_address, error = %err, "token transfer fetch failed");
            return Ok(());
        }
    };
    let (buy_pools, sell_pools) = detect_pools(&transfers, min_occurrences);
    let now = Utc::now();

    for transfer in &transfers {
        let Some((side, wallet_address)) = classify_transfer(transfer, &buy_pools, &sell_pools) else {
            continue;
        };
        if side != Side::Buy {
            continue;
        }
        if is_excluded(chain, token_address) {
            continue;
        }

        let token = ctx.store.get_token(token_address).await?;
        let Some(token) = token else {
            warn!(token = token_address, "skipping trade for un-upserted token");
            continue;
        };
        let price_usd = token.last_price_usd.unwrap_or(0.0);
        let usd_value = transfer.raw_amount * price_usd;
        if usd_value < min_usd_value {
            continue;
        }

        let wallet = ctx
            .store
            .get_wallet(&wallet_address)
            .await?
            .unwrap_or_else(|| alpha_entities::Wallet::new(wallet_address.clone(), chain, now));
        ctx.store.upsert_wallet(wallet).await?;

        ctx.store
            .insert_trade(Trade {
                tx_hash: transfer.tx_hash.clone(),
                ts: transfer.ts,
                chain_id: chain,
                wallet_address,
                token_address: token_address.to_string(),
                side,
                qty_token: transfer.raw_amount,
                price_usd,
                usd_value,
                fee_usd: None,
                venue: None,
            })
            .await?;
    }
    Ok(())
}

pub struct WalletDiscoveryJob {
    pub ctx: AppContext,
}

#[async_trait]
impl Job for WalletDiscoveryJob {
    fn id(&self) -> &'static str {
        "wallet_discovery"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let since = Utc::now() - Duration::hours(self.ctx.config.scheduler.recent_seed_horizon_hours);
        let seeds = self.ctx.store.recent_seed_tokens(since).await?;
        for seed in seeds {
            harvest_seed_token_trades(
                &self.ctx,
                seed.chain_id,
                &seed.token_address,
                200,
                self.ctx.config.scheduler.pool_detect_min_occurrences,
                0.0,
            )
            .await?;
        }
        Ok(())
    }
}

pub struct WhaleDiscoveryJob {
    pub ctx: AppContext,
}

#[async_trait]
impl Job for WhaleDiscoveryJob {
    fn id(&self) -> &'static str {
        "whale_discovery"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let since = Utc::now() - Duration::hours(self.ctx.config.scheduler.recent_seed_horizon_hours);
        let seeds = self.ctx.store.recent_seed_tokens(since).await?;
        for seed in seeds {
            let Some(token) = self.ctx.store.get_token(&seed.token_address).await? else {
                continue;
            };
            if token.last_liquidity_usd.unwrap_or(0.0) < self.ctx.config.scheduler.whale_min_usd_value {
                continue;
            }
            harvest_seed_token_trades(
                &self.ctx,
                seed.chain_id,
                &seed.token_address,
                1000,
                self.ctx.config.scheduler.pool_detect_min_occurrences,
                self.ctx.config.scheduler.whale_min_usd_value,
            )
            .await?;
        }
        Ok(())
    }
}

/// Builds the currently monitored wallet set (top-K auto-discovered union
/// custom watchlist) from the store's current `WalletStats30D` population,
/// exactly as `wallet_monitoring` and `watchlist_maintenance` both need it.
async fn monitored_wallets(ctx: &AppContext) -> anyhow::Result<Vec<String>> {
    let stats = ctx.store.all_wallet_stats().await?;
    let wallets = ctx.store.all_wallets().await?;
    let bot_flags: HashMap<&str, bool> = wallets.iter().map(|w| (w.address.as_str(), w.is_bot)).collect();

    let candidates: Vec<AutoDiscoveredCandidate> = stats
        .iter()
        .filter(|s| !bot_flags.get(s.wallet_address.as_str()).copied().unwrap_or(false))
        .map(|s| AutoDiscoveredCandidate {
            wallet_address: s.wallet_address.clone(),
            unrealized_pnl_usd: s.unrealized_pnl_usd,
            realized_pnl_usd: s.realized_pnl_usd,
            trades_count: s.trades_count,
            earlyscore_median: s.earlyscore_median,
            best_trade_multiple: s.best_trade_multiple,
            max_drawdown_pct: s.max_drawdown_pct,
        })
        .collect();

    let custom = ctx.store.active_custom_watchlist().await?;
    let custom_addresses: Vec<String> = custom.into_iter().map(|c| c.address).collect();

    let weights = win_rate_weights(ctx).await?;
    let thresholds = MaintenanceThresholds {
        auto_min_unrealized_pnl_usd: ctx.config.watchlist.auto_min_unrealized_pnl_usd,
        auto_min_trades: ctx.config.watchlist.auto_min_trades,
        add_min_trades_30d: ctx.config.watchlist.add_min_trades_30d,
        add_min_realized_pnl_30d_usd: ctx.config.watchlist.add_min_realized_pnl_30d_usd,
        add_min_best_trade_multiple: ctx.config.watchlist.add_min_best_trade_multiple,
        remove_if_realized_pnl_30d_lt: ctx.config.watchlist.remove_if_realized_pnl_30d_lt,
        remove_if_max_drawdown_pct_gt: ctx.config.watchlist.remove_if_max_drawdown_pct_gt,
        remove_if_trades_30d_lt: ctx.config.watchlist.remove_if_trades_30d_lt,
        top_k: ctx.config.watchlist.top_k,
    };
    let ranker = WatchlistRanker::new(weights, thresholds);
    Ok(ranker.monitored_set(&candidates, &custom_addresses))
}

/// The trailing 7-day alert win-rate feeding `WatchlistWeights::adapt`: the
/// fraction of confluence alerts followed by a winning paper-trade close on
/// the same token within the alert window, blended with the normalized
/// self-scoring [`PerformanceScore`]. Recomputed statelessly from
/// `Alert`/closed-trade history on every call — bounded and stateless
/// across restarts, never persisted on its own.
pub async fn win_rate_weights(ctx: &AppContext) -> anyhow::Result<WatchlistWeights> {
    let since = Utc::now() - Duration::days(7);
    let alerts = ctx.store.recent_alerts(since).await?;
    if alerts.is_empty() {
        return Ok(WatchlistWeights::default());
    }
    let snapshot = ctx.paper_trader.snapshot().await;
    let mut wins = 0usize;
    let mut total = 0usize;
    for alert in &alerts {
        if let Some(closed) = snapshot
            .closed_trades
            .iter()
            .find(|c| c.token_address == alert.token_address && c.closed_at >= alert.ts)
        {
            total += 1;
            if closed.pnl_usd >= 0.0 {
                wins += 1;
            }
        }
    }
    let pnl_win_rate = if total == 0 { None } else { Some(wins as f64 / total as f64) };

    let (_, performance_win_rate) = score_recent_alerts(ctx, &alerts).await;

    let blended = match (pnl_win_rate, performance_win_rate) {
        (Some(a), Some(b)) => (a + b) / 2.0,
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return Ok(WatchlistWeights::default()),
    };
    Ok(WatchlistWeights::adapt(blended))
}

/// Scores every given alert with [`PerformanceTracker`] and returns the
/// accumulated [`PerformanceScore`] plus a normalized `[0, 1]` "win rate"
/// derived from its sign and magnitude (clamped `0.5 + score / 1000`), for
/// blending into [`win_rate_weights`] and for the dashboard's performance
/// endpoint. Price-move inputs are omitted (`None`) here — recomputing them
/// would require historical price reconstruction, which this system never
/// stores; only latency, confluence size, and whale track record are
/// scored from data this system actually retains.
pub async fn score_recent_alerts(
    ctx: &AppContext,
    alerts: &[alpha_entities::Alert],
) -> (PerformanceScore, Option<f64>) {
    let tracker = PerformanceTracker::new();
    let mut score = PerformanceScore::default();
    for alert in alerts {
        let whale_pnl = if alert.wallet_set.len() == 1 {
            match ctx.store.get_wallet_stats(&alert.wallet_set[0]).await {
                Ok(Some(stats)) => Some(stats.realized_pnl_usd + stats.unrealized_pnl_usd),
                _ => None,
            }
        } else {
            None
        };
        // Detection latency is poll-interval-bound and not separately
        // recorded per alert; treated as immediate for scoring purposes.
        let evaluation = tracker.evaluate_alert(alert, 0, None, None, whale_pnl);
        score.apply(&evaluation);
    }
    if alerts.is_empty() {
        (score, None)
    } else {
        let normalized = (0.5 + score.score as f64 / 1000.0).clamp(0.0, 1.0);
        (score, Some(normalized))
    }
}

pub struct WalletMonitoringJob {
    pub ctx: AppContext,
}

#[async_trait]
impl Job for WalletMonitoringJob {
    fn id(&self) -> &'static str {
        "wallet_monitoring"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let monitored = monitored_wallets(&self.ctx).await?;
        let min_wallets = self.ctx.config.confluence.min_wallets;

        for wallet_address in monitored {
            let Some(wallet) = self.ctx.store.get_wallet(&wallet_address).await? else {
                continue;
            };
            if wallet.is_bot {
                continue;
            }
            let Some(adapter) = self.ctx.chain_adapter(wallet.chain_id) else {
                continue;
            };
            let trades = match adapter.recent_wallet_trades(&wallet_address, 50).await {
                Ok(trades) => trades,
                Err(err) => {
                    warn!(wallet = %wallet_address, error = %err, "wallet trade fetch failed");
                    continue;
                }
            };

            for trade in trades {
                if is_excluded(trade.chain_id, &trade.token_address) {
                    continue;
                }
                let inserted = self.ctx.store.insert_trade(trade.clone()).await?;
                if !inserted {
                    continue;
                }
                self.ctx.store.touch_wallet_activity(&wallet_address, trade.ts).await?;

                self.ctx.confluence.record_trade(
                    trade.side,
                    trade.chain_id,
                    &trade.token_address,
                    &wallet_address,
                    trade.ts,
                    serde_json::json!({ "usd_value": trade.usd_value }),
                );

                let Some(events) = self.ctx.confluence.check(
                    trade.side,
                    trade.chain_id,
                    &trade.token_address,
                    min_wallets,
                    now,
                ) else {
                    continue;
                };

                self.react_to_confluence(trade.side, trade.chain_id, &trade.token_address, &events, now)
                    .await?;
            }
        }
        Ok(())
    }
}

impl WalletMonitoringJob {
    async fn react_to_confluence(
        &self,
        side: Side,
        chain_id: ChainId,
        token_address: &str,
        events: &[alpha_confluence::ConfluenceEntry],
        now: chrono::DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let wallet_set: Vec<String> = events.iter().map(|e| e.wallet_address.clone()).collect();

        match side {
            Side::Buy => {
                let token = self.ctx.store.get_token(token_address).await?;
                let Some(token) = token else { return Ok(()) };
                let price_usd = token.last_price_usd.unwrap_or(0.0);

                if let Some(position) = self
                    .ctx
                    .paper_trader
                    .try_enter(
                        EntryRequest {
                            token_address: token_address.to_string(),
                            chain_id,
                            price_usd,
                            num_whales: wallet_set.len(),
                            vol_24h_usd: None,
                            liquidity_usd: token.last_liquidity_usd,
                        },
                        now,
                    )
                    .await
                {
                    info!(token = token_address, num_whales = position.num_whales, "buy confluence opened paper position");
                }

                self.ctx
                    .store
                    .insert_alert(alpha_entities::Alert {
                        id: None,
                        ts: now,
                        alert_type: alpha_entities::AlertType::Confluence,
                        token_address: token_address.to_string(),
                        chain_id,
                        wallet_set: wallet_set.clone(),
                        rule_id: Some("buy-confluence".to_string()),
                        payload: serde_json::json!({ "side": "buy", "price_usd": price_usd }),
                    })
                    .await?;
                self.ctx
                    .alerter
                    .emit(alpha_adapters::AlertPayload {
                        ts: now,
                        alert_type: "confluence",
                        token_address: token_address.to_string(),
                        chain_id: chain_id.to_string(),
                        wallet_set,
                        rule_id: Some("buy-confluence".to_string()),
                        detail: serde_json::json!({ "side": "buy" }),
                    })
                    .await;
            }
            Side::Sell => {
                // Whale-exit confluence: surfaced here so `position_management`
                // can pass `whale_sell_confluence = true` into the next mark;
                // the paper trader itself never initiates an exit outside a mark.
                self.ctx
                    .store
                    .insert_alert(alpha_entities::Alert {
                        id: None,
                        ts: now,
                        alert_type: alpha_entities::AlertType::Confluence,
                        token_address: token_address.to_string(),
                        chain_id,
                        wallet_set,
                        rule_id: Some("sell-confluence".to_string()),
                        payload: serde_json::json!({ "side": "sell" }),
                    })
                    .await?;
            }
        }
        Ok(())
    }
}

pub struct StatsRollupJob {
    pub ctx: AppContext,
}

#[async_trait]
impl Job for StatsRollupJob {
    fn id(&self) -> &'static str {
        "stats_rollup"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let since = now - Duration::days(self.ctx.config.scheduler.wallet_backfill_days);
        let bot_filter = BotFilter::new();
        let earlyscorer = EarlyScorer::new();

        let wallets = self.ctx.store.all_wallets().await?;
        for wallet in wallets {
            let trades = self.ctx.store.trades_for_wallet(&wallet.address, since).await?;

            if bot_filter.is_bot(&wallet, &trades) {
                self.ctx.store.flag_bot(&wallet.address).await?;
                continue;
            }
            if wallet.is_bot {
                continue;
            }

            let mut by_token: HashMap<&str, Vec<Trade>> = HashMap::new();
            for trade in &trades {
                by_token.entry(trade.token_address.as_str()).or_default().push(trade.clone());
            }

            let mut realized_total = 0.0;
            let mut unrealized_total = 0.0;
            let mut early_scores = Vec::new();
            let mut grouped: Vec<Vec<Trade>> = Vec::new();

            for (token_address, mut token_trades) in by_token {
                token_trades.sort_by_key(|t| t.ts);
                let mark_price = self
                    .ctx
                    .price_router
                    .price_of(token_address, wallet.chain_id)
                    .await;
                let mark_price = if mark_price > 0.0 {
                    mark_price
                } else {
                    token_trades.last().map(|t| t.price_usd).unwrap_or(0.0)
                };

                let pnl = FifoEngine::compute_token_pnl(&token_trades, mark_price);
                realized_total += pnl.realized_pnl_usd;
                unrealized_total += pnl.unrealized_pnl_usd;

                self.ctx
                    .store
                    .upsert_position(Position {
                        wallet_address: wallet.address.clone(),
                        token_address: token_address.to_string(),
                        chain_id: wallet.chain_id,
                        qty: pnl.open_qty,
                        cost_basis_usd: pnl.open_cost_basis_usd,
                        realized_pnl_usd: pnl.realized_pnl_usd,
                        unrealized_pnl_usd: pnl.unrealized_pnl_usd,
                        last_price_usd: Some(mark_price),
                        last_update: now,
                    })
                    .await?;

                if let Some(token) = self.ctx.store.get_token(token_address).await? {
                    let all_token_trades = self.ctx.store.trades_for_token(token_address, Some(since)).await?;
                    for trade in token_trades.iter().filter(|t| t.side == Side::Buy) {
                        let rank_percentile = buyer_rank_percentile(&all_token_trades, trade);
                        let participation = window_participation(&all_token_trades, trade);
                        let score = earlyscorer.calculate_score(
                            rank_percentile,
                            token.last_liquidity_usd.unwrap_or(0.0),
                            participation,
                        );
                        early_scores.push(score.total);
                    }
                }

                grouped.push(token_trades);
            }

            let best_multiple =
                FifoEngine::best_trade_multiple(grouped.iter().map(|v| v.as_slice()));
            let earlyscore_median = alpha_analytics::median_score(&early_scores);

            let previous = self.ctx.store.get_wallet_stats(&wallet.address).await?;
            let max_drawdown_pct = previous.map(|p| p.max_drawdown_pct).unwrap_or(0.0);

            self.ctx
                .store
                .upsert_wallet_stats(WalletStats30D {
                    wallet_address: wallet.address.clone(),
                    chain_id: wallet.chain_id,
                    trades_count: trades.len() as u32,
                    realized_pnl_usd: realized_total,
                    unrealized_pnl_usd: unrealized_total,
                    best_trade_multiple: best_multiple,
                    earlyscore_median,
                    max_drawdown_pct,
                    last_update: now,
                })
                .await?;
        }
        Ok(())
    }
}

/// `unique buyers of this token strictly before this trade's timestamp /
/// max(total unique buyers, 1)`. `all_token_trades` is the
/// token's full buy/sell history across every wallet, not just the one
/// being scored.
fn buyer_rank_percentile(all_token_trades: &[Trade], trade: &Trade) -> f64 {
    let buyers_before: std::collections::HashSet<&str> = all_token_trades
        .iter()
        .filter(|t| t.side == Side::Buy && t.ts < trade.ts)
        .map(|t| t.wallet_address.as_str())
        .collect();
    let total_buyers: std::collections::HashSet<&str> = all_token_trades
        .iter()
        .filter(|t| t.side == Side::Buy)
        .map(|t| t.wallet_address.as_str())
        .collect();
    buyers_before.len() as f64 / total_buyers.len().max(1) as f64
}

/// `this_trade.usd_value / (sum of usd_value in a +/-1h window around ts)`,
/// 0 if nothing else traded in the window. Capping to the scorer's
/// participation cap happens inside `EarlyScorer`, not here.
fn window_participation(token_trades: &[Trade], trade: &Trade) -> f64 {
    let lower = trade.ts - Duration::hours(1);
    let upper = trade.ts + Duration::hours(1);
    let window_total: f64 = token_trades
        .iter()
        .filter(|t| t.ts >= lower && t.ts <= upper)
        .map(|t| t.usd_value)
        .sum();
    if window_total <= 0.0 {
        0.0
    } else {
        trade.usd_value / window_total
    }
}

pub struct PositionManagementJob {
    pub ctx: AppContext,
}

#[async_trait]
impl Job for PositionManagementJob {
    fn id(&self) -> &'static str {
        "position_management"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let snapshot = self.ctx.paper_trader.snapshot().await;
        let min_wallets = self.ctx.config.confluence.min_wallets;

        for (token_address, position) in snapshot.open_positions {
            let price = self.ctx.price_router.price_of(&token_address, position.chain_id).await;

            let whale_sell_confluence = self
                .ctx
                .confluence
                .check(Side::Sell, position.chain_id, &token_address, min_wallets, now)
                .is_some();

            if let Some(closed) = self
                .ctx
                .paper_trader
                .mark(&token_address, price, now, whale_sell_confluence)
                .await
            {
                info!(
                    token = %token_address,
                    exit_reason = ?closed.exit_reason,
                    pnl_usd = closed.pnl_usd,
                    "position closed"
                );
            }
        }
        Ok(())
    }
}

pub struct WatchlistMaintenanceJob {
    pub ctx: AppContext,
}

#[async_trait]
impl Job for WatchlistMaintenanceJob {
    fn id(&self) -> &'static str {
        "watchlist_maintenance"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        let stats = self.ctx.store.all_wallet_stats().await?;
        let wallets = self.ctx.store.all_wallets().await?;
        let bot_flags: HashMap<&str, bool> = wallets.iter().map(|w| (w.address.as_str(), w.is_bot)).collect();
        let chains: HashMap<&str, ChainId> = wallets.iter().map(|w| (w.address.as_str(), w.chain_id)).collect();

        let candidates: Vec<AutoDiscoveredCandidate> = stats
            .iter()
            .filter(|s| !bot_flags.get(s.wallet_address.as_str()).copied().unwrap_or(false))
            .map(|s| AutoDiscoveredCandidate {
                wallet_address: s.wallet_address.clone(),
                unrealized_pnl_usd: s.unrealized_pnl_usd,
                realized_pnl_usd: s.realized_pnl_usd,
                trades_count: s.trades_count,
                earlyscore_median: s.earlyscore_median,
                best_trade_multiple: s.best_trade_multiple,
                max_drawdown_pct: s.max_drawdown_pct,
            })
            .collect();

        let weights = win_rate_weights(&self.ctx).await?;
        let thresholds = MaintenanceThresholds {
            auto_min_unrealized_pnl_usd: self.ctx.config.watchlist.auto_min_unrealized_pnl_usd,
            auto_min_trades: self.ctx.config.watchlist.auto_min_trades,
            add_min_trades_30d: self.ctx.config.watchlist.add_min_trades_30d,
            add_min_realized_pnl_30d_usd: self.ctx.config.watchlist.add_min_realized_pnl_30d_usd,
            add_min_best_trade_multiple: self.ctx.config.watchlist.add_min_best_trade_multiple,
            remove_if_realized_pnl_30d_lt: self.ctx.config.watchlist.remove_if_realized_pnl_30d_lt,
            remove_if_max_drawdown_pct_gt: self.ctx.config.watchlist.remove_if_max_drawdown_pct_gt,
            remove_if_trades_30d_lt: self.ctx.config.watchlist.remove_if_trades_30d_lt,
            top_k: self.ctx.config.watchlist.top_k,
        };
        let plan = WatchlistRanker::new(weights, thresholds).nightly_maintenance(&candidates);

        for address in plan.to_add {
            let Some(&chain_id) = chains.get(address.as_str()) else {
                continue;
            };
            self.ctx
                .store
                .upsert_custom_watchlist(CustomWatchlistWallet {
                    address: address.clone(),
                    chain_id,
                    added_at: now,
                    label: Some("auto-added: nightly maintenance".to_string()),
                    is_active: true,
                    notes: None,
                })
                .await?;
        }
        for address in plan.to_remove {
            let Some(&chain_id) = chains.get(address.as_str()) else {
                continue;
            };
            self.ctx.store.deactivate_custom_watchlist(&address, chain_id).await?;
        }
        Ok(())
    }
}
