//! `alpha-wallet-tracker`: process wiring for the pipeline scheduler, the
//! read-only dashboard API, and graceful shutdown. Every job and every
//! dashboard handler is built from the single [`AppContext`] assembled here
//! — nothing downstream constructs its own adapter, store, or price-router
//! instance.
//!
//! Concrete wire adapters (real EVM/Solana JSON-RPC, DexScreener, Birdeye,
//! CoinGecko...) are not shipped here; this binary wires the mock
//! adapters from `alpha-adapters` by default so the pipeline runs end to
//! end out of the box. Swapping in real adapters means implementing the
//! `TrendingSource` / `ChainAdapter` / `PriceSource` traits and registering
//! them here — nothing else in the workspace changes.

mod config;
mod context;
mod dashboard;
mod jobs;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use alpha_adapters::{
    Alerter, ChainAdapter, LoggingAlerter, MockChainAdapter, PriceRouter, PriceRouterConfig,
    StaticPriceSource, StaticTrendingSource, TrendingSource,
};
use alpha_confluence::{ConfluenceConfig, ConfluenceStore};
use alpha_entities::{ChainId, EntityStore};
use alpha_paper_trader::{ExitPolicyConfig, MemeCoinFilter, PaperTrader, PaperTraderConfig};
use alpha_scheduler::{Job, JobSpec, Scheduler};

use config::Config;
use context::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Arc::new(Config::from_env()?);
    config.validate()?;
    info!(chains = ?config.chains.active, "alpha-wallet-tracker starting");

    let ctx = build_context(config.clone()).await?;

    let mut scheduler = Scheduler::new();
    register_jobs(&mut scheduler, &ctx, &config);
    let scheduler = Arc::new(scheduler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let job_handles = scheduler.spawn_all(shutdown_rx);

    let dashboard_router = dashboard::router(ctx.clone(), scheduler.clone());
    let listener = tokio::net::TcpListener::bind(config.dashboard.bind_address).await?;
    info!(addr = %config.dashboard.bind_address, "dashboard API listening");

    let server = axum::serve(listener, dashboard_router).with_graceful_shutdown(shutdown_signal());
    server.await?;

    info!("shutdown signal received, stopping job loops");
    let _ = shutdown_tx.send(true);
    for handle in job_handles {
        let _ = handle.await;
    }
    info!("alpha-wallet-tracker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Builds the shared [`AppContext`]. Trending sources, chain adapters, and
/// price sources are the mock implementations shipped by `alpha-adapters` —
/// empty by default (no canned data), which is a valid (if quiet) starting
/// state: every job degrades gracefully to "nothing to do" rather than
/// failing when adapters return empty results.
async fn build_context(config: Arc<Config>) -> Result<AppContext> {
    let store: Arc<dyn EntityStore> = Arc::new(alpha_entities::memory::InMemoryStore::new());

    let trending_sources: Vec<Arc<dyn TrendingSource>> = vec![
        Arc::new(StaticTrendingSource::new("dexscreener-trending", Vec::new())),
        Arc::new(StaticTrendingSource::new("birdeye-trending", Vec::new())),
        Arc::new(StaticTrendingSource::new("coingecko-gainers", Vec::new())),
    ];

    let mut chain_adapters: HashMap<ChainId, Arc<dyn ChainAdapter>> = HashMap::new();
    for &chain in &config.chains.active {
        chain_adapters.insert(
            chain,
            Arc::new(MockChainAdapter::new(chain, Vec::new(), Vec::new())) as Arc<dyn ChainAdapter>,
        );
    }

    let price_router = Arc::new(PriceRouter::with_config(
        vec![
            Arc::new(StaticPriceSource::new("dex-aggregator", Vec::new())),
            Arc::new(StaticPriceSource::new("chain-aggregator", Vec::new())),
            Arc::new(StaticPriceSource::new("fiat-market-data", Vec::new())),
        ],
        PriceRouterConfig::default(),
    ));

    let confluence = Arc::new(ConfluenceStore::new(ConfluenceConfig {
        window: chrono::Duration::minutes(config.confluence.window_minutes),
        grace: chrono::Duration::minutes(config.confluence.grace_minutes),
    }));

    let paper_trader = Arc::new(
        PaperTrader::load_or_init(
            config.paper_trader.log_path.clone(),
            PaperTraderConfig {
                starting_balance_usd: config.paper_trader.starting_balance_usd,
                max_open_positions: config.paper_trader.max_open_positions,
                min_cash_to_enter_usd: config.paper_trader.min_cash_to_enter_usd,
                meme_coin_filter: MemeCoinFilter::default(),
                exit_policy: ExitPolicyConfig::default(),
            },
        )
        .await?,
    );

    let alerter: Arc<dyn Alerter> = Arc::new(LoggingAlerter);

    Ok(AppContext {
        config,
        store,
        trending_sources: Arc::new(trending_sources),
        chain_adapters: Arc::new(chain_adapters),
        price_router,
        confluence,
        paper_trader,
        alerter,
    })
}

/// Computes the `std::time::Duration` from now until the next 02:00 UTC,
/// so `watchlist_maintenance` can be pinned to that wall-clock trigger
/// instead of drifting with process start time.
fn delay_until_next_02_00_utc() -> Duration {
    use chrono::{NaiveTime, TimeZone, Utc};

    let now = Utc::now();
    let today_02 = Utc
        .from_utc_datetime(&now.date_naive().and_time(NaiveTime::from_hms_opt(2, 0, 0).unwrap()));
    let next = if today_02 > now { today_02 } else { today_02 + chrono::Duration::days(1) };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Registers the job cadence table. Timeouts default to 2x cadence;
/// `watchlist_maintenance` is pinned to the next 02:00 UTC via an initial
/// delay, then repeats every 24h from that point on.
fn register_jobs(scheduler: &mut Scheduler, ctx: &AppContext, config: &Config) {
    scheduler.register(
        JobSpec::new(Duration::from_secs(config.scheduler.runner_poll_minutes * 60)),
        Arc::new(jobs::RunnerSeedJob { ctx: ctx.clone() }) as Arc<dyn Job>,
    );
    scheduler.register(
        JobSpec::new(Duration::from_secs(10 * 60)),
        Arc::new(jobs::WalletDiscoveryJob { ctx: ctx.clone() }) as Arc<dyn Job>,
    );
    scheduler.register(
        JobSpec::new(Duration::from_secs(5 * 60)),
        Arc::new(jobs::WhaleDiscoveryJob { ctx: ctx.clone() }) as Arc<dyn Job>,
    );
    scheduler.register(
        JobSpec::new(Duration::from_secs(2 * 60)),
        Arc::new(jobs::WalletMonitoringJob { ctx: ctx.clone() }) as Arc<dyn Job>,
    );
    scheduler.register(
        JobSpec::new(Duration::from_secs(15 * 60)),
        Arc::new(jobs::StatsRollupJob { ctx: ctx.clone() }) as Arc<dyn Job>,
    );
    scheduler.register(
        JobSpec::new(Duration::from_secs(5 * 60)),
        Arc::new(jobs::PositionManagementJob { ctx: ctx.clone() }) as Arc<dyn Job>,
    );
    scheduler.register(
        JobSpec::with_timeout(Duration::from_secs(24 * 60 * 60), Duration::from_secs(60 * 60))
            .with_initial_delay(delay_until_next_02_00_utc()),
        Arc::new(jobs::WatchlistMaintenanceJob { ctx: ctx.clone() }) as Arc<dyn Job>,
    );
}
