//! Outbound adapter contracts plus the pieces every adapter shares: the
//! EVM/Solana-agnostic pool heuristic, the multi-source price router,
//! a reusable rate limiter, the exclusion list, and the `Alerter` sink.
//!
//! Concrete wire clients (real EVM/Solana JSON-RPC, DexScreener, Birdeye,
//! CoinGecko...) aren't shipped here — this crate ships illustrative mock
//! adapters that satisfy the same traits, used by the integration tests
//! and as the default wiring for a first run.

pub mod alerter;
pub mod chain;
pub mod exclusions;
pub mod price;
pub mod ratelimit;
pub mod trending;

pub use alerter::{Alerter, LoggingAlerter};
pub use chain::{classify_transfer, detect_pools, ChainAdapter, MockChainAdapter, Transfer};
pub use exclusions::is_excluded;
pub use price::{PriceRouter, PriceRouterConfig, PriceSource, StaticPriceSource};
pub use ratelimit::{retry_with_backoff, RateLimiter};
pub use trending::{SeedEntry, StaticTrendingSource, TrendingSource};
