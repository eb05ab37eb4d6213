//! Wallet analytics: FIFO realized/unrealized P&L, the Being-Early score,
//! the bot filter, and the watchlist ranker built on top of them.
//!
//! Every public type here is a pure function of its inputs — none of this
//! crate talks to an [`alpha_entities::EntityStore`] directly. Callers
//! (the binary's job implementations) pull trades/stats out of the store,
//! run them through these engines, and write the results back.

pub mod botfilter;
pub mod earlyscore;
pub mod performance;
pub mod pnl;
pub mod watchlist;

pub use botfilter::{BotFilter, BotFilterConfig};
pub use earlyscore::{median_score, EarlyScore, EarlyScorer, EarlyScorerConfig};
pub use performance::{AlertEvaluation, PerformanceScore, PerformanceTracker, PerformanceWeights};
pub use pnl::{FifoEngine, TokenPnl};
pub use watchlist::{
    AutoDiscoveredCandidate, MaintenancePlan, MaintenanceThresholds, WatchlistRanker,
    WatchlistWeights,
};
