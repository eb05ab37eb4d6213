//! Being-Early score: how early a wallet's buy looked relative to a token's
//! eventual trajectory, from three independent signals worth up to 40, 40
//! and 20 points.

use tracing::debug;

/// Tunable constants behind the market-cap signal. Ratios, not absolute
/// dollar figures, are the part likely to need re-tuning per chain, so they
/// live in config rather than being baked into the formula.
#[derive(Debug, Clone, Copy)]
pub struct EarlyScorerConfig {
    /// Liquidity is multiplied by this to estimate market cap when no
    /// on-chain supply figure is available.
    pub mc_multiplier: f64,
    /// Market cap above which the buy is considered "not early" for signal 2.
    pub target_mc_usd: f64,
    /// Participation ratio at which signal 3 saturates.
    pub participation_cap: f64,
}

impl Default for EarlyScorerConfig {
    fn default() -> Self {
        Self {
            mc_multiplier: 3.0,
            target_mc_usd: 1_000_000.0,
            participation_cap: 0.5,
        }
    }
}

/// One buy's Being-Early score with its signal breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyScore {
    pub total: f64,
    pub rank_score: f64,
    pub mc_score: f64,
    pub volume_score: f64,
}

pub struct EarlyScorer {
    config: EarlyScorerConfig,
}

impl EarlyScorer {
    pub fn new() -> Self {
        Self {
            config: EarlyScorerConfig::default(),
        }
    }

    pub fn with_config(config: EarlyScorerConfig) -> Self {
        Self { config }
    }

    /// `rank_percentile` is the buy's position among the token's buyers so
    /// far, 0.0 = first buyer, 1.0 = last; clamped to `[0, 1]`.
    /// `liquidity_usd` is the pool liquidity at buy time.
    /// `participation` is the buyer's share of total buy volume in the ±1h
    /// window around the buy (0.0-1.0).
    pub fn calculate_score(
        &self,
        rank_percentile: f64,
        liquidity_usd: f64,
        participation: f64,
    ) -> EarlyScore {
        let rank_score = self.rank_score(rank_percentile);
        let mc_score = self.mc_score(liquidity_usd);
        let volume_score = self.volume_score(participation);
        let total = rank_score + mc_score + volume_score;

        debug!(
            rank_score, mc_score, volume_score, total,
            "being-early score computed"
        );

        EarlyScore {
            total,
            rank_score,
            mc_score,
            volume_score,
        }
    }

    fn rank_score(&self, rank_percentile: f64) -> f64 {
        let clamped = rank_percentile.clamp(0.0, 1.0);
        40.0 * (1.0 - clamped)
    }

    fn mc_score(&self, liquidity_usd: f64) -> f64 {
        let estimated_mc = liquidity_usd.max(0.0) * self.config.mc_multiplier;
        if estimated_mc >= self.config.target_mc_usd {
            return 0.0;
        }
        let headroom = (self.config.target_mc_usd - estimated_mc) / self.config.target_mc_usd;
        40.0 * headroom.clamp(0.0, 1.0)
    }

    fn volume_score(&self, participation: f64) -> f64 {
        let capped = participation.max(0.0).min(self.config.participation_cap);
        20.0 * (capped / self.config.participation_cap)
    }
}

impl Default for EarlyScorer {
    fn default() -> Self {
        Self::new()
    }
}

/// Median of a wallet's per-trade Being-Early scores. `scores` need not be
/// sorted. Returns `None` for an empty slice (no score yet, rather than 0.0
/// — a wallet with no scored buys is unranked, not penalized).
pub fn median_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_buyer_on_illiquid_token_scores_near_max_rank_and_mc() {
        let scorer = EarlyScorer::new();
        let score = scorer.calculate_score(0.0, 1_000.0, 0.0);
        assert!((score.rank_score - 40.0).abs() < 1e-9);
        // estimated mc = 3_000, far below target -> near-max mc score
        assert!(score.mc_score > 39.0);
        assert_eq!(score.volume_score, 0.0);
    }

    #[test]
    fn last_buyer_above_target_mc_scores_zero_rank_and_mc() {
        let scorer = EarlyScorer::new();
        // liquidity * 3 >= 1_000_000 -> mc already at/above target
        let score = scorer.calculate_score(1.0, 400_000.0, 0.0);
        assert_eq!(score.rank_score, 0.0);
        assert_eq!(score.mc_score, 0.0);
    }

    #[test]
    fn volume_score_saturates_at_cap() {
        let scorer = EarlyScorer::new();
        let at_cap = scorer.calculate_score(0.5, 10_000.0, 0.5);
        let beyond_cap = scorer.calculate_score(0.5, 10_000.0, 0.9);
        assert_eq!(at_cap.volume_score, 20.0);
        assert_eq!(beyond_cap.volume_score, 20.0);
    }

    #[test]
    fn rank_percentile_is_clamped() {
        let scorer = EarlyScorer::new();
        let out_of_range = scorer.calculate_score(-1.0, 0.0, 0.0);
        let in_range = scorer.calculate_score(0.0, 0.0, 0.0);
        assert_eq!(out_of_range.rank_score, in_range.rank_score);
    }

    /// S4. EarlyScore bounds: 100 prior buyers, this wallet 1st, estimated
    /// mc $30k (liquidity $10k), participation 0.2 -> ~86.8.
    #[test]
    fn s4_early_score_matches_worked_example() {
        let scorer = EarlyScorer::new();
        let score = scorer.calculate_score(0.0 / 100.0, 10_000.0, 0.2);
        assert!((score.rank_score - 40.0).abs() < 1e-9);
        assert!((score.mc_score - 38.8).abs() < 1e-6);
        assert!((score.volume_score - 8.0).abs() < 1e-9);
        assert!((score.total - 86.8).abs() < 0.5);
    }

    #[test]
    fn median_of_empty_scores_is_none() {
        assert_eq!(median_score(&[]), None);
    }

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(median_score(&[10.0, 20.0, 30.0]), Some(20.0));
        assert_eq!(median_score(&[10.0, 20.0, 30.0, 40.0]), Some(25.0));
    }
}
