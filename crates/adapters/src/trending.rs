//! `TrendingSource`: the outbound contract for "top trending tokens"
//! providers (DexScreener trending, Birdeye trending, CoinGecko gainers,
//! ...). Concrete wire clients are out of scope; this module defines the
//! trait and a static mock used by tests and default wiring.

use alpha_entities::ChainId;
use async_trait::async_trait;

/// One entry from a trending snapshot, enough to upsert a `Token` and
/// append a `SeedToken` row.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedEntry {
    pub token_address: String,
    pub chain_id: ChainId,
    pub symbol: Option<String>,
    pub rank_24h: Option<u32>,
    pub vol_24h_usd: Option<f64>,
    pub pct_change_24h: Option<f64>,
    pub liquidity_usd: Option<f64>,
    pub price_usd: Option<f64>,
}

#[async_trait]
pub trait TrendingSource: Send + Sync {
    /// Stable identifier used in `SeedToken.source` and in failure-budget
    /// bookkeeping by anything that wraps this source.
    fn name(&self) -> &'static str;

    async fn top_n(&self, chain: ChainId, n: usize) -> anyhow::Result<Vec<SeedEntry>>;
}

/// Fixed-snapshot trending source: returns the same entries every call,
/// trimmed to `n`. Used to exercise the ingest pipeline end to end without
/// a real HTTP dependency.
pub struct StaticTrendingSource {
    name: &'static str,
    entries: Vec<SeedEntry>,
}

impl StaticTrendingSource {
    pub fn new(name: &'static str, entries: Vec<SeedEntry>) -> Self {
        Self { name, entries }
    }
}

#[async_trait]
impl TrendingSource for StaticTrendingSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn top_n(&self, chain: ChainId, n: usize) -> anyhow::Result<Vec<SeedEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| e.chain_id == chain)
            .take(n)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_filters_by_chain_and_caps_n() {
        let source = StaticTrendingSource::new(
            "mock",
            vec![
                SeedEntry {
                    token_address: "0xa".into(),
                    chain_id: ChainId::Ethereum,
                    symbol: Some("AAA".into()),
                    rank_24h: Some(1),
                    vol_24h_usd: Some(1_000.0),
                    pct_change_24h: Some(10.0),
                    liquidity_usd: Some(50_000.0),
                    price_usd: Some(1.0),
                },
                SeedEntry {
                    token_address: "sol111".into(),
                    chain_id: ChainId::Solana,
                    symbol: Some("SOLTOK".into()),
                    rank_24h: Some(1),
                    vol_24h_usd: Some(2_000.0),
                    pct_change_24h: Some(20.0),
                    liquidity_usd: Some(70_000.0),
                    price_usd: Some(2.0),
                },
            ],
        );

        let eth = source.top_n(ChainId::Ethereum, 10).await.unwrap();
        assert_eq!(eth.len(), 1);
        assert_eq!(eth[0].token_address, "0xa");

        let capped = source.top_n(ChainId::Solana, 0).await.unwrap();
        assert!(capped.is_empty());
    }
}
