//! Multi-source price router: fixed preference order, per-source failure
//! budget with skip-until-reset, short-TTL cache, and a "stale" (0.0) result
//! on total failure that callers must treat as unavailable rather than
//! crash on.

use alpha_entities::ChainId;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stable identifier, used as the failure-counter key — keep it
    /// `'static` so the router can index it without allocating per call.
    fn name(&self) -> &'static str;

    /// Implementations should return `Ok(price)` or `Err` on failure; a
    /// source returning `Ok(0.0)` is treated the same as a failure by the
    /// router (a real price is never exactly zero).
    async fn price(&self, token: &str, chain: ChainId) -> anyhow::Result<f64>;
}

#[derive(Debug, Clone, Copy)]
pub struct PriceRouterConfig {
    pub failure_threshold: u32,
    pub cache_ttl: Duration,
}

impl Default for PriceRouterConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Tries sources in the order given at construction; a single process-wide
/// instance is expected, shared behind an `Arc` by every stats-rollup pass
/// and the paper trader's mark loop.
pub struct PriceRouter {
    sources: Vec<Arc<dyn PriceSource>>,
    failure_counts: DashMap<&'static str, u32>,
    cache: DashMap<(ChainId, String), (f64, Instant)>,
    config: PriceRouterConfig,
}

impl PriceRouter {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>) -> Self {
        Self::with_config(sources, PriceRouterConfig::default())
    }

    pub fn with_config(sources: Vec<Arc<dyn PriceSource>>, config: PriceRouterConfig) -> Self {
        Self {
            sources,
            failure_counts: DashMap::new(),
            cache: DashMap::new(),
            config,
        }
    }

    /// Resolve a price, trying sources in preference order. Returns `0.0`
    /// ("stale") if every eligible source failed or all were skipped on
    /// their failure budget — never errors, since price unavailability is a
    /// value every caller must handle, not an exceptional path.
    pub async fn price_of(&self, token: &str, chain: ChainId) -> f64 {
        let cache_key = (chain, token.to_string());
        if let Some(entry) = self.cache.get(&cache_key) {
            let (price, inserted_at) = *entry;
            if inserted_at.elapsed() < self.config.cache_ttl {
                return price;
            }
        }

        for source in &self.sources {
            let fails = self
                .failure_counts
                .get(source.name())
                .map(|c| *c)
                .unwrap_or(0);
            if fails >= self.config.failure_threshold {
                continue;
            }

            match source.price(token, chain).await {
                Ok(price) if price > 0.0 => {
                    self.failure_counts.insert(source.name(), 0);
                    self.cache.insert(cache_key, (price, Instant::now()));
                    return price;
                }
                Ok(_) => {
                    warn!(source = source.name(), token, "price source returned non-positive price");
                    self.bump_failure(source.name());
                }
                Err(err) => {
                    warn!(source = source.name(), token, error = %err, "price source failed");
                    self.bump_failure(source.name());
                }
            }
        }

        0.0
    }

    fn bump_failure(&self, name: &'static str) {
        *self.failure_counts.entry(name).or_insert(0) += 1;
    }

    /// Called on an hourly scheduler tick so sources that recovered aren't
    /// skipped forever.
    pub fn reset_failure_counters(&self) {
        self.failure_counts.clear();
    }

    pub fn failure_count(&self, source_name: &str) -> u32 {
        self.failure_counts.get(source_name).map(|c| *c).unwrap_or(0)
    }
}

/// Canned-price source for default process wiring and tests — always
/// returns the same price for every `(token, chain)` pair it was given, or
/// fails (feeding the router's failure budget) for everything else.
pub struct StaticPriceSource {
    name: &'static str,
    prices: DashMap<(ChainId, String), f64>,
}

impl StaticPriceSource {
    pub fn new(name: &'static str, prices: Vec<((ChainId, String), f64)>) -> Self {
        Self {
            name,
            prices: prices.into_iter().collect(),
        }
    }

    pub fn set(&self, chain: ChainId, token: impl Into<String>, price: f64) {
        self.prices.insert((chain, token.into()), price);
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn price(&self, token: &str, chain: ChainId) -> anyhow::Result<f64> {
        self.prices
            .get(&(chain, token.to_string()))
            .map(|p| *p)
            .ok_or_else(|| anyhow::anyhow!("no static price for {token} on {chain}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakySource {
        name: &'static str,
        calls: AtomicU32,
        fail_first_n: u32,
        price: f64,
    }

    #[async_trait]
    impl PriceSource for FlakySource {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn price(&self, _token: &str, _chain: ChainId) -> anyhow::Result<f64> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first_n {
                anyhow::bail!("transient failure");
            }
            Ok(self.price)
        }
    }

    struct AlwaysFailsSource;

    #[async_trait]
    impl PriceSource for AlwaysFailsSource {
        fn name(&self) -> &'static str {
            "always-fails"
        }

        async fn price(&self, _token: &str, _chain: ChainId) -> anyhow::Result<f64> {
            anyhow::bail!("down")
        }
    }

    #[tokio::test]
    async fn falls_back_through_sources_in_order() {
        let primary = Arc::new(AlwaysFailsSource);
        let secondary = Arc::new(FlakySource {
            name: "secondary",
            calls: AtomicU32::new(0),
            fail_first_n: 0,
            price: 2.5,
        });
        let router = PriceRouter::new(vec![primary, secondary]);
        let price = router.price_of("0xtoken", ChainId::Ethereum).await;
        assert_eq!(price, 2.5);
    }

    #[tokio::test]
    async fn total_failure_returns_zero_stale() {
        let router = PriceRouter::new(vec![Arc::new(AlwaysFailsSource)]);
        let price = router.price_of("0xtoken", ChainId::Ethereum).await;
        assert_eq!(price, 0.0);
    }

    #[tokio::test]
    async fn source_is_skipped_once_past_failure_threshold() {
        let flaky = Arc::new(FlakySource {
            name: "flaky",
            calls: AtomicU32::new(0),
            fail_first_n: 100,
            price: 1.0,
        });
        let router = PriceRouter::with_config(
            vec![flaky.clone()],
            PriceRouterConfig {
                failure_threshold: 3,
                cache_ttl: Duration::from_millis(0),
            },
        );
        for _ in 0..3 {
            assert_eq!(router.price_of("0xtoken", ChainId::Ethereum).await, 0.0);
        }
        let calls_before = flaky.calls.load(Ordering::SeqCst);
        // Fourth call should be skipped entirely — source already past budget.
        let _ = router.price_of("0xtoken", ChainId::Ethereum).await;
        assert_eq!(flaky.calls.load(Ordering::SeqCst), calls_before);
    }

    #[tokio::test]
    async fn success_resets_failure_counter() {
        let flaky = Arc::new(FlakySource {
            name: "flaky",
            calls: AtomicU32::new(0),
            fail_first_n: 2,
            price: 3.0,
        });
        let router = PriceRouter::with_config(
            vec![flaky],
            PriceRouterConfig {
                failure_threshold: 5,
                cache_ttl: Duration::from_millis(0),
            },
        );
        assert_eq!(router.price_of("0xtoken", ChainId::Ethereum).await, 0.0);
        assert_eq!(router.price_of("0xtoken", ChainId::Ethereum).await, 0.0);
        assert_eq!(router.price_of("0xtoken", ChainId::Ethereum).await, 3.0);
        assert_eq!(router.failure_count("flaky"), 0);
    }

    #[tokio::test]
    async fn static_price_source_serves_configured_pairs_only() {
        let source = StaticPriceSource::new(
            "static",
            vec![((ChainId::Ethereum, "0xtoken".to_string()), 1.5)],
        );
        assert_eq!(source.price("0xtoken", ChainId::Ethereum).await.unwrap(), 1.5);
        assert!(source.price("0xother", ChainId::Ethereum).await.is_err());
    }

    #[tokio::test]
    async fn cache_avoids_recalling_source_within_ttl() {
        let flaky = Arc::new(FlakySource {
            name: "flaky",
            calls: AtomicU32::new(0),
            fail_first_n: 0,
            price: 9.0,
        });
        let router = PriceRouter::with_config(
            vec![flaky.clone()],
            PriceRouterConfig {
                failure_threshold: 5,
                cache_ttl: Duration::from_secs(60),
            },
        );
        assert_eq!(router.price_of("0xtoken", ChainId::Ethereum).await, 9.0);
        assert_eq!(router.price_of("0xtoken", ChainId::Ethereum).await, 9.0);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 1);
    }
}
