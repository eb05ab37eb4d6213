//! Time-windowed, deduplicated confluence detector.
//!
//! Keyed by `(side, chain, token)`: a time-ordered set of `(wallet, ts,
//! metadata)` entries. `record_trade` is idempotent per `(wallet, ts)`;
//! `check` drops stale entries, dedups by wallet (first occurrence wins,
//! preserving insertion order), and returns the unique wallet set when it
//! meets the threshold. Keys are swept of entries older than
//! `window + grace` to bound memory.

use alpha_entities::{ChainId, Side};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::debug;

/// One recorded trade event feeding a confluence key.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfluenceEntry {
    pub wallet_address: String,
    pub ts: DateTime<Utc>,
    pub meta: serde_json::Value,
}

type Key = (Side, ChainId, String);

#[derive(Debug, Clone, Copy)]
pub struct ConfluenceConfig {
    pub window: Duration,
    pub grace: Duration,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            window: Duration::minutes(30),
            grace: Duration::minutes(10),
        }
    }
}

pub struct ConfluenceStore {
    config: ConfluenceConfig,
    entries: DashMap<Key, Vec<ConfluenceEntry>>,
}

impl ConfluenceStore {
    pub fn new(config: ConfluenceConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Idempotent for a given `(wallet, ts)` within a key — re-recording
    /// the same wallet at the same timestamp (e.g. the same trade observed
    /// by two monitor instances) is a no-op; metadata may differ across
    /// attempts, but the wallet/timestamp pair is canonical.
    pub fn record_trade(
        &self,
        side: Side,
        chain_id: ChainId,
        token_address: &str,
        wallet_address: &str,
        ts: DateTime<Utc>,
        meta: serde_json::Value,
    ) {
        let key = (side, chain_id, token_address.to_string());
        let mut bucket = self.entries.entry(key).or_default();
        if bucket
            .iter()
            .any(|e| e.wallet_address == wallet_address && e.ts == ts)
        {
            return;
        }
        bucket.push(ConfluenceEntry {
            wallet_address: wallet_address.to_string(),
            ts,
            meta,
        });
    }

    /// Drops entries older than `now - window`, dedups by wallet keeping the
    /// first (earliest-inserted) occurrence, and returns the unique entries
    /// if their count meets `min_wallets`. Returns `None` otherwise — a
    /// side effect of calling `check` is pruning the key, which is fine
    /// since `check` is expected to run on every new trade for that key.
    pub fn check(
        &self,
        side: Side,
        chain_id: ChainId,
        token_address: &str,
        min_wallets: usize,
        now: DateTime<Utc>,
    ) -> Option<Vec<ConfluenceEntry>> {
        let key = (side, chain_id, token_address.to_string());
        let mut bucket = self.entries.get_mut(&key)?;
        let cutoff = now - self.config.window;
        bucket.retain(|e| e.ts >= cutoff);

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for entry in bucket.iter() {
            if seen.insert(entry.wallet_address.clone()) {
                unique.push(entry.clone());
            }
        }

        if unique.len() >= min_wallets {
            debug!(
                token = token_address,
                side = %side,
                unique = unique.len(),
                "confluence threshold met"
            );
            Some(unique)
        } else {
            None
        }
    }

    /// Sweep every key of entries older than `window + grace`, removing
    /// keys that become empty. Intended to be driven by the scheduler on
    /// the same cadence as other periodic maintenance, independent of
    /// whether `check` happens to be called for a given key.
    pub fn expire(&self, now: DateTime<Utc>) {
        let cutoff = now - self.config.window - self.config.grace;
        self.entries.retain(|_, bucket| {
            bucket.retain(|e| e.ts >= cutoff);
            !bucket.is_empty()
        });
    }

    pub fn key_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minutes_ago(now: DateTime<Utc>, m: i64) -> DateTime<Utc> {
        now - Duration::minutes(m)
    }

    /// S5. Confluence threshold.
    #[test]
    fn confluence_threshold_dedupes_and_returns_unique_wallets() {
        let store = ConfluenceStore::new(ConfluenceConfig::default());
        let now = Utc::now();

        store.record_trade(
            Side::Buy,
            ChainId::Ethereum,
            "0xtoken",
            "W1",
            minutes_ago(now, 5),
            json!({}),
        );
        store.record_trade(
            Side::Buy,
            ChainId::Ethereum,
            "0xtoken",
            "W1",
            minutes_ago(now, 3),
            json!({}),
        );
        store.record_trade(
            Side::Buy,
            ChainId::Ethereum,
            "0xtoken",
            "W2",
            minutes_ago(now, 1),
            json!({}),
        );

        let result = store
            .check(Side::Buy, ChainId::Ethereum, "0xtoken", 2, now)
            .unwrap();
        let wallets: HashSet<String> = result.into_iter().map(|e| e.wallet_address).collect();
        assert_eq!(wallets, HashSet::from(["W1".to_string(), "W2".to_string()]));
    }

    #[test]
    fn below_threshold_returns_none() {
        let store = ConfluenceStore::new(ConfluenceConfig::default());
        let now = Utc::now();
        store.record_trade(Side::Buy, ChainId::Ethereum, "0xtoken", "W1", now, json!({}));
        assert!(store
            .check(Side::Buy, ChainId::Ethereum, "0xtoken", 2, now)
            .is_none());
    }

    #[test]
    fn entries_outside_window_are_dropped() {
        let store = ConfluenceStore::new(ConfluenceConfig::default());
        let now = Utc::now();
        store.record_trade(
            Side::Buy,
            ChainId::Ethereum,
            "0xtoken",
            "W1",
            minutes_ago(now, 45),
            json!({}),
        );
        store.record_trade(
            Side::Buy,
            ChainId::Ethereum,
            "0xtoken",
            "W2",
            minutes_ago(now, 1),
            json!({}),
        );
        let result = store.check(Side::Buy, ChainId::Ethereum, "0xtoken", 2, now);
        assert!(result.is_none());
    }

    #[test]
    fn record_trade_is_idempotent_per_wallet_and_timestamp() {
        let store = ConfluenceStore::new(ConfluenceConfig::default());
        let now = Utc::now();
        store.record_trade(Side::Buy, ChainId::Ethereum, "0xtoken", "W1", now, json!({"a":1}));
        store.record_trade(Side::Buy, ChainId::Ethereum, "0xtoken", "W1", now, json!({"a":2}));
        store.record_trade(Side::Buy, ChainId::Ethereum, "0xtoken", "W2", now, json!({}));
        let result = store
            .check(Side::Buy, ChainId::Ethereum, "0xtoken", 1, now)
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn sides_and_tokens_are_independent_keys() {
        let store = ConfluenceStore::new(ConfluenceConfig::default());
        let now = Utc::now();
        store.record_trade(Side::Buy, ChainId::Ethereum, "0xtoken", "W1", now, json!({}));
        store.record_trade(Side::Sell, ChainId::Ethereum, "0xtoken", "W1", now, json!({}));
        assert!(store
            .check(Side::Buy, ChainId::Ethereum, "0xtoken", 2, now)
            .is_none());
        assert!(store
            .check(Side::Sell, ChainId::Ethereum, "0xtoken", 2, now)
            .is_none());
    }

    #[test]
    fn expire_removes_keys_past_window_plus_grace() {
        let store = ConfluenceStore::new(ConfluenceConfig {
            window: Duration::minutes(30),
            grace: Duration::minutes(10),
        });
        let now = Utc::now();
        store.record_trade(
            Side::Buy,
            ChainId::Ethereum,
            "0xtoken",
            "W1",
            minutes_ago(now, 50),
            json!({}),
        );
        assert_eq!(store.key_count(), 1);
        store.expire(now);
        assert_eq!(store.key_count(), 0);
    }
}
