//! `ChainAdapter`: recent transfers/trades for a token or wallet, plus the
//! EVM swap-direction heuristic that turns raw token transfers into
//! labeled buy/sell events without a DEX-router registry.

use alpha_entities::{ChainId, Side, Trade};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// A raw on-chain token transfer, before buy/sell classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub tx_hash: String,
    pub ts: DateTime<Utc>,
    pub from: String,
    pub to: String,
    pub token_address: String,
    pub raw_amount: f64,
    pub decimals: Option<u8>,
}

#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain_id(&self) -> ChainId;

    async fn recent_token_buyers(&self, token: &str, limit: usize) -> anyhow::Result<Vec<Transfer>>;

    async fn recent_wallet_trades(&self, wallet: &str, limit: usize) -> anyhow::Result<Vec<Trade>>;
}

/// Classify addresses appearing in a queried transfer window as DEX pools:
/// an address occurring as `from` (buy side) or `to` (sell side) at least
/// `min_occurrences` times is treated as a pool for that side. Intentionally
/// local to the window passed in, not a persistent registry.
pub fn detect_pools(
    transfers: &[Transfer],
    min_occurrences: usize,
) -> (HashSet<String>, HashSet<String>) {
    let mut from_counts: HashMap<&str, usize> = HashMap::new();
    let mut to_counts: HashMap<&str, usize> = HashMap::new();
    for t in transfers {
        *from_counts.entry(t.from.as_str()).or_insert(0) += 1;
        *to_counts.entry(t.to.as_str()).or_insert(0) += 1;
    }
    let buy_pools = from_counts
        .into_iter()
        .filter(|(_, c)| *c >= min_occurrences)
        .map(|(addr, _)| addr.to_string())
        .collect();
    let sell_pools = to_counts
        .into_iter()
        .filter(|(_, c)| *c >= min_occurrences)
        .map(|(addr, _)| addr.to_string())
        .collect();
    (buy_pools, sell_pools)
}

/// Classify one transfer against already-detected pool sets. Buy side is
/// checked first; a transfer matching neither is a plain P2P move and is
/// ignored (`None`).
pub fn classify_transfer(
    transfer: &Transfer,
    buy_pools: &HashSet<String>,
    sell_pools: &HashSet<String>,
) -> Option<(Side, String)> {
    if buy_pools.contains(&transfer.from) {
        Some((Side::Buy, transfer.to.clone()))
    } else if sell_pools.contains(&transfer.to) {
        Some((Side::Sell, transfer.from.clone()))
    } else {
        None
    }
}

/// Canned-response adapter for tests and default wiring — returns whatever
/// transfers/trades it was constructed with, regardless of the requested
/// token/wallet/limit beyond truncation.
pub struct MockChainAdapter {
    chain_id: ChainId,
    transfers: Vec<Transfer>,
    trades: Vec<Trade>,
}

impl MockChainAdapter {
    pub fn new(chain_id: ChainId, transfers: Vec<Transfer>, trades: Vec<Trade>) -> Self {
        Self {
            chain_id,
            transfers,
            trades,
        }
    }
}

#[async_trait]
impl ChainAdapter for MockChainAdapter {
    fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    async fn recent_token_buyers(&self, _token: &str, limit: usize) -> anyhow::Result<Vec<Transfer>> {
        Ok(self.transfers.iter().take(limit).cloned().collect())
    }

    async fn recent_wallet_trades(&self, _wallet: &str, limit: usize) -> anyhow::Result<Vec<Trade>> {
        Ok(self.trades.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn transfer(from: &str, to: &str, minute: i64) -> Transfer {
        Transfer {
            tx_hash: format!("tx-{from}-{to}-{minute}"),
            ts: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
            from: from.into(),
            to: to.into(),
            token_address: "0xtoken".into(),
            raw_amount: 100.0,
            decimals: Some(18),
        }
    }

    #[test]
    fn pool_detected_by_repeated_occurrence() {
        let transfers = vec![
            transfer("pool", "walletA", 0),
            transfer("pool", "walletB", 1),
            transfer("random", "walletC", 2),
        ];
        let (buy_pools, _sell_pools) = detect_pools(&transfers, 2);
        assert!(buy_pools.contains("pool"));
        assert!(!buy_pools.contains("random"));
    }

    #[test]
    fn buy_classified_when_pool_is_sender() {
        let transfers = vec![transfer("pool", "walletA", 0), transfer("pool", "walletB", 1)];
        let (buy_pools, sell_pools) = detect_pools(&transfers, 2);
        let classified = classify_transfer(&transfers[0], &buy_pools, &sell_pools);
        assert_eq!(classified, Some((Side::Buy, "walletA".to_string())));
    }

    #[test]
    fn sell_classified_when_pool_is_receiver() {
        let transfers = vec![transfer("walletA", "pool", 0), transfer("walletB", "pool", 1)];
        let (buy_pools, sell_pools) = detect_pools(&transfers, 2);
        let classified = classify_transfer(&transfers[0], &buy_pools, &sell_pools);
        assert_eq!(classified, Some((Side::Sell, "walletA".to_string())));
    }

    #[test]
    fn plain_p2p_transfer_is_ignored() {
        let buy_pools = HashSet::new();
        let sell_pools = HashSet::new();
        let t = transfer("walletA", "walletB", 0);
        assert_eq!(classify_transfer(&t, &buy_pools, &sell_pools), None);
    }

    #[test]
    fn below_threshold_occurrence_is_not_a_pool() {
        let transfers = vec![transfer("maybe_pool", "walletA", 0)];
        let (buy_pools, sell_pools) = detect_pools(&transfers, 2);
        assert!(buy_pools.is_empty());
        assert!(sell_pools.is_empty());
    }
}
