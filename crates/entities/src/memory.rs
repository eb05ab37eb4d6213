//! In-memory reference [`EntityStore`] implementation.
//!
//! Uses `dashmap::DashMap` for lock-free concurrent entity maps, giving
//! sub-millisecond reads under concurrent job execution. Suitable for tests
//! and as the default runtime store; a durable (SQL/KV) implementation can
//! replace it behind the same [`EntityStore`] trait without touching any
//! consumer.

use crate::model::{
    Alert, ChainId, CustomWatchlistWallet, Position, SeedToken, Token, Trade, Wallet,
    WalletStats30D,
};
use crate::store::{EntityStore, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};

#[derive(Default)]
pub struct InMemoryStore {
    tokens: DashMap<String, Token>,
    seed_tokens: DashMap<i64, SeedToken>,
    next_seed_id: AtomicI64,
    wallets: DashMap<String, Wallet>,
    trades: DashMap<String, Trade>,
    positions: DashMap<(String, String), Position>,
    wallet_stats: DashMap<String, WalletStats30D>,
    custom_watchlist: DashMap<(String, ChainId), CustomWatchlistWallet>,
    alerts: DashMap<i64, Alert>,
    next_alert_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn upsert_token(&self, token: Token) -> Result<(), StoreError> {
        self.tokens.insert(token.token_address.clone(), token);
        Ok(())
    }

    async fn get_token(&self, token_address: &str) -> Result<Option<Token>, StoreError> {
        Ok(self.tokens.get(token_address).map(|r| r.value().clone()))
    }

    async fn all_tokens(&self) -> Result<Vec<Token>, StoreError> {
        Ok(self.tokens.iter().map(|r| r.value().clone()).collect())
    }

    async fn insert_seed_token(&self, mut seed: SeedToken) -> Result<bool, StoreError> {
        let duplicate = self.seed_tokens.iter().any(|r| {
            let existing = r.value();
            existing.token_address == seed.token_address
                && existing.source == seed.source
                && existing.snapshot_ts == seed.snapshot_ts
        });
        if duplicate {
            return Ok(false);
        }
        let id = self.next_seed_id.fetch_add(1, Ordering::Relaxed);
        seed.id = Some(id);
        self.seed_tokens.insert(id, seed);
        Ok(true)
    }

    async fn recent_seed_tokens(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SeedToken>, StoreError> {
        Ok(self
            .seed_tokens
            .iter()
            .filter(|r| r.value().snapshot_ts >= since)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn upsert_wallet(&self, wallet: Wallet) -> Result<(), StoreError> {
        self.wallets
            .entry(wallet.address.clone())
            .and_modify(|existing| {
                existing.last_active_at = wallet.last_active_at.or(existing.last_active_at);
                existing.is_contract = existing.is_contract || wallet.is_contract;
            })
            .or_insert(wallet);
        Ok(())
    }

    async fn get_wallet(&self, address: &str) -> Result<Option<Wallet>, StoreError> {
        Ok(self.wallets.get(address).map(|r| r.value().clone()))
    }

    async fn all_wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        Ok(self.wallets.iter().map(|r| r.value().clone()).collect())
    }

    async fn flag_bot(&self, address: &str) -> Result<(), StoreError> {
        if let Some(mut wallet) = self.wallets.get_mut(address) {
            wallet.is_bot = true;
        }
        Ok(())
    }

    async fn touch_wallet_activity(
        &self,
        address: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if let Some(mut wallet) = self.wallets.get_mut(address) {
            wallet.last_active_at = Some(at);
        }
        Ok(())
    }

    async fn insert_trade(&self, trade: Trade) -> Result<bool, StoreError> {
        if self.trades.contains_key(&trade.tx_hash) {
            return Ok(false);
        }
        if !self.tokens.contains_key(&trade.token_address) {
            return Err(StoreError::OrphanTrade(trade.token_address));
        }
        self.trades.insert(trade.tx_hash.clone(), trade);
        Ok(true)
    }

    async fn trades_for_wallet(
        &self,
        wallet_address: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Trade>, StoreError> {
        let mut out: Vec<Trade> = self
            .trades
            .iter()
            .filter(|r| r.value().wallet_address == wallet_address && r.value().ts >= since)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|t| t.ts);
        Ok(out)
    }

    async fn trades_for_token(
        &self,
        token_address: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Trade>, StoreError> {
        let mut out: Vec<Trade> = self
            .trades
            .iter()
            .filter(|r| {
                r.value().token_address == token_address
                    && since.map(|s| r.value().ts >= s).unwrap_or(true)
            })
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|t| t.ts);
        Ok(out)
    }

    async fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError> {
        let mut out: Vec<Trade> = self.trades.iter().map(|r| r.value().clone()).collect();
        out.sort_by_key(|t| std::cmp::Reverse(t.ts));
        out.truncate(limit);
        Ok(out)
    }

    async fn has_trade(&self, tx_hash: &str) -> Result<bool, StoreError> {
        Ok(self.trades.contains_key(tx_hash))
    }

    async fn upsert_position(&self, position: Position) -> Result<(), StoreError> {
        self.positions.insert(
            (position.wallet_address.clone(), position.token_address.clone()),
            position,
        );
        Ok(())
    }

    async fn get_position(
        &self,
        wallet_address: &str,
        token_address: &str,
    ) -> Result<Option<Position>, StoreError> {
        Ok(self
            .positions
            .get(&(wallet_address.to_string(), token_address.to_string()))
            .map(|r| r.value().clone()))
    }

    async fn positions_for_wallet(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<Position>, StoreError> {
        Ok(self
            .positions
            .iter()
            .filter(|r| r.key().0 == wallet_address)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn upsert_wallet_stats(&self, stats: WalletStats30D) -> Result<(), StoreError> {
        self.wallet_stats.insert(stats.wallet_address.clone(), stats);
        Ok(())
    }

    async fn get_wallet_stats(
        &self,
        wallet_address: &str,
    ) -> Result<Option<WalletStats30D>, StoreError> {
        Ok(self
            .wallet_stats
            .get(wallet_address)
            .map(|r| r.value().clone()))
    }

    async fn all_wallet_stats(&self) -> Result<Vec<WalletStats30D>, StoreError> {
        Ok(self
            .wallet_stats
            .iter()
            .map(|r| r.value().clone())
            .collect())
    }

    async fn upsert_custom_watchlist(
        &self,
        entry: CustomWatchlistWallet,
    ) -> Result<(), StoreError> {
        self.custom_watchlist
            .insert((entry.address.clone(), entry.chain_id), entry);
        Ok(())
    }

    async fn deactivate_custom_watchlist(
        &self,
        address: &str,
        chain_id: ChainId,
    ) -> Result<(), StoreError> {
        if let Some(mut entry) = self
            .custom_watchlist
            .get_mut(&(address.to_string(), chain_id))
        {
            entry.is_active = false;
        }
        Ok(())
    }

    async fn active_custom_watchlist(&self) -> Result<Vec<CustomWatchlistWallet>, StoreError> {
        Ok(self
            .custom_watchlist
            .iter()
            .filter(|r| r.value().is_active)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn insert_alert(&self, mut alert: Alert) -> Result<i64, StoreError> {
        let id = self.next_alert_id.fetch_add(1, Ordering::Relaxed);
        alert.id = Some(id);
        self.alerts.insert(id, alert);
        Ok(id)
    }

    async fn recent_alerts(&self, since: DateTime<Utc>) -> Result<Vec<Alert>, StoreError> {
        let mut out: Vec<Alert> = self
            .alerts
            .iter()
            .filter(|r| r.value().ts >= since)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by_key(|a| std::cmp::Reverse(a.ts));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Side;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[tokio::test]
    async fn token_upsert_is_idempotent() {
        let store = InMemoryStore::new();
        let t = Token::new("0xabc", ChainId::Ethereum, now());
        store.upsert_token(t.clone()).await.unwrap();
        store.upsert_token(t.clone()).await.unwrap();
        assert_eq!(store.all_tokens().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn trade_insert_is_idempotent_and_rejects_orphans() {
        let store = InMemoryStore::new();
        let trade = Trade {
            tx_hash: "0xdead".into(),
            ts: now(),
            chain_id: ChainId::Ethereum,
            wallet_address: "0xwallet".into(),
            token_address: "0xtoken".into(),
            side: Side::Buy,
            qty_token: 100.0,
            price_usd: 1.0,
            usd_value: 100.0,
            fee_usd: Some(1.0),
            venue: None,
        };

        // Orphan: token never upserted.
        assert!(matches!(
            store.insert_trade(trade.clone()).await,
            Err(StoreError::OrphanTrade(_))
        ));

        store
            .upsert_token(Token::new("0xtoken", ChainId::Ethereum, now()))
            .await
            .unwrap();

        assert!(store.insert_trade(trade.clone()).await.unwrap());
        assert!(!store.insert_trade(trade.clone()).await.unwrap());
        assert_eq!(
            store
                .trades_for_wallet("0xwallet", now() - Duration::days(1))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn bot_flag_is_sticky() {
        let store = InMemoryStore::new();
        store
            .upsert_wallet(Wallet::new("0xw", ChainId::Base, now()))
            .await
            .unwrap();
        store.flag_bot("0xw").await.unwrap();
        assert!(store.get_wallet("0xw").await.unwrap().unwrap().is_bot);

        // Re-upserting must not clear the sticky flag.
        store
            .upsert_wallet(Wallet::new("0xw", ChainId::Base, now()))
            .await
            .unwrap();
        assert!(store.get_wallet("0xw").await.unwrap().unwrap().is_bot);
    }
}
