use crate::model::{
    Alert, CustomWatchlistWallet, Position, SeedToken, Token, Trade, Wallet, WalletStats30D,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("referenced token {0} has not been upserted")]
    OrphanTrade(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// The entity store owns lifetime for every entity in the data model.
/// Components never hold a reference to another component's entity directly
/// — they look it up by identifier through this trait. Every method is `async`
/// even against the in-memory reference implementation, so callers never
/// assume synchronous access and a durable backend can be swapped in later.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Idempotent: upserting the same token twice leaves the store unchanged.
    async fn upsert_token(&self, token: Token) -> Result<(), StoreError>;
    async fn get_token(&self, token_address: &str) -> Result<Option<Token>, StoreError>;
    async fn all_tokens(&self) -> Result<Vec<Token>, StoreError>;

    /// Append a SeedToken snapshot. Returns `false` without writing if an
    /// entry with the same `(token_address, source, snapshot_ts)` already
    /// exists, keeping a single ingest pass idempotent per snapshot.
    async fn insert_seed_token(&self, seed: SeedToken) -> Result<bool, StoreError>;
    async fn recent_seed_tokens(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<SeedToken>, StoreError>;

    async fn upsert_wallet(&self, wallet: Wallet) -> Result<(), StoreError>;
    async fn get_wallet(&self, address: &str) -> Result<Option<Wallet>, StoreError>;
    async fn all_wallets(&self) -> Result<Vec<Wallet>, StoreError>;
    /// Flagging is sticky: once a wallet is flagged, re-upserting it never
    /// clears the flag.
    async fn flag_bot(&self, address: &str) -> Result<(), StoreError>;
    async fn touch_wallet_activity(
        &self,
        address: &str,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Insert a trade. Returns `false` without writing if `tx_hash` already
    /// exists. Fails with [`StoreError::OrphanTrade`] if the referenced token
    /// has never been upserted.
    async fn insert_trade(&self, trade: Trade) -> Result<bool, StoreError>;
    async fn trades_for_wallet(
        &self,
        wallet_address: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Trade>, StoreError>;
    async fn trades_for_token(
        &self,
        token_address: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Trade>, StoreError>;
    async fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>, StoreError>;
    async fn has_trade(&self, tx_hash: &str) -> Result<bool, StoreError>;

    async fn upsert_position(&self, position: Position) -> Result<(), StoreError>;
    async fn get_position(
        &self,
        wallet_address: &str,
        token_address: &str,
    ) -> Result<Option<Position>, StoreError>;
    async fn positions_for_wallet(
        &self,
        wallet_address: &str,
    ) -> Result<Vec<Position>, StoreError>;

    async fn upsert_wallet_stats(&self, stats: WalletStats30D) -> Result<(), StoreError>;
    async fn get_wallet_stats(
        &self,
        wallet_address: &str,
    ) -> Result<Option<WalletStats30D>, StoreError>;
    async fn all_wallet_stats(&self) -> Result<Vec<WalletStats30D>, StoreError>;

    async fn upsert_custom_watchlist(
        &self,
        entry: CustomWatchlistWallet,
    ) -> Result<(), StoreError>;
    async fn deactivate_custom_watchlist(
        &self,
        address: &str,
        chain_id: crate::model::ChainId,
    ) -> Result<(), StoreError>;
    async fn active_custom_watchlist(&self) -> Result<Vec<CustomWatchlistWallet>, StoreError>;

    async fn insert_alert(&self, alert: Alert) -> Result<i64, StoreError>;
    async fn recent_alerts(&self, since: DateTime<Utc>) -> Result<Vec<Alert>, StoreError>;
}
