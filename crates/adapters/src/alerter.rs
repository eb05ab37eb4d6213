//! `Alerter`: the outbound sink for emitted signals. Best-effort — it never
//! returns an error to the caller, so a downstream outage never blocks the
//! pipeline. The concrete chat-notification formatting (Telegram, etc.) is
//! not implemented here; this crate ships a `tracing`-backed sink that logs
//! what would have been sent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

/// Everything downstream needs to reconstruct the triggering conditions of
/// an emitted alert, independent of how the entity store represents it.
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub ts: DateTime<Utc>,
    pub alert_type: &'static str,
    pub token_address: String,
    pub chain_id: String,
    pub wallet_set: Vec<String>,
    pub rule_id: Option<String>,
    pub detail: serde_json::Value,
}

#[async_trait]
pub trait Alerter: Send + Sync {
    async fn emit(&self, payload: AlertPayload);
}

/// Default sink: logs the payload at `info` level via `tracing`. Swapping
/// in a real chat/webhook sink means implementing this trait — the rest of
/// the system never constructs a message string itself.
pub struct LoggingAlerter;

#[async_trait]
impl Alerter for LoggingAlerter {
    async fn emit(&self, payload: AlertPayload) {
        info!(
            alert_type = payload.alert_type,
            token = %payload.token_address,
            chain = %payload.chain_id,
            wallets = ?payload.wallet_set,
            rule_id = ?payload.rule_id,
            "alert emitted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alpha_entities::ChainId;

    #[tokio::test]
    async fn logging_alerter_never_panics_on_emit() {
        let alerter = LoggingAlerter;
        alerter
            .emit(AlertPayload {
                ts: Utc::now(),
                alert_type: "confluence",
                token_address: "0xtoken".into(),
                chain_id: ChainId::Ethereum.to_string(),
                wallet_set: vec!["0xw1".into(), "0xw2".into()],
                rule_id: Some("buy-confluence".into()),
                detail: serde_json::json!({ "min_wallets": 2 }),
            })
            .await;
    }
}
