//! Shared data model for the alpha-wallet pipeline.
//!
//! Entities mirror the pipeline's logical schema:
//! `Token`, `SeedToken`, `Wallet`, `Trade`, `Position`, `WalletStats30D`,
//! `CustomWatchlistWallet`, and `Alert`. Components never hold references to
//! each other's entities directly; they look each other up by identifier
//! through an [`EntityStore`].

mod model;
mod store;

pub mod memory;

pub use model::*;
pub use store::{EntityStore, StoreError};
