//! Shared process wiring: every job and every dashboard handler borrows its
//! dependencies from one `AppContext`, never constructing its own adapter
//! or store instance.

use crate::config::Config;
use alpha_adapters::{Alerter, ChainAdapter, PriceRouter, TrendingSource};
use alpha_confluence::ConfluenceStore;
use alpha_entities::{ChainId, EntityStore};
use alpha_paper_trader::PaperTrader;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<dyn EntityStore>,
    pub trending_sources: Arc<Vec<Arc<dyn TrendingSource>>>,
    pub chain_adapters: Arc<HashMap<ChainId, Arc<dyn ChainAdapter>>>,
    pub price_router: Arc<PriceRouter>,
    pub confluence: Arc<ConfluenceStore>,
    pub paper_trader: Arc<PaperTrader>,
    pub alerter: Arc<dyn Alerter>,
}

impl AppContext {
    pub fn chain_adapter(&self, chain: ChainId) -> Option<Arc<dyn ChainAdapter>> {
        self.chain_adapters.get(&chain).cloned()
    }
}
