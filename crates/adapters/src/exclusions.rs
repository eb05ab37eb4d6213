//! Static exclusion list of stablecoin / wrapped-native addresses per
//! chain. Trades targeting one of these are not eligible for confluence or
//! paper trading — a whale "buying" USDC isn't a signal.

use alpha_entities::ChainId;
use once_cell::sync::Lazy;
use std::collections::HashSet;

static EXCLUDED: Lazy<HashSet<(ChainId, String)>> = Lazy::new(|| {
    let mut set = HashSet::new();
    let mut add = |chain: ChainId, addr: &str| {
        set.insert((chain, addr.to_ascii_lowercase()));
    };

    // USDC / USDT / WETH per EVM chain (illustrative addresses — adapters
    // wiring a real chain should supply the authoritative list).
    add(ChainId::Ethereum, "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"); // USDC
    add(ChainId::Ethereum, "0xdac17f958d2ee523a2206206994597c13d831ec7"); // USDT
    add(ChainId::Ethereum, "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"); // WETH

    add(ChainId::Base, "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"); // USDC
    add(ChainId::Base, "0x4200000000000000000000000000000000000006"); // WETH

    add(ChainId::Arbitrum, "0xaf88d065e77c8cc2239327c5edb3a432268e5831"); // USDC
    add(ChainId::Arbitrum, "0x82af49447d8a07e3bd95bd0d56f35241523fbab1"); // WETH

    add(ChainId::Solana, "epjfwdd5aufqssqem2qn1xzybapc8g4weggkzwytdt1q"); // USDC
    add(ChainId::Solana, "so11111111111111111111111111111111111111112"); // wSOL

    set
});

pub fn is_excluded(chain: ChainId, token_address: &str) -> bool {
    EXCLUDED.contains(&(chain, token_address.to_ascii_lowercase()))
}
