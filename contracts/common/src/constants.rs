//! Protocol Constants
//!
//! Wire tags, fee limits and tick bounds shared by the settlement core,
//! the reference pool manager and the router.
//!
//! Tick and fee limits mirror the concentrated-liquidity pool managers this
//! core is meant to talk to, so keys validated here are accepted there.

/// Envelope wire tags
pub mod action {
    /// Tag byte for a swap envelope
    pub const TAG_SWAP: u8 = 0x01;
    /// Tag byte for a modify-liquidity envelope
    pub const TAG_MODIFY_LIQUIDITY: u8 = 0x02;
    /// Length of the tag header preceding the borsh body
    pub const TAG_LEN: usize = 1;
}

/// LP fee configuration (in pips, 1_000_000 = 100%)
pub mod fees {
    /// Fee denominator
    pub const PIPS_DENOMINATOR: u32 = 1_000_000;

    /// Largest static LP fee a pool may declare (100%)
    pub const MAX_LP_FEE: u32 = 1_000_000;

    /// Flag marking a pool whose fee is decided by its hook at swap time
    pub const DYNAMIC_FEE_FLAG: u32 = 0x80_0000;

    /// Standard fee tiers accepted by the router by default
    pub const STANDARD_TIERS: [u32; 4] = [100, 500, 3_000, 10_000];
}

/// Tick configuration
pub mod ticks {
    /// Lowest usable tick
    pub const MIN_TICK: i32 = -887_272;

    /// Highest usable tick
    pub const MAX_TICK: i32 = 887_272;

    /// Smallest tick spacing a pool may declare
    pub const MIN_TICK_SPACING: i32 = 1;

    /// Largest tick spacing a pool may declare
    pub const MAX_TICK_SPACING: i32 = 32_767;
}

/// Reference pool manager configuration
pub mod manager {
    /// Scale of the fixed-rate price used by the reference manager (1e18)
    pub const PRICE_SCALE: u128 = 1_000_000_000_000_000_000;

    /// Address used as custody account of the reference manager
    pub const DEFAULT_CUSTODY: [u8; 32] = [0xEE; 32];
}
