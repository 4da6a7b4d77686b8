//! Liquidity position identity.
//!
//! A position belongs to one pool and is owned by whoever modifies
//! liquidity, over a tick range, disambiguated by a caller salt.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Address, LiquidityChangeRequest, PoolId, PositionKey};

/// Hash of (pool_id, owner, tick_lower, tick_upper, salt)
pub fn position_key(
    pool_id: &PoolId,
    owner: &Address,
    tick_lower: i32,
    tick_upper: i32,
    salt: &[u8; 32],
) -> PositionKey {
    let mut hasher = Sha256::new();
    hasher.update(pool_id);
    hasher.update(owner);
    hasher.update(tick_lower.to_be_bytes());
    hasher.update(tick_upper.to_be_bytes());
    hasher.update(salt);
    let result = hasher.finalize();
    let mut key = [0u8; 32];
    key.copy_from_slice(&result);
    key
}

/// Position key targeted by a liquidity change made by `owner` in `pool_id`
pub fn position_key_for(pool_id: &PoolId, owner: &Address, params: &LiquidityChangeRequest) -> PositionKey {
    position_key(pool_id, owner, params.tick_lower, params.tick_upper, &params.salt)
}

/// Liquidity held by one position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct Position {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
    pub liquidity: u128,
}

impl Position {
    pub fn new(owner: Address, tick_lower: i32, tick_upper: i32) -> Self {
        Self { owner, tick_lower, tick_upper, liquidity: 0 }
    }

    /// Apply a signed liquidity delta, refusing to go below zero
    pub fn apply(&mut self, liquidity_delta: i128) -> Option<u128> {
        let next = if liquidity_delta >= 0 {
            self.liquidity.checked_add(liquidity_delta.unsigned_abs())?
        } else {
            self.liquidity.checked_sub(liquidity_delta.unsigned_abs())?
        };
        self.liquidity = next;
        Some(next)
    }

    pub fn is_empty(&self) -> bool {
        self.liquidity == 0
    }
}
