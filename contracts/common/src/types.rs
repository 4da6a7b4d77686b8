//! Core Types for the settlement core
//!
//! Pool keys, swap and liquidity requests, balance deltas and the action
//! sum type shared by the envelope codec, the dispatcher and the
//! settlement engine.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::errors::{SettleError, SettleResult};
use crate::constants::action::{TAG_MODIFY_LIQUIDITY, TAG_SWAP};

/// Type alias for account addresses (32-byte hash)
pub type Address = [u8; 32];

/// Type alias for asset identifiers
pub type Currency = [u8; 32];

/// Type alias for pool identifiers (hash of the pool key)
pub type PoolId = [u8; 32];

/// Type alias for pool collaborator identities
pub type CollaboratorId = [u8; 32];

/// Type alias for liquidity position keys
pub type PositionKey = [u8; 32];

// ============ Pool Key ============

/// Identifies a trading pair and venue.
///
/// `currency0` is always strictly below `currency1`, so a pool is addressed
/// by the same key whichever direction a swap goes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct PoolKey {
    /// Lower-ordered asset of the pair
    pub currency0: Currency,
    /// Higher-ordered asset of the pair
    pub currency1: Currency,
    /// LP fee in pips, or the dynamic-fee flag
    pub fee: u32,
    /// Tick spacing of the pool
    pub tick_spacing: i32,
    /// Optional extension hook
    pub hooks: Option<Address>,
}

impl PoolKey {
    /// Build a key from an already ordered pair
    pub fn new(
        currency0: Currency,
        currency1: Currency,
        fee: u32,
        tick_spacing: i32,
        hooks: Option<Address>,
    ) -> SettleResult<Self> {
        let key = Self { currency0, currency1, fee, tick_spacing, hooks };
        crate::validation::validate_pool_key(&key)?;
        Ok(key)
    }

    /// Build a key from an unordered pair, sorting the currencies
    pub fn sorted(
        a: Currency,
        b: Currency,
        fee: u32,
        tick_spacing: i32,
        hooks: Option<Address>,
    ) -> SettleResult<Self> {
        let (currency0, currency1) = if a <= b { (a, b) } else { (b, a) };
        Self::new(currency0, currency1, fee, tick_spacing, hooks)
    }

    /// Deterministic pool identifier
    pub fn id(&self) -> PoolId {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.currency0);
        hasher.update(self.currency1);
        hasher.update(self.fee.to_le_bytes());
        hasher.update(self.tick_spacing.to_le_bytes());
        match &self.hooks {
            Some(hooks) => {
                hasher.update([1u8]);
                hasher.update(hooks);
            }
            None => hasher.update([0u8]),
        }
        let result = hasher.finalize();
        let mut id = [0u8; 32];
        id.copy_from_slice(&result);
        id
    }

    /// Whether the fee is decided by the hook at swap time
    pub fn is_dynamic_fee(&self) -> bool {
        self.fee == crate::constants::fees::DYNAMIC_FEE_FLAG
    }

    /// Returns (input currency, output currency) for a swap direction
    pub fn swap_currencies(&self, zero_for_one: bool) -> (Currency, Currency) {
        if zero_for_one {
            (self.currency0, self.currency1)
        } else {
            (self.currency1, self.currency0)
        }
    }
}

// ============ Requests ============

/// Swap parameters. Immutable once submitted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct SwapRequest {
    /// true swaps currency0 for currency1
    pub zero_for_one: bool,
    /// Positive for exact input, negative for exact output
    pub amount_specified: i128,
    /// Optional bound on the pool price (currency1 per currency0, in
    /// `PRICE_SCALE` units) the swap must not cross
    pub price_limit: Option<u128>,
}

impl SwapRequest {
    /// Exact-input swap of `amount_in`
    pub fn exact_input(zero_for_one: bool, amount_in: u128) -> SettleResult<Self> {
        let amount_specified = i128::try_from(amount_in).map_err(|_| SettleError::Overflow)?;
        Ok(Self { zero_for_one, amount_specified, price_limit: None })
    }

    /// Exact-output swap of `amount_out`
    pub fn exact_output(zero_for_one: bool, amount_out: u128) -> SettleResult<Self> {
        let amount_specified = i128::try_from(amount_out)
            .map_err(|_| SettleError::Overflow)?
            .checked_neg()
            .ok_or(SettleError::Overflow)?;
        Ok(Self { zero_for_one, amount_specified, price_limit: None })
    }

    /// Attach a price limit
    pub fn with_price_limit(mut self, limit: u128) -> Self {
        self.price_limit = Some(limit);
        self
    }

    pub fn is_exact_input(&self) -> bool {
        self.amount_specified > 0
    }
}

/// Liquidity change parameters
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct LiquidityChangeRequest {
    /// Lower tick of the position
    pub tick_lower: i32,
    /// Upper tick of the position
    pub tick_upper: i32,
    /// Positive adds liquidity, negative removes it
    pub liquidity_delta: i128,
    /// Caller salt distinguishing positions over the same range
    pub salt: [u8; 32],
}

impl LiquidityChangeRequest {
    pub fn new(tick_lower: i32, tick_upper: i32, liquidity_delta: i128) -> Self {
        Self { tick_lower, tick_upper, liquidity_delta, salt: [0u8; 32] }
    }

    /// Attach a position salt
    pub fn with_salt(mut self, salt: [u8; 32]) -> Self {
        self.salt = salt;
        self
    }

    pub fn is_add(&self) -> bool {
        self.liquidity_delta > 0
    }
}

// ============ Balance Delta ============

/// Signed settlement obligation for one currency.
///
/// Negative: the initiator owes the pool. Positive: the pool owes the
/// initiator. Zero: nothing to settle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct BalanceDelta {
    pub currency: Currency,
    pub amount: i128,
}

impl BalanceDelta {
    pub fn new(currency: Currency, amount: i128) -> Self {
        Self { currency, amount }
    }

    /// Amount the initiator must pay in, if any
    pub fn debt(&self) -> Option<u128> {
        (self.amount < 0).then(|| self.amount.unsigned_abs())
    }

    /// Amount the initiator may take out, if any
    pub fn credit(&self) -> Option<u128> {
        (self.amount > 0).then(|| self.amount.unsigned_abs())
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

// ============ Actions ============

/// Kind of pool operation carried by an envelope
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum ActionKind {
    Swap = 0x01,
    ModifyLiquidity = 0x02,
}

impl ActionKind {
    /// Wire tag of this kind
    pub fn tag(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ActionKind {
    type Error = SettleError;

    fn try_from(tag: u8) -> SettleResult<Self> {
        match tag {
            TAG_SWAP => Ok(Self::Swap),
            TAG_MODIFY_LIQUIDITY => Ok(Self::ModifyLiquidity),
            _ => Err(SettleError::UnknownAction { tag }),
        }
    }
}

/// A request bound to the pool it targets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub enum Request {
    Swap {
        key: PoolKey,
        params: SwapRequest,
    },
    ModifyLiquidity {
        key: PoolKey,
        params: LiquidityChangeRequest,
    },
}

impl Request {
    /// The kind this request belongs to
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Swap { .. } => ActionKind::Swap,
            Self::ModifyLiquidity { .. } => ActionKind::ModifyLiquidity,
        }
    }

    /// Pool targeted by this request
    pub fn key(&self) -> &PoolKey {
        match self {
            Self::Swap { key, .. } | Self::ModifyLiquidity { key, .. } => key,
        }
    }
}

// ============ Read-only Views ============

/// Read-only snapshot of a pool, as served by the collaborator
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct PoolState {
    /// Price of currency0 in currency1, scaled by `PRICE_SCALE`
    pub price: u128,
    /// Active liquidity
    pub liquidity: u128,
    /// currency0 held by the pool
    pub reserve0: u128,
    /// currency1 held by the pool
    pub reserve1: u128,
    /// Fee currently charged, in pips
    pub fee: u32,
}

/// Result of a read-only swap quote
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default,
    Serialize, Deserialize, BorshSerialize, BorshDeserialize,
)]
pub struct SwapQuote {
    pub amount_in: u128,
    pub amount_out: u128,
    pub fee_amount: u128,
}
