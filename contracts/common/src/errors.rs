//! Error Types for the settlement core
//!
//! Every failure of an `execute` call is reported as one `SettleError`.
//! None of them is retried internally: whether a retry is safe depends on
//! the pool collaborator, not on this crate.

use thiserror::Error;

use crate::types::{Address, CollaboratorId, Currency};

/// Result type alias for settlement operations
pub type SettleResult<T> = Result<T, SettleError>;

/// Main error enum for the settlement core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettleError {
    // ============ Envelope Errors ============
    /// Envelope bytes do not match the tagged-union layout
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope { reason: &'static str },

    // ============ Dispatch Errors ============
    /// Action kind outside the recognised set, or not matching its request
    #[error("unknown action tag {tag:#04x}")]
    UnknownAction { tag: u8 },

    /// The pool collaborator refused the swap or liquidity change
    #[error("collaborator rejected request: {reason}")]
    CollaboratorRejected { reason: &'static str },

    // ============ Settlement Errors ============
    /// Settlement attempted against a collaborator other than the bound one
    #[error("collaborator {actual:?} is not the one bound at dispatch ({expected:?})")]
    UnauthorizedCollaborator {
        expected: CollaboratorId,
        actual: CollaboratorId,
    },

    /// A delta could not be cleared, or deltas remain after settlement
    #[error("settlement incomplete for currency {currency:?}: {outstanding} outstanding")]
    SettlementIncomplete { currency: Currency, outstanding: i128 },

    /// Holder does not own enough of an asset for a transfer
    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance { available: u128, requested: u128 },

    // ============ Validation Errors ============
    /// Pool key violates ordering, fee or spacing rules
    #[error("invalid pool key: {reason}")]
    InvalidPoolKey { reason: &'static str },

    /// Tick range is unordered, out of bounds or misaligned
    #[error("invalid tick range [{lower}, {upper}]")]
    InvalidTickRange { lower: i32, upper: i32 },

    /// Zero swap amount or liquidity delta
    #[error("zero amount not allowed")]
    ZeroAmount,

    // ============ Pool Manager Errors ============
    /// Pool has not been initialized
    #[error("pool not initialized")]
    PoolNotInitialized,

    /// Pool was already initialized
    #[error("pool already initialized")]
    PoolAlreadyInitialized,

    /// Pool-mutating call made outside an unlocked session
    #[error("pool manager is locked")]
    ManagerLocked,

    /// Swap would cross the caller's price limit
    #[error("price limit {limit} exceeded by pool price {price}")]
    PriceLimitExceeded { limit: u128, price: u128 },

    /// Pool cannot cover the requested output or liquidity removal
    #[error("insufficient liquidity: {available} available, {requested} requested")]
    InsufficientLiquidity { available: u128, requested: u128 },

    /// Caller is not allowed to act on a position or holding
    #[error("unauthorized caller {caller:?}")]
    Unauthorized { caller: Address },

    // ============ State Errors ============
    /// Operation state machine transition not allowed
    #[error("invalid operation state transition")]
    InvalidStateTransition,

    // ============ Math Errors ============
    /// Arithmetic overflow occurred
    #[error("arithmetic overflow")]
    Overflow,
}

impl SettleError {
    /// Returns a stable error code for logging and event indexing
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope { .. } => "E001_MALFORMED_ENVELOPE",
            Self::UnknownAction { .. } => "E010_UNKNOWN_ACTION",
            Self::CollaboratorRejected { .. } => "E011_COLLABORATOR_REJECTED",
            Self::UnauthorizedCollaborator { .. } => "E020_UNAUTHORIZED_COLLABORATOR",
            Self::SettlementIncomplete { .. } => "E021_SETTLEMENT_INCOMPLETE",
            Self::InsufficientBalance { .. } => "E022_INSUFFICIENT_BALANCE",
            Self::InvalidPoolKey { .. } => "E030_INVALID_POOL_KEY",
            Self::InvalidTickRange { .. } => "E031_INVALID_TICK_RANGE",
            Self::ZeroAmount => "E032_ZERO_AMOUNT",
            Self::PoolNotInitialized => "E040_POOL_NOT_INIT",
            Self::PoolAlreadyInitialized => "E041_POOL_ALREADY_INIT",
            Self::ManagerLocked => "E042_MANAGER_LOCKED",
            Self::PriceLimitExceeded { .. } => "E043_PRICE_LIMIT",
            Self::InsufficientLiquidity { .. } => "E044_INSUFFICIENT_LIQUIDITY",
            Self::Unauthorized { .. } => "E045_UNAUTHORIZED",
            Self::InvalidStateTransition => "E050_INVALID_STATE",
            Self::Overflow => "E060_OVERFLOW",
        }
    }

    /// Returns true if the caller can fix the request and submit again
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientBalance { .. }
                | Self::PriceLimitExceeded { .. }
                | Self::InsufficientLiquidity { .. }
                | Self::ZeroAmount
        )
    }

    /// Wrap a pool manager refusal raised below the dispatcher
    pub(crate) fn into_rejection(self) -> Self {
        match self {
            Self::CollaboratorRejected { .. } => self,
            Self::PoolNotInitialized => Self::CollaboratorRejected { reason: "pool not initialized" },
            Self::ManagerLocked => Self::CollaboratorRejected { reason: "manager locked" },
            Self::PriceLimitExceeded { .. } => Self::CollaboratorRejected { reason: "price limit exceeded" },
            Self::InsufficientLiquidity { .. } => Self::CollaboratorRejected { reason: "insufficient liquidity" },
            Self::InvalidTickRange { .. } => Self::CollaboratorRejected { reason: "invalid tick range" },
            Self::ZeroAmount => Self::CollaboratorRejected { reason: "zero amount" },
            Self::Overflow => Self::CollaboratorRejected { reason: "arithmetic overflow" },
            Self::Unauthorized { .. } => Self::CollaboratorRejected { reason: "unauthorized" },
            other => other,
        }
    }
}
