//! Validation Helpers
//!
//! Request validation shared by the pool key constructors, the reference
//! pool manager and the router.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lockswap_common::validation::{check, validate_pool_key};
//!
//! check!(amount != 0, SettleError::ZeroAmount);
//! validate_pool_key(&key)?;
//! ```

use crate::{
    constants::{fees, ticks},
    errors::{SettleError, SettleResult},
    types::{LiquidityChangeRequest, PoolKey, Request, SwapRequest},
};

// ============ Validation Macro ============

/// Check a condition and return an error if it fails.
///
/// ```rust,ignore
/// check!(key.currency0 < key.currency1, SettleError::InvalidPoolKey {
///     reason: "currencies out of order",
/// });
/// ```
#[macro_export]
macro_rules! check {
    ($condition:expr, $error:expr) => {
        if !($condition) {
            return Err($error);
        }
    };
}

pub use check;

// ============ Pool Keys ============

/// Validates ordering, fee and tick spacing of a pool key
pub fn validate_pool_key(key: &PoolKey) -> SettleResult<()> {
    check!(
        key.currency0 < key.currency1,
        SettleError::InvalidPoolKey { reason: "currencies must be distinct and ordered" }
    );
    check!(
        key.fee <= fees::MAX_LP_FEE || key.is_dynamic_fee(),
        SettleError::InvalidPoolKey { reason: "fee above maximum" }
    );
    check!(
        key.tick_spacing >= ticks::MIN_TICK_SPACING,
        SettleError::InvalidPoolKey { reason: "tick spacing too small" }
    );
    check!(
        key.tick_spacing <= ticks::MAX_TICK_SPACING,
        SettleError::InvalidPoolKey { reason: "tick spacing too large" }
    );
    check!(
        key.hooks != Some([0u8; 32]),
        SettleError::InvalidPoolKey { reason: "zero hook address, use None" }
    );
    Ok(())
}

// ============ Requests ============

/// Validates a swap request against its pool
pub fn validate_swap(_key: &PoolKey, params: &SwapRequest) -> SettleResult<()> {
    check!(params.amount_specified != 0, SettleError::ZeroAmount);
    check!(params.amount_specified != i128::MIN, SettleError::Overflow);
    Ok(())
}

/// Validates a liquidity change against its pool's tick spacing
pub fn validate_liquidity_change(
    key: &PoolKey,
    params: &LiquidityChangeRequest,
) -> SettleResult<()> {
    check!(params.liquidity_delta != 0, SettleError::ZeroAmount);
    check!(params.liquidity_delta != i128::MIN, SettleError::Overflow);
    validate_tick_range(params.tick_lower, params.tick_upper, key.tick_spacing)
}

/// Validates a tick range: ordered, in bounds and aligned to spacing
pub fn validate_tick_range(lower: i32, upper: i32, tick_spacing: i32) -> SettleResult<()> {
    let err = SettleError::InvalidTickRange { lower, upper };
    check!(lower < upper, err);
    check!(lower >= ticks::MIN_TICK, err);
    check!(upper <= ticks::MAX_TICK, err);
    check!(tick_spacing > 0, err);
    check!(lower % tick_spacing == 0 && upper % tick_spacing == 0, err);
    Ok(())
}

/// Validates any request, including its pool key
pub fn validate_request(request: &Request) -> SettleResult<()> {
    validate_pool_key(request.key())?;
    match request {
        Request::Swap { key, params } => validate_swap(key, params),
        Request::ModifyLiquidity { key, params } => validate_liquidity_change(key, params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(spacing: i32) -> PoolKey {
        PoolKey {
            currency0: [1u8; 32],
            currency1: [2u8; 32],
            fee: 3_000,
            tick_spacing: spacing,
            hooks: None,
        }
    }

    #[test]
    fn test_valid_key() {
        assert!(validate_pool_key(&key(60)).is_ok());
    }

    #[test]
    fn test_identical_currencies_rejected() {
        let mut k = key(60);
        k.currency1 = k.currency0;
        assert!(matches!(validate_pool_key(&k), Err(SettleError::InvalidPoolKey { .. })));
    }

    #[test]
    fn test_fee_limits() {
        let mut k = key(60);
        k.fee = fees::MAX_LP_FEE + 1;
        assert!(validate_pool_key(&k).is_err());
        k.fee = fees::DYNAMIC_FEE_FLAG;
        assert!(validate_pool_key(&k).is_ok());
    }

    #[test]
    fn test_spacing_limits() {
        assert!(validate_pool_key(&key(0)).is_err());
        assert!(validate_pool_key(&key(ticks::MAX_TICK_SPACING + 1)).is_err());
        assert!(validate_pool_key(&key(ticks::MAX_TICK_SPACING)).is_ok());
    }

    #[test]
    fn test_zero_hook_rejected() {
        let mut k = key(60);
        k.hooks = Some([0u8; 32]);
        assert!(validate_pool_key(&k).is_err());
    }

    #[test]
    fn test_tick_range() {
        assert!(validate_tick_range(-600, 600, 60).is_ok());
        assert_eq!(
            validate_tick_range(600, -600, 60),
            Err(SettleError::InvalidTickRange { lower: 600, upper: -600 })
        );
        // Misaligned
        assert!(validate_tick_range(-590, 600, 60).is_err());
        // Out of bounds
        assert!(validate_tick_range(ticks::MIN_TICK - 1, 0, 1).is_err());
    }

    #[test]
    fn test_zero_amounts_rejected() {
        let k = key(60);
        let swap = SwapRequest { zero_for_one: true, amount_specified: 0, price_limit: None };
        assert_eq!(validate_swap(&k, &swap), Err(SettleError::ZeroAmount));
        let lp = LiquidityChangeRequest::new(-60, 60, 0);
        assert_eq!(validate_liquidity_change(&k, &lp), Err(SettleError::ZeroAmount));
    }

    #[test]
    fn test_validate_request_dispatches_by_kind() {
        let k = key(60);
        let lp = Request::ModifyLiquidity { key: k, params: LiquidityChangeRequest::new(-61, 60, 5) };
        assert!(matches!(validate_request(&lp), Err(SettleError::InvalidTickRange { .. })));
    }
}
