//! lockswap Router
//!
//! Caller-facing entry points over the settlement core. The router owns the
//! pool collaborator, screens requests against its `RouterConfig` and runs
//! each admitted request through the initiator's `Executor`, so every call
//! either settles completely or leaves the collaborator untouched.
//!
//! Requests arrive either typed (`swap`, `modify_liquidity`) or as CBOR
//! witness bytes (`execute_witness`).

use std::collections::BTreeMap;
use std::vec::Vec;

use borsh::{BorshDeserialize, BorshSerialize};
use log::{debug, info};
use serde::{Deserialize, Serialize};

pub mod witness;

use lockswap_common::{
    collaborator::{Checkpoint, PoolCollaborator},
    constants::fees,
    errors::{SettleError, SettleResult},
    events::{EventLog, SettlementEvent},
    operation::{Executor, Receipt},
    types::{
        ActionKind, Address, LiquidityChangeRequest, PoolKey, PoolState, Request, SwapQuote,
        SwapRequest,
    },
    validation::validate_request,
};

pub use witness::{parse_witness, RouterWitness, WitnessAction, OP_MODIFY_LIQUIDITY, OP_SWAP};

// ============ Configuration ============

/// Which pools and payloads the router will forward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct RouterConfig {
    /// Static fee tiers accepted, in pips
    pub allowed_fees: Vec<u32>,
    /// Accept pools flagged for dynamic fees
    pub allow_dynamic_fee: bool,
    /// Forward non-empty hook extension data
    pub allow_hook_data: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            allowed_fees: fees::STANDARD_TIERS.to_vec(),
            allow_dynamic_fee: true,
            allow_hook_data: true,
        }
    }
}

impl RouterConfig {
    /// Whether a pool key's fee is accepted
    pub fn allows_fee(&self, key: &PoolKey) -> bool {
        if key.is_dynamic_fee() {
            self.allow_dynamic_fee
        } else {
            self.allowed_fees.contains(&key.fee)
        }
    }
}

// ============ Router ============

/// Router over one pool collaborator
#[derive(Debug)]
pub struct PoolRouter<P> {
    pool: P,
    config: RouterConfig,
    executors: BTreeMap<Address, Executor>,
}

impl<P> PoolRouter<P>
where
    P: PoolCollaborator + Checkpoint,
{
    pub fn new(pool: P, config: RouterConfig) -> Self {
        Self {
            pool,
            config,
            executors: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// Direct access for pool administration (initialization, funding)
    pub fn pool_mut(&mut self) -> &mut P {
        &mut self.pool
    }

    pub fn into_inner(self) -> P {
        self.pool
    }

    /// Events recorded for one initiator, if it ever submitted anything
    pub fn events_for(&self, initiator: &Address) -> Option<&EventLog> {
        self.executors.get(initiator).map(Executor::events)
    }

    /// Drain one initiator's events. Returns nothing for unknown initiators.
    pub fn take_events(&mut self, initiator: &Address) -> Vec<SettlementEvent> {
        self.executors
            .get_mut(initiator)
            .map(Executor::take_events)
            .unwrap_or_default()
    }

    // ============ Operations ============

    pub fn swap(
        &mut self,
        initiator: Address,
        key: PoolKey,
        params: SwapRequest,
        hook_data: &[u8],
    ) -> SettleResult<Receipt> {
        self.submit(initiator, ActionKind::Swap, Request::Swap { key, params }, hook_data)
    }

    pub fn modify_liquidity(
        &mut self,
        initiator: Address,
        key: PoolKey,
        params: LiquidityChangeRequest,
        hook_data: &[u8],
    ) -> SettleResult<Receipt> {
        self.submit(
            initiator,
            ActionKind::ModifyLiquidity,
            Request::ModifyLiquidity { key, params },
            hook_data,
        )
    }

    /// Decode a CBOR witness and submit the action it describes
    pub fn execute_witness(&mut self, initiator: Address, bytes: &[u8]) -> SettleResult<Receipt> {
        let action = parse_witness(bytes)?;
        self.submit(initiator, action.kind, action.request, &action.hook_data)
    }

    // ============ Reads ============

    pub fn quote(&self, key: &PoolKey, params: &SwapRequest) -> SettleResult<SwapQuote> {
        if !self.config.allows_fee(key) {
            return Err(SettleError::InvalidPoolKey { reason: "fee tier not allowed" });
        }
        self.pool.quote(key, params)
    }

    pub fn pool_state(&self, key: &PoolKey) -> Option<PoolState> {
        self.pool.pool_state(key)
    }

    // ============ Internals ============

    fn admit(&self, initiator: &Address, request: &Request, hook_data: &[u8]) -> SettleResult<()> {
        validate_request(request)?;
        if !self.config.allows_fee(request.key()) {
            return Err(SettleError::InvalidPoolKey { reason: "fee tier not allowed" });
        }
        if !hook_data.is_empty() && !self.config.allow_hook_data {
            return Err(SettleError::Unauthorized { caller: *initiator });
        }
        Ok(())
    }

    fn submit(
        &mut self,
        initiator: Address,
        kind: ActionKind,
        request: Request,
        hook_data: &[u8],
    ) -> SettleResult<Receipt> {
        self.admit(&initiator, &request, hook_data)?;
        debug!("router admitted {:?} on pool {:?}", kind, request.key().id());

        let executor = self
            .executors
            .entry(initiator)
            .or_insert_with(|| Executor::new(initiator));
        let receipt = executor.execute(&mut self.pool, kind, request, hook_data)?;
        info!(
            "operation {} settled: {} settle, {} take",
            receipt.operation_id, receipt.report.settle_calls, receipt.report.take_calls
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use lockswap_common::{constants::manager::PRICE_SCALE, events::EventType, PoolManager};

    const LP: Address = [0x11; 32];
    const TRADER: Address = [0x22; 32];

    fn token0() -> [u8; 32] {
        [0x10; 32]
    }

    fn token1() -> [u8; 32] {
        [0x20; 32]
    }

    fn key() -> PoolKey {
        PoolKey::new(token0(), token1(), 500, 10, None).unwrap()
    }

    fn router(config: RouterConfig) -> PoolRouter<PoolManager> {
        let mut manager = PoolManager::new([0xC0; 32]);
        manager.initialize(key(), PRICE_SCALE).unwrap();
        for currency in [token0(), token1()] {
            manager.mint(currency, LP, 1_000_000).unwrap();
            manager.mint(currency, TRADER, 10_000).unwrap();
        }
        let mut router = PoolRouter::new(manager, config);
        router
            .modify_liquidity(LP, key(), LiquidityChangeRequest::new(-100, 100, 500_000), &[])
            .unwrap();
        router
    }

    #[test]
    fn test_default_config() {
        let config = RouterConfig::default();
        assert_eq!(config.allowed_fees, vec![100, 500, 3_000, 10_000]);
        assert!(config.allows_fee(&key()));
        let exotic = PoolKey::new(token0(), token1(), 2_500, 10, None).unwrap();
        assert!(!config.allows_fee(&exotic));
    }

    #[test]
    fn test_swap_through_router() {
        let mut router = router(RouterConfig::default());
        let params = SwapRequest::exact_input(true, 1_000).unwrap();
        let quote = router.quote(&key(), &params).unwrap();

        let receipt = router.swap(TRADER, key(), params, &[]).unwrap();

        assert_eq!(receipt.delta_of(&token1()), quote.amount_out as i128);
        assert_eq!(router.pool().balance_of(&token0(), &TRADER), 9_000);
        assert_eq!(router.pool().balance_of(&token1(), &TRADER), 10_000 + quote.amount_out);
        assert_eq!(
            router.events_for(&TRADER).unwrap().filter_by_type(EventType::OperationSettled).len(),
            1
        );
    }

    #[test]
    fn test_take_events_drains_initiator_log() {
        let mut router = router(RouterConfig::default());
        router.swap(TRADER, key(), SwapRequest::exact_input(true, 100).unwrap(), &[]).unwrap();

        let drained = router.take_events(&TRADER);

        assert_eq!(drained.last().map(SettlementEvent::event_type), Some(EventType::OperationSettled));
        assert!(router.events_for(&TRADER).unwrap().is_empty());
        assert_eq!(router.events_for(&LP).unwrap().len(), 4);
        assert!(router.take_events(&[0x99; 32]).is_empty());
    }

    #[test]
    fn test_fee_tier_not_allowed() {
        let config = RouterConfig { allowed_fees: vec![3_000], ..RouterConfig::default() };
        let mut manager = PoolManager::new([0xC0; 32]);
        manager.initialize(key(), PRICE_SCALE).unwrap();
        let mut router = PoolRouter::new(manager, config);

        let result = router.swap(TRADER, key(), SwapRequest::exact_input(true, 1).unwrap(), &[]);

        assert_matches!(result, Err(SettleError::InvalidPoolKey { reason: "fee tier not allowed" }));
        assert!(router.events_for(&TRADER).is_none());
    }

    #[test]
    fn test_hook_data_gate() {
        let config = RouterConfig { allow_hook_data: false, ..RouterConfig::default() };
        let mut router = router(config);
        let params = SwapRequest::exact_input(false, 10).unwrap();

        assert_eq!(
            router.swap(TRADER, key(), params, b"hook"),
            Err(SettleError::Unauthorized { caller: TRADER })
        );
        assert!(router.swap(TRADER, key(), params, &[]).is_ok());
    }

    #[test]
    fn test_invalid_request_rejected_before_dispatch() {
        let mut router = router(RouterConfig::default());
        let reserves = router.pool_state(&key()).unwrap();

        let result = router.modify_liquidity(TRADER, key(), LiquidityChangeRequest::new(100, -100, 5), &[]);

        assert_matches!(result, Err(SettleError::InvalidTickRange { .. }));
        assert_eq!(router.pool_state(&key()), Some(reserves));
    }

    #[test]
    fn test_execute_witness() {
        let mut router = router(RouterConfig::default());
        let bytes = RouterWitness::swap(key(), &SwapRequest::exact_output(true, 500).unwrap())
            .to_cbor()
            .unwrap();

        let receipt = router.execute_witness(TRADER, &bytes).unwrap();

        assert_eq!(receipt.kind, ActionKind::Swap);
        assert_eq!(receipt.delta_of(&token1()), 500);
        assert_eq!(router.pool().balance_of(&token1(), &TRADER), 10_500);
    }

    #[test]
    fn test_witness_liquidity_removal() {
        let mut router = router(RouterConfig::default());
        let bytes = RouterWitness::modify_liquidity(key(), &LiquidityChangeRequest::new(-100, 100, -200_000))
            .to_cbor()
            .unwrap();

        let receipt = router.execute_witness(LP, &bytes).unwrap();

        assert_eq!(receipt.report.take_calls, 2);
        assert_eq!(router.pool().balance_of(&token0(), &LP), 700_000);
        assert_eq!(router.pool_state(&key()).unwrap().liquidity, 300_000);
    }

    #[test]
    fn test_unfunded_swap_leaves_pool_untouched() {
        let mut router = router(RouterConfig::default());
        let before = router.pool_state(&key());

        let result = router.swap(TRADER, key(), SwapRequest::exact_input(true, 20_000).unwrap(), &[]);

        assert_matches!(result, Err(SettleError::SettlementIncomplete { .. }));
        assert_eq!(router.pool_state(&key()), before);
        assert_eq!(router.pool().balance_of(&token0(), &TRADER), 10_000);
        assert!(!router.pool().is_unlocked());
    }
}
