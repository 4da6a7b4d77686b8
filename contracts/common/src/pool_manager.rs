//! In-memory reference pool manager.
//!
//! A `PoolCollaborator` for simulation and tests. It keeps token holdings,
//! accounted reserves, pools, positions and the delta ledger of the open
//! session, and follows the lock/unlock discipline of real pool managers:
//!
//! - pool-mutating calls are only accepted between `unlock` and `lock`
//! - `pay` moves tokens into custody; `settle` credits the session only for
//!   custody not yet accounted in reserves
//! - `lock` refuses to close a session with outstanding deltas
//!
//! Pricing is deliberately simple. Each pool trades at a fixed rate
//! (`price`, currency1 per currency0, scaled by `PRICE_SCALE`) minus the LP
//! fee, and liquidity is valued at that same rate. Real curve math is the
//! job of the production collaborator this stands in for.

use log::debug;

use crate::{
    collaborator::{Checkpoint, PoolCollaborator},
    constants::{fees::PIPS_DENOMINATOR, manager::{DEFAULT_CUSTODY, PRICE_SCALE}},
    errors::{SettleError, SettleResult},
    events::{EventLog, SettlementEvent},
    position::{position_key, position_key_for, Position},
    types::{
        Address, BalanceDelta, CollaboratorId, Currency, LiquidityChangeRequest, PoolId, PoolKey,
        PoolState, PositionKey, SwapQuote, SwapRequest,
    },
    validation::{validate_liquidity_change, validate_pool_key, validate_swap},
    BTreeMap, Vec,
};

/// One initialized pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub key: PoolKey,
    /// currency1 per currency0, scaled by `PRICE_SCALE`
    pub price: u128,
    pub liquidity: u128,
    pub reserve0: u128,
    pub reserve1: u128,
    /// Fee charged on swaps, in pips
    pub lp_fee: u32,
}

impl Pool {
    fn state(&self) -> PoolState {
        PoolState {
            price: self.price,
            liquidity: self.liquidity,
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            fee: self.lp_fee,
        }
    }
}

/// Amounts a swap moves, before any state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SwapComputation {
    amount_in: u128,
    amount_out: u128,
    fee_amount: u128,
}

/// Delta ledger of the open session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Session {
    locker: Address,
    deltas: BTreeMap<Currency, i128>,
}

/// Everything a rollback has to restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerState {
    pools: BTreeMap<PoolId, Pool>,
    positions: BTreeMap<PositionKey, Position>,
    /// Token holdings, custody included
    balances: BTreeMap<(Currency, Address), u128>,
    /// Custody already credited to sessions
    reserves: BTreeMap<Currency, u128>,
    session: Option<Session>,
}

/// Reference pool manager
#[derive(Debug, Clone)]
pub struct PoolManager {
    id: CollaboratorId,
    custody: Address,
    state: ManagerState,
    events: EventLog,
}

impl PoolManager {
    pub fn new(id: CollaboratorId) -> Self {
        Self::with_custody(id, DEFAULT_CUSTODY)
    }

    pub fn with_custody(id: CollaboratorId, custody: Address) -> Self {
        Self {
            id,
            custody,
            state: ManagerState::default(),
            events: EventLog::new(),
        }
    }

    /// Account holding the manager's tokens
    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    // ============ Administration ============

    /// Create a pool trading at `price`
    pub fn initialize(&mut self, key: PoolKey, price: u128) -> SettleResult<PoolId> {
        validate_pool_key(&key)?;
        if price == 0 {
            return Err(SettleError::CollaboratorRejected { reason: "zero price" });
        }

        let pool_id = key.id();
        if self.state.pools.contains_key(&pool_id) {
            return Err(SettleError::PoolAlreadyInitialized);
        }

        let lp_fee = if key.is_dynamic_fee() { 0 } else { key.fee };
        self.state.pools.insert(
            pool_id,
            Pool { key, price, liquidity: 0, reserve0: 0, reserve1: 0, lp_fee },
        );
        self.events.emit(SettlementEvent::PoolInitialized { pool_id, price, fee: lp_fee });
        debug!("initialized pool fee={} price={}", lp_fee, price);
        Ok(pool_id)
    }

    /// Set the fee of a dynamic-fee pool
    pub fn set_dynamic_fee(&mut self, key: &PoolKey, fee: u32) -> SettleResult<()> {
        if !key.is_dynamic_fee() {
            return Err(SettleError::InvalidPoolKey { reason: "pool fee is static" });
        }
        if fee > crate::constants::fees::MAX_LP_FEE {
            return Err(SettleError::InvalidPoolKey { reason: "fee above maximum" });
        }
        self.pool_mut(key)?.lp_fee = fee;
        Ok(())
    }

    /// Credit `amount` of `currency` to `to` (test and simulation funding)
    pub fn mint(&mut self, currency: Currency, to: Address, amount: u128) -> SettleResult<()> {
        let balance = self.state.balances.entry((currency, to)).or_default();
        *balance = balance.checked_add(amount).ok_or(SettleError::Overflow)?;
        Ok(())
    }

    // ============ Reads ============

    pub fn balance_of(&self, currency: &Currency, owner: &Address) -> u128 {
        self.state.balances.get(&(*currency, *owner)).copied().unwrap_or_default()
    }

    /// Custody already credited to sessions
    pub fn reserves_of(&self, currency: &Currency) -> u128 {
        self.state.reserves.get(currency).copied().unwrap_or_default()
    }

    pub fn pool(&self, key: &PoolKey) -> Option<&Pool> {
        self.state.pools.get(&key.id())
    }

    pub fn position(
        &self,
        key: &PoolKey,
        owner: &Address,
        tick_lower: i32,
        tick_upper: i32,
        salt: &[u8; 32],
    ) -> Option<&Position> {
        self.state.positions.get(&position_key(&key.id(), owner, tick_lower, tick_upper, salt))
    }

    pub fn is_unlocked(&self) -> bool {
        self.state.session.is_some()
    }

    // ============ Internals ============

    fn pool_mut(&mut self, key: &PoolKey) -> SettleResult<&mut Pool> {
        self.state.pools.get_mut(&key.id()).ok_or(SettleError::PoolNotInitialized)
    }

    fn session_mut(&mut self) -> SettleResult<&mut Session> {
        self.state.session.as_mut().ok_or(SettleError::ManagerLocked)
    }

    fn account(&mut self, currency: Currency, amount: i128) -> SettleResult<()> {
        let session = self.session_mut()?;
        let entry = session.deltas.entry(currency).or_default();
        *entry = entry.checked_add(amount).ok_or(SettleError::Overflow)?;
        Ok(())
    }

    fn move_tokens(&mut self, currency: Currency, from: Address, to: Address, amount: u128) -> SettleResult<()> {
        let available = self.balance_of(&currency, &from);
        if available < amount {
            return Err(SettleError::InsufficientBalance { available, requested: amount });
        }
        self.state.balances.insert((currency, from), available - amount);
        self.mint(currency, to, amount)
    }

    fn unsynced(&self, currency: &Currency) -> u128 {
        self.balance_of(currency, &self.custody).saturating_sub(self.reserves_of(currency))
    }
}

/// Fixed-rate swap amounts with the LP fee taken from the input
fn compute_swap(pool: &Pool, params: &SwapRequest) -> SettleResult<SwapComputation> {
    if let Some(limit) = params.price_limit {
        let crossed = if params.zero_for_one { limit >= pool.price } else { limit <= pool.price };
        if crossed {
            return Err(SettleError::PriceLimitExceeded { limit, price: pool.price });
        }
    }

    let fee = pool.lp_fee as u128;
    let denominator = PIPS_DENOMINATOR as u128;
    // Output for `net_in` of input at the pool rate
    let convert_out = |net_in: u128| -> SettleResult<u128> {
        if params.zero_for_one {
            mul_div(net_in, pool.price, PRICE_SCALE, false)
        } else {
            mul_div(net_in, PRICE_SCALE, pool.price, false)
        }
    };

    if params.is_exact_input() {
        let amount_in = params.amount_specified.unsigned_abs();
        let fee_amount = mul_div(amount_in, fee, denominator, true)?;
        let amount_out = convert_out(amount_in - fee_amount)?;
        Ok(SwapComputation { amount_in, amount_out, fee_amount })
    } else {
        if fee >= denominator {
            return Err(SettleError::CollaboratorRejected { reason: "fee consumes all input" });
        }
        let amount_out = params.amount_specified.unsigned_abs();
        let net_in = if params.zero_for_one {
            mul_div(amount_out, PRICE_SCALE, pool.price, true)?
        } else {
            mul_div(amount_out, pool.price, PRICE_SCALE, true)?
        };
        let amount_in = mul_div(net_in, denominator, denominator - fee, true)?;
        Ok(SwapComputation { amount_in, amount_out, fee_amount: amount_in - net_in })
    }
}

/// Liquidity valued at the pool rate: `liquidity` of currency0 plus its
/// price in currency1
fn liquidity_amounts(pool: &Pool, liquidity: u128, round_up: bool) -> SettleResult<(u128, u128)> {
    Ok((liquidity, mul_div(liquidity, pool.price, PRICE_SCALE, round_up)?))
}

fn mul_div(a: u128, b: u128, denominator: u128, round_up: bool) -> SettleResult<u128> {
    if denominator == 0 {
        return Err(SettleError::Overflow);
    }
    let product = a.checked_mul(b).ok_or(SettleError::Overflow)?;
    let quotient = product / denominator;
    if round_up && product % denominator != 0 {
        quotient.checked_add(1).ok_or(SettleError::Overflow)
    } else {
        Ok(quotient)
    }
}

fn signed(amount: u128) -> SettleResult<i128> {
    i128::try_from(amount).map_err(|_| SettleError::Overflow)
}

impl PoolCollaborator for PoolManager {
    fn id(&self) -> CollaboratorId {
        self.id
    }

    fn unlock(&mut self, locker: Address) -> SettleResult<()> {
        if self.state.session.is_some() {
            return Err(SettleError::CollaboratorRejected { reason: "already unlocked" });
        }
        self.state.session = Some(Session { locker, deltas: BTreeMap::new() });
        Ok(())
    }

    fn lock(&mut self) -> SettleResult<()> {
        if let Some(delta) = self.outstanding().first() {
            return Err(SettleError::SettlementIncomplete {
                currency: delta.currency,
                outstanding: delta.amount,
            });
        }
        self.state.session.take().map(|_| ()).ok_or(SettleError::ManagerLocked)
    }

    fn swap(
        &mut self,
        key: &PoolKey,
        params: &SwapRequest,
        extension_data: &[u8],
    ) -> SettleResult<Vec<BalanceDelta>> {
        self.session_mut()?;
        validate_swap(key, params)?;

        let pool = self.pool_mut(key)?;
        let computed = compute_swap(pool, params)?;
        let (reserve_in, reserve_out) = if params.zero_for_one {
            (pool.reserve0, pool.reserve1)
        } else {
            (pool.reserve1, pool.reserve0)
        };
        if computed.amount_out > reserve_out {
            return Err(SettleError::InsufficientLiquidity {
                available: reserve_out,
                requested: computed.amount_out,
            });
        }
        let new_in = reserve_in.checked_add(computed.amount_in).ok_or(SettleError::Overflow)?;
        let new_out = reserve_out - computed.amount_out;
        if params.zero_for_one {
            pool.reserve0 = new_in;
            pool.reserve1 = new_out;
        } else {
            pool.reserve1 = new_in;
            pool.reserve0 = new_out;
        }

        let amount_in = signed(computed.amount_in)?;
        let amount_out = signed(computed.amount_out)?;
        let (amount0, amount1) = if params.zero_for_one {
            (-amount_in, amount_out)
        } else {
            (amount_out, -amount_in)
        };
        debug!(
            "swap in={} out={} fee={} ext_len={}",
            computed.amount_in,
            computed.amount_out,
            computed.fee_amount,
            extension_data.len()
        );

        self.account(key.currency0, amount0)?;
        self.account(key.currency1, amount1)?;
        let mut deltas = Vec::with_capacity(2);
        deltas.push(BalanceDelta::new(key.currency0, amount0));
        deltas.push(BalanceDelta::new(key.currency1, amount1));
        Ok(deltas)
    }

    fn modify_liquidity(
        &mut self,
        key: &PoolKey,
        params: &LiquidityChangeRequest,
        extension_data: &[u8],
    ) -> SettleResult<Vec<BalanceDelta>> {
        let owner = self.session_mut()?.locker;
        validate_liquidity_change(key, params)?;

        if !self.state.pools.contains_key(&key.id()) {
            return Err(SettleError::PoolNotInitialized);
        }
        let position_id = position_key_for(&key.id(), &owner, params);
        let mut position = self
            .state
            .positions
            .get(&position_id)
            .copied()
            .unwrap_or_else(|| Position::new(owner, params.tick_lower, params.tick_upper));
        let available = position.liquidity;
        position.apply(params.liquidity_delta).ok_or(SettleError::InsufficientLiquidity {
            available,
            requested: params.liquidity_delta.unsigned_abs(),
        })?;

        let pool = self.pool_mut(key)?;
        let liquidity = params.liquidity_delta.unsigned_abs();
        let (amount0, amount1) = if params.is_add() {
            let (a0, a1) = liquidity_amounts(pool, liquidity, true)?;
            pool.liquidity = pool.liquidity.checked_add(liquidity).ok_or(SettleError::Overflow)?;
            pool.reserve0 = pool.reserve0.checked_add(a0).ok_or(SettleError::Overflow)?;
            pool.reserve1 = pool.reserve1.checked_add(a1).ok_or(SettleError::Overflow)?;
            (-signed(a0)?, -signed(a1)?)
        } else {
            let (a0, a1) = liquidity_amounts(pool, liquidity, false)?;
            if a0 > pool.reserve0 || a1 > pool.reserve1 {
                return Err(SettleError::InsufficientLiquidity {
                    available: pool.reserve0.min(pool.reserve1),
                    requested: a0.max(a1),
                });
            }
            pool.liquidity = pool.liquidity.checked_sub(liquidity).ok_or(
                SettleError::InsufficientLiquidity { available: pool.liquidity, requested: liquidity },
            )?;
            pool.reserve0 -= a0;
            pool.reserve1 -= a1;
            (signed(a0)?, signed(a1)?)
        };
        debug!(
            "modify_liquidity delta={} amounts=({}, {}) ext_len={}",
            params.liquidity_delta,
            amount0,
            amount1,
            extension_data.len()
        );

        if position.is_empty() {
            self.state.positions.remove(&position_id);
        } else {
            self.state.positions.insert(position_id, position);
        }

        self.account(key.currency0, amount0)?;
        self.account(key.currency1, amount1)?;
        let mut deltas = Vec::with_capacity(2);
        deltas.push(BalanceDelta::new(key.currency0, amount0));
        deltas.push(BalanceDelta::new(key.currency1, amount1));
        Ok(deltas)
    }

    fn pay(&mut self, currency: &Currency, from: &Address, amount: u128) -> SettleResult<()> {
        let custody = self.custody;
        self.move_tokens(*currency, *from, custody, amount)
    }

    fn settle(&mut self, currency: &Currency, amount: u128) -> SettleResult<()> {
        self.session_mut()?;
        let unsynced = self.unsynced(currency);
        if unsynced < amount {
            return Err(SettleError::InsufficientBalance { available: unsynced, requested: amount });
        }
        let reserves = self.state.reserves.entry(*currency).or_default();
        *reserves = reserves.checked_add(amount).ok_or(SettleError::Overflow)?;
        self.account(*currency, signed(amount)?)
    }

    fn take(&mut self, currency: &Currency, amount: u128, recipient: &Address) -> SettleResult<()> {
        self.session_mut()?;
        let reserves = self.reserves_of(currency);
        if reserves < amount {
            return Err(SettleError::InsufficientLiquidity { available: reserves, requested: amount });
        }
        let custody = self.custody;
        self.move_tokens(*currency, custody, *recipient, amount)?;
        self.state.reserves.insert(*currency, reserves - amount);
        self.account(*currency, -signed(amount)?)
    }

    fn outstanding(&self) -> Vec<BalanceDelta> {
        match &self.state.session {
            Some(session) => session
                .deltas
                .iter()
                .filter(|(_, amount)| **amount != 0)
                .map(|(currency, amount)| BalanceDelta::new(*currency, *amount))
                .collect(),
            None => Vec::new(),
        }
    }

    fn quote(&self, key: &PoolKey, params: &SwapRequest) -> SettleResult<SwapQuote> {
        validate_swap(key, params)?;
        let pool = self.pool(key).ok_or(SettleError::PoolNotInitialized)?;
        let computed = compute_swap(pool, params)?;
        Ok(SwapQuote {
            amount_in: computed.amount_in,
            amount_out: computed.amount_out,
            fee_amount: computed.fee_amount,
        })
    }

    fn pool_state(&self, key: &PoolKey) -> Option<PoolState> {
        self.pool(key).map(Pool::state)
    }
}

impl Checkpoint for PoolManager {
    type Snapshot = ManagerState;

    fn checkpoint(&self) -> ManagerState {
        self.state.clone()
    }

    fn restore(&mut self, snapshot: ManagerState) {
        self.state = snapshot;
    }
}
