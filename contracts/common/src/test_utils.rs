//! Scripted pool collaborator for unit tests.
//!
//! Returns queued deltas from `swap`/`modify_liquidity`, keeps a minimal
//! per-currency delta ledger and records every call it receives.

use std::collections::BTreeMap;

use crate::collaborator::{Checkpoint, PoolCollaborator};
use crate::errors::{SettleError, SettleResult};
use crate::types::{
    Address, BalanceDelta, CollaboratorId, Currency, LiquidityChangeRequest, PoolKey, PoolState,
    SwapQuote, SwapRequest,
};

pub fn token0() -> Currency {
    [0x10; 32]
}

pub fn token1() -> Currency {
    [0x20; 32]
}

pub fn initiator() -> Address {
    [0xAA; 32]
}

/// Token0/Token1, fee 3000, tick spacing 60
pub fn test_key() -> PoolKey {
    PoolKey::new(token0(), token1(), 3_000, 60, None).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Unlock { locker: Address },
    Lock,
    Swap { extension_data: Vec<u8> },
    ModifyLiquidity { extension_data: Vec<u8> },
    Pay { currency: Currency, from: Address, amount: u128 },
    Settle { currency: Currency, amount: u128 },
    Take { currency: Currency, amount: u128, recipient: Address },
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    deltas: BTreeMap<Currency, i128>,
    custody: BTreeMap<Currency, u128>,
    holdings: BTreeMap<Currency, u128>,
}

#[derive(Debug, Clone)]
pub struct ScriptedPool {
    pub id: CollaboratorId,
    pub calls: Vec<Call>,
    pub ledger: Ledger,
    script: Vec<BalanceDelta>,
    limited_holdings: bool,
    reject_dispatch: bool,
    reject_take: bool,
    reject_lock: bool,
}

impl ScriptedPool {
    pub fn new() -> Self {
        Self {
            id: [0xC0; 32],
            calls: Vec::new(),
            ledger: Ledger::default(),
            script: Vec::new(),
            limited_holdings: false,
            reject_dispatch: false,
            reject_take: false,
            reject_lock: false,
        }
    }

    /// Deltas returned by the next swap or liquidity change
    pub fn with_deltas(mut self, deltas: Vec<BalanceDelta>) -> Self {
        self.script = deltas;
        self
    }

    /// Limit what the initiator can pay in
    pub fn with_holdings(mut self, currency: Currency, amount: u128) -> Self {
        self.limited_holdings = true;
        self.ledger.holdings.insert(currency, amount);
        self
    }

    pub fn with_id(mut self, id: CollaboratorId) -> Self {
        self.id = id;
        self
    }

    pub fn rejecting_dispatch(mut self) -> Self {
        self.reject_dispatch = true;
        self
    }

    pub fn rejecting_take(mut self) -> Self {
        self.reject_take = true;
        self
    }

    pub fn rejecting_lock(mut self) -> Self {
        self.reject_lock = true;
        self
    }

    /// Raw per-currency deltas, for injecting residuals
    pub fn ledger_mut_for_tests(&mut self) -> &mut BTreeMap<Currency, i128> {
        &mut self.ledger.deltas
    }

    /// Settle and take calls issued so far
    pub fn settlement_calls(&self) -> Vec<&Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::Settle { .. } | Call::Take { .. }))
            .collect()
    }

    fn produce(&mut self) -> SettleResult<Vec<BalanceDelta>> {
        if self.reject_dispatch {
            return Err(SettleError::PriceLimitExceeded { limit: 1, price: 2 });
        }
        for delta in &self.script {
            *self.ledger.deltas.entry(delta.currency).or_default() += delta.amount;
        }
        Ok(self.script.clone())
    }
}

impl PoolCollaborator for ScriptedPool {
    fn id(&self) -> CollaboratorId {
        self.id
    }

    fn unlock(&mut self, locker: Address) -> SettleResult<()> {
        self.calls.push(Call::Unlock { locker });
        Ok(())
    }

    fn lock(&mut self) -> SettleResult<()> {
        self.calls.push(Call::Lock);
        if self.reject_lock {
            return Err(SettleError::CollaboratorRejected { reason: "lock refused" });
        }
        match self.outstanding().first() {
            Some(delta) => Err(SettleError::SettlementIncomplete {
                currency: delta.currency,
                outstanding: delta.amount,
            }),
            None => Ok(()),
        }
    }

    fn swap(&mut self, _key: &PoolKey, _params: &SwapRequest, extension_data: &[u8]) -> SettleResult<Vec<BalanceDelta>> {
        self.calls.push(Call::Swap { extension_data: extension_data.to_vec() });
        self.produce()
    }

    fn modify_liquidity(
        &mut self,
        _key: &PoolKey,
        _params: &LiquidityChangeRequest,
        extension_data: &[u8],
    ) -> SettleResult<Vec<BalanceDelta>> {
        self.calls.push(Call::ModifyLiquidity { extension_data: extension_data.to_vec() });
        self.produce()
    }

    fn pay(&mut self, currency: &Currency, from: &Address, amount: u128) -> SettleResult<()> {
        self.calls.push(Call::Pay { currency: *currency, from: *from, amount });
        if self.limited_holdings {
            let held = self.ledger.holdings.entry(*currency).or_default();
            if *held < amount {
                return Err(SettleError::InsufficientBalance { available: *held, requested: amount });
            }
            *held -= amount;
        }
        *self.ledger.custody.entry(*currency).or_default() += amount;
        Ok(())
    }

    fn settle(&mut self, currency: &Currency, amount: u128) -> SettleResult<()> {
        self.calls.push(Call::Settle { currency: *currency, amount });
        let custody = self.ledger.custody.entry(*currency).or_default();
        if *custody < amount {
            return Err(SettleError::InsufficientBalance { available: *custody, requested: amount });
        }
        *custody -= amount;
        *self.ledger.deltas.entry(*currency).or_default() += amount as i128;
        Ok(())
    }

    fn take(&mut self, currency: &Currency, amount: u128, recipient: &Address) -> SettleResult<()> {
        self.calls.push(Call::Take { currency: *currency, amount, recipient: *recipient });
        if self.reject_take {
            return Err(SettleError::CollaboratorRejected { reason: "take refused" });
        }
        *self.ledger.deltas.entry(*currency).or_default() -= amount as i128;
        Ok(())
    }

    fn outstanding(&self) -> Vec<BalanceDelta> {
        self.ledger
            .deltas
            .iter()
            .filter(|(_, amount)| **amount != 0)
            .map(|(currency, amount)| BalanceDelta::new(*currency, *amount))
            .collect()
    }

    fn quote(&self, _key: &PoolKey, _params: &SwapRequest) -> SettleResult<SwapQuote> {
        Ok(SwapQuote::default())
    }

    fn pool_state(&self, _key: &PoolKey) -> Option<PoolState> {
        None
    }
}

impl Checkpoint for ScriptedPool {
    type Snapshot = Ledger;

    fn checkpoint(&self) -> Ledger {
        self.ledger.clone()
    }

    fn restore(&mut self, snapshot: Ledger) {
        self.ledger = snapshot;
    }
}

impl Ledger {
    pub fn holding(&self, currency: &Currency) -> u128 {
        self.holdings.get(currency).copied().unwrap_or_default()
    }
}
