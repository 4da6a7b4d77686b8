//! Pool collaborator interface.
//!
//! The pool collaborator owns reserves and the per-session delta ledger.
//! This crate never touches that ledger directly: it reaches it only
//! through the entry points below, keeping the collaborator the single
//! source of truth for balances.

use crate::{
    errors::SettleResult,
    types::{
        Address, BalanceDelta, CollaboratorId, Currency, LiquidityChangeRequest, PoolKey,
        PoolState, SwapQuote, SwapRequest,
    },
    Vec,
};

/// Entry points of an external pool manager
pub trait PoolCollaborator {
    /// Identity bound to an operation at dispatch time
    fn id(&self) -> CollaboratorId;

    /// Open a session for `locker`. Deltas accrue until `lock`.
    fn unlock(&mut self, locker: Address) -> SettleResult<()>;

    /// Close the session. Fails while any delta is outstanding.
    fn lock(&mut self) -> SettleResult<()>;

    /// Execute a swap, returning one delta per currency touched
    fn swap(
        &mut self,
        key: &PoolKey,
        params: &SwapRequest,
        extension_data: &[u8],
    ) -> SettleResult<Vec<BalanceDelta>>;

    /// Add or remove liquidity, returning one delta per currency touched
    fn modify_liquidity(
        &mut self,
        key: &PoolKey,
        params: &LiquidityChangeRequest,
        extension_data: &[u8],
    ) -> SettleResult<Vec<BalanceDelta>>;

    /// Move `amount` of `currency` from `from` into the collaborator's custody.
    ///
    /// Custody alone does not clear a debt; `settle` must follow.
    fn pay(&mut self, currency: &Currency, from: &Address, amount: u128) -> SettleResult<()>;

    /// Acknowledge payment of a debt previously moved into custody
    fn settle(&mut self, currency: &Currency, amount: u128) -> SettleResult<()>;

    /// Release a credit to `recipient`
    fn take(&mut self, currency: &Currency, amount: u128, recipient: &Address) -> SettleResult<()>;

    /// Non-zero deltas of the open session
    fn outstanding(&self) -> Vec<BalanceDelta>;

    /// Read-only swap quote; produces no deltas
    fn quote(&self, key: &PoolKey, params: &SwapRequest) -> SettleResult<SwapQuote>;

    /// Read-only pool state accessor
    fn pool_state(&self, key: &PoolKey) -> Option<PoolState>;
}

/// Snapshot/restore support used to roll back a failed operation.
///
/// Collaborators that are not transactional themselves implement this so
/// that a failure between dispatch and full settlement leaves no trace.
pub trait Checkpoint {
    type Snapshot;

    /// Capture the current state
    fn checkpoint(&self) -> Self::Snapshot;

    /// Restore a previously captured state
    fn restore(&mut self, snapshot: Self::Snapshot);
}
