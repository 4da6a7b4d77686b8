//! lockswap Common Library
//!
//! Settlement-delta reconciliation for pool managers that follow the
//! lock / settle / take discipline.
//!
//! A caller asks for a swap or a liquidity change. The request is wrapped
//! in a tagged envelope, dispatched to the pool collaborator, and the
//! signed per-currency deltas it returns are settled before the operation
//! counts as done:
//!
//! ```text
//! caller ──► encode ──► dispatch ──► settle ──► Settled
//!                          │            │
//!                          └────────────┴──► Aborted (collaborator restored)
//! ```
//!
//! ## Modules
//!
//! - **Envelope**: tagged wire codec for actions (`envelope`)
//! - **Dispatcher**: routes actions to exactly one collaborator call (`dispatcher`)
//! - **Settlement**: pays debts in and takes credits out (`settlement`)
//! - **Operation**: per-operation state machine and the `execute` entry point (`operation`)
//! - **Pool Manager**: in-memory reference collaborator for simulation (`pool_manager`)
//!
//! This crate is `no_std` compatible when built without the `std` feature.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

// Re-export collections for submodules based on feature
#[cfg(not(feature = "std"))]
pub use alloc::{collections::BTreeMap, string::String, vec::Vec};
#[cfg(feature = "std")]
pub use std::{collections::BTreeMap, string::String, vec::Vec};

pub mod constants;
pub mod errors;
pub mod types;
pub mod validation;
pub mod position;
pub mod events;
pub mod envelope;
pub mod collaborator;
pub mod dispatcher;
pub mod settlement;
pub mod operation;
pub mod pool_manager;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use collaborator::{Checkpoint, PoolCollaborator};
pub use dispatcher::{dispatch, dispatch_envelope, dispatch_tagged};
pub use envelope::{decode, encode, Envelope};
pub use errors::{SettleError, SettleResult};
pub use events::{AbortStage, EventLog, EventType, SettlementEvent};
pub use operation::{Executor, Operation, OperationState, Receipt};
pub use pool_manager::PoolManager;
pub use settlement::{settle_deltas, SettlementReport, SettlementStep};
pub use types::*;
