//! Settlement Events
//!
//! Events are emitted while operations run and can be indexed off-line to
//! audit every debt paid in and every credit taken out.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::types::{ActionKind, Address, Currency, PoolId};
use crate::{String, Vec};

/// Event types for indexing and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[borsh(use_discriminant = true)]
#[repr(u8)]
pub enum EventType {
    // Pool Events (0x01 - 0x1F)
    PoolInitialized = 0x01,

    // Operation Events (0x20 - 0x3F)
    OperationDispatched = 0x20,
    OperationSettled = 0x21,
    OperationAborted = 0x22,

    // Settlement Events (0x40 - 0x5F)
    DebtSettled = 0x40,
    CreditTaken = 0x41,
}

/// Stage at which an operation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum AbortStage {
    Decode,
    Dispatch,
    Settlement,
    Lock,
}

/// Main event enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub enum SettlementEvent {
    /// Emitted when the reference manager initializes a pool
    PoolInitialized {
        pool_id: PoolId,
        price: u128,
        fee: u32,
    },

    /// Emitted once the collaborator has returned deltas for an operation
    OperationDispatched {
        operation_id: u64,
        kind: ActionKind,
        pool_id: PoolId,
        initiator: Address,
        delta_count: u32,
    },

    /// Emitted for every debt paid into the collaborator
    DebtSettled {
        operation_id: u64,
        currency: Currency,
        amount: u128,
    },

    /// Emitted for every credit released by the collaborator
    CreditTaken {
        operation_id: u64,
        currency: Currency,
        amount: u128,
        recipient: Address,
    },

    /// Emitted when every delta of an operation has been cleared
    OperationSettled {
        operation_id: u64,
        settle_calls: u32,
        take_calls: u32,
    },

    /// Emitted when an operation is rolled back
    OperationAborted {
        operation_id: u64,
        stage: AbortStage,
        code: String,
    },
}

impl SettlementEvent {
    /// Get the event type for filtering
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PoolInitialized { .. } => EventType::PoolInitialized,
            Self::OperationDispatched { .. } => EventType::OperationDispatched,
            Self::DebtSettled { .. } => EventType::DebtSettled,
            Self::CreditTaken { .. } => EventType::CreditTaken,
            Self::OperationSettled { .. } => EventType::OperationSettled,
            Self::OperationAborted { .. } => EventType::OperationAborted,
        }
    }

    /// Operation the event belongs to, if any
    pub fn operation_id(&self) -> Option<u64> {
        match self {
            Self::PoolInitialized { .. } => None,
            Self::OperationDispatched { operation_id, .. }
            | Self::DebtSettled { operation_id, .. }
            | Self::CreditTaken { operation_id, .. }
            | Self::OperationSettled { operation_id, .. }
            | Self::OperationAborted { operation_id, .. } => Some(*operation_id),
        }
    }

    /// Serialize event to bytes for storage/transmission
    pub fn to_bytes(&self) -> Vec<u8> {
        borsh::to_vec(self).unwrap_or_default()
    }

    /// Deserialize event from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        borsh::from_slice(bytes).ok()
    }
}

/// Event log for collecting events during execution
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SettlementEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Emit an event (add to log)
    pub fn emit(&mut self, event: SettlementEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[SettlementEvent] {
        &self.events
    }

    /// Take ownership of all events
    pub fn into_events(self) -> Vec<SettlementEvent> {
        self.events
    }

    /// Filter events by type
    pub fn filter_by_type(&self, event_type: EventType) -> Vec<&SettlementEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events belonging to one operation
    pub fn for_operation(&self, operation_id: u64) -> Vec<&SettlementEvent> {
        self.events
            .iter()
            .filter(|e| e.operation_id() == Some(operation_id))
            .collect()
    }

    /// Drop every event after the first `len`
    pub(crate) fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    /// Check if any events were emitted
    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Get number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Hand over every recorded event, leaving the log empty
    pub fn drain(&mut self) -> Vec<SettlementEvent> {
        core::mem::take(&mut self.events)
    }
}
