//! Operation lifecycle and the `execute` entry point.
//!
//! ```text
//! Requested ──► Dispatched ──► Settling ──► Settled
//!     │             │              │
//!     └─────────────┴──────────────┴──────► Aborted
//! ```
//!
//! An operation is atomic with respect to settlement: `Executor::execute`
//! snapshots the collaborator before dispatch and restores it on any
//! failure, so either every delta is cleared or nothing happened.

use log::{debug, warn};

use crate::{
    collaborator::{Checkpoint, PoolCollaborator},
    dispatcher::dispatch_envelope,
    envelope::{self, Envelope},
    errors::{SettleError, SettleResult},
    events::{AbortStage, EventLog, SettlementEvent},
    settlement::{settle_deltas, SettlementReport, SettlementStep},
    types::{ActionKind, Address, BalanceDelta, CollaboratorId, Request},
    Vec,
};

/// Per-operation state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    Requested,
    Dispatched,
    Settling,
    Settled,
    Aborted,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Aborted)
    }
}

/// One requested operation, from dispatch to settlement
#[derive(Debug, Clone)]
pub struct Operation {
    id: u64,
    initiator: Address,
    state: OperationState,
    bound: Option<CollaboratorId>,
    deltas: Vec<BalanceDelta>,
}

impl Operation {
    pub fn new(id: u64, initiator: Address) -> Self {
        Self {
            id,
            initiator,
            state: OperationState::Requested,
            bound: None,
            deltas: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Collaborator bound at dispatch
    pub fn bound_collaborator(&self) -> Option<CollaboratorId> {
        self.bound
    }

    /// Deltas awaiting settlement
    pub fn pending_deltas(&self) -> &[BalanceDelta] {
        &self.deltas
    }

    /// Dispatch the envelope and bind the collaborator.
    ///
    /// `Requested → Dispatched`, or `Aborted` on failure.
    pub fn dispatch<P: PoolCollaborator + ?Sized>(
        &mut self,
        envelope: &Envelope,
        pool: &mut P,
    ) -> SettleResult<&[BalanceDelta]> {
        if self.state != OperationState::Requested {
            return Err(SettleError::InvalidStateTransition);
        }

        match dispatch_envelope(envelope, pool) {
            Ok(deltas) => {
                self.bound = Some(pool.id());
                self.deltas = deltas;
                self.state = OperationState::Dispatched;
                Ok(&self.deltas)
            }
            Err(err) => {
                self.abort();
                Err(err)
            }
        }
    }

    /// Settle the dispatched deltas against the bound collaborator.
    ///
    /// `Dispatched → Settling → Settled`, or `Aborted` on failure. The
    /// deltas are consumed either way.
    pub fn settle<P: PoolCollaborator + ?Sized>(&mut self, pool: &mut P) -> SettleResult<SettlementReport> {
        if self.state != OperationState::Dispatched {
            return Err(SettleError::InvalidStateTransition);
        }

        let expected = self.bound.ok_or(SettleError::InvalidStateTransition)?;
        let actual = pool.id();
        if expected != actual {
            self.abort();
            return Err(SettleError::UnauthorizedCollaborator { expected, actual });
        }

        self.state = OperationState::Settling;
        let deltas = core::mem::take(&mut self.deltas);
        match settle_deltas(&deltas, &self.initiator, pool) {
            Ok(report) => {
                self.state = OperationState::Settled;
                Ok(report)
            }
            Err(err) => {
                self.abort();
                Err(err)
            }
        }
    }

    /// Move to `Aborted`.
    ///
    /// A `Settled` operation is aborted too when its collaborator refuses to
    /// lock afterwards, since the whole operation is then rolled back.
    pub fn abort(&mut self) {
        self.state = OperationState::Aborted;
        self.deltas.clear();
    }
}

/// Outcome of a successful `execute`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub operation_id: u64,
    pub kind: ActionKind,
    /// Deltas as produced by the collaborator
    pub deltas: Vec<BalanceDelta>,
    pub report: SettlementReport,
}

impl Receipt {
    /// Net delta for one currency (0 if untouched)
    pub fn delta_of(&self, currency: &[u8; 32]) -> i128 {
        self.deltas
            .iter()
            .filter(|d| &d.currency == currency)
            .map(|d| d.amount)
            .sum()
    }
}

/// Runs operations for one initiator, one at a time.
///
/// Exclusive (`&mut`) access to the collaborator for the whole of
/// `execute` is what keeps dispatch and settlement of two operations from
/// interleaving.
#[derive(Debug, Clone)]
pub struct Executor {
    initiator: Address,
    next_operation: u64,
    events: EventLog,
}

impl Executor {
    pub fn new(initiator: Address) -> Self {
        Self {
            initiator,
            next_operation: 1,
            events: EventLog::new(),
        }
    }

    pub fn initiator(&self) -> Address {
        self.initiator
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventLog {
        &mut self.events
    }

    /// Drain the recorded events; operation ids keep counting
    pub fn take_events(&mut self) -> Vec<SettlementEvent> {
        self.events.drain()
    }

    /// Encode, dispatch and settle one action
    pub fn execute<P>(
        &mut self,
        pool: &mut P,
        kind: ActionKind,
        request: Request,
        extension_data: &[u8],
    ) -> SettleResult<Receipt>
    where
        P: PoolCollaborator + Checkpoint + ?Sized,
    {
        let operation_id = self.allocate_id();
        let decoded = envelope::encode(kind, &request, extension_data)
            .and_then(|bytes| envelope::decode(&bytes));
        match decoded {
            Ok(envelope) => self.run(pool, operation_id, envelope),
            Err(err) => {
                self.record_abort(operation_id, AbortStage::Decode, &err);
                Err(err)
            }
        }
    }

    /// Decode caller-supplied envelope bytes, then dispatch and settle
    pub fn execute_envelope<P>(&mut self, pool: &mut P, bytes: &[u8]) -> SettleResult<Receipt>
    where
        P: PoolCollaborator + Checkpoint + ?Sized,
    {
        let operation_id = self.allocate_id();
        match envelope::decode(bytes) {
            Ok(envelope) => self.run(pool, operation_id, envelope),
            Err(err) => {
                self.record_abort(operation_id, AbortStage::Decode, &err);
                Err(err)
            }
        }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_operation;
        self.next_operation = self.next_operation.wrapping_add(1);
        id
    }

    fn run<P>(&mut self, pool: &mut P, operation_id: u64, envelope: Envelope) -> SettleResult<Receipt>
    where
        P: PoolCollaborator + Checkpoint + ?Sized,
    {
        let snapshot = pool.checkpoint();
        let events_before = self.events.len();
        let mut operation = Operation::new(operation_id, self.initiator);

        match self.run_inner(pool, &mut operation, &envelope) {
            Ok(receipt) => Ok(receipt),
            Err((stage, err)) => {
                operation.abort();
                pool.restore(snapshot);
                self.events.truncate(events_before);
                self.record_abort(operation_id, stage, &err);
                Err(err)
            }
        }
    }

    fn run_inner<P>(
        &mut self,
        pool: &mut P,
        operation: &mut Operation,
        envelope: &Envelope,
    ) -> Result<Receipt, (AbortStage, SettleError)>
    where
        P: PoolCollaborator + Checkpoint + ?Sized,
    {
        let operation_id = operation.id();

        pool.unlock(self.initiator)
            .map_err(|err| (AbortStage::Dispatch, err.into_rejection()))?;

        let deltas = operation
            .dispatch(envelope, pool)
            .map_err(|err| (AbortStage::Dispatch, err))?
            .to_vec();
        self.events.emit(SettlementEvent::OperationDispatched {
            operation_id,
            kind: envelope.kind,
            pool_id: envelope.request.key().id(),
            initiator: self.initiator,
            delta_count: u32::try_from(deltas.len()).unwrap_or(u32::MAX),
        });

        let report = operation
            .settle(pool)
            .map_err(|err| (AbortStage::Settlement, err))?;

        pool.lock().map_err(|err| (AbortStage::Lock, err))?;

        for step in &report.steps {
            self.events.emit(match *step {
                SettlementStep::Settle { currency, amount } => {
                    SettlementEvent::DebtSettled { operation_id, currency, amount }
                }
                SettlementStep::Take { currency, amount, recipient } => {
                    SettlementEvent::CreditTaken { operation_id, currency, amount, recipient }
                }
            });
        }
        self.events.emit(SettlementEvent::OperationSettled {
            operation_id,
            settle_calls: report.settle_calls,
            take_calls: report.take_calls,
        });
        debug!("operation {} settled with {} calls", operation_id, report.calls());

        Ok(Receipt {
            operation_id,
            kind: envelope.kind,
            deltas,
            report,
        })
    }

    fn record_abort(&mut self, operation_id: u64, stage: AbortStage, err: &SettleError) {
        warn!("operation {} aborted at {:?}: {}", operation_id, stage, err.code());
        self.events.emit(SettlementEvent::OperationAborted {
            operation_id,
            stage,
            code: err.code().into(),
        });
    }
}
