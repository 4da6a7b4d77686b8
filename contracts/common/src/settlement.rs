//! Delta settlement engine.
//!
//! Clears the deltas produced by one dispatch, in the order the
//! collaborator produced them:
//!
//! - negative amount: pay `-amount` into custody, then `settle` it
//! - positive amount: `take` it for the initiator
//! - zero: nothing
//!
//! The first failing step stops the loop, so no later delta is acted on.
//! Once the loop finishes the collaborator must report nothing
//! outstanding; anything left over fails the settlement.

use log::{debug, warn};

use crate::{
    collaborator::PoolCollaborator,
    errors::{SettleError, SettleResult},
    types::{Address, BalanceDelta, Currency},
    Vec,
};

/// One collaborator interaction performed while settling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementStep {
    /// Debt paid into custody and acknowledged
    Settle { currency: Currency, amount: u128 },
    /// Credit released to the recipient
    Take { currency: Currency, amount: u128, recipient: Address },
}

/// What a successful settlement did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettlementReport {
    pub steps: Vec<SettlementStep>,
    pub settle_calls: u32,
    pub take_calls: u32,
    /// Zero-amount deltas that needed no action
    pub skipped: u32,
}

impl SettlementReport {
    /// Total collaborator settle/take calls issued
    pub fn calls(&self) -> u32 {
        self.settle_calls + self.take_calls
    }
}

/// Settle every delta against `pool` on behalf of `initiator`
pub fn settle_deltas<P: PoolCollaborator + ?Sized>(
    deltas: &[BalanceDelta],
    initiator: &Address,
    pool: &mut P,
) -> SettleResult<SettlementReport> {
    let mut report = SettlementReport::default();

    for (index, delta) in deltas.iter().enumerate() {
        if let Some(amount) = delta.debt() {
            pool.pay(&delta.currency, initiator, amount)
                .and_then(|_| pool.settle(&delta.currency, amount))
                .map_err(|err| incomplete(index, delta, err))?;
            debug!("settled delta {} ({} owed)", index, amount);
            report.settle_calls += 1;
            report.steps.push(SettlementStep::Settle { currency: delta.currency, amount });
        } else if let Some(amount) = delta.credit() {
            pool.take(&delta.currency, amount, initiator)
                .map_err(|err| incomplete(index, delta, err))?;
            debug!("took delta {} ({} credited)", index, amount);
            report.take_calls += 1;
            report.steps.push(SettlementStep::Take {
                currency: delta.currency,
                amount,
                recipient: *initiator,
            });
        } else {
            report.skipped += 1;
        }
    }

    if let Some(residual) = pool.outstanding().first() {
        warn!("residual delta {} after settlement", residual.amount);
        return Err(SettleError::SettlementIncomplete {
            currency: residual.currency,
            outstanding: residual.amount,
        });
    }

    Ok(report)
}

fn incomplete(index: usize, delta: &BalanceDelta, cause: SettleError) -> SettleError {
    warn!("delta {} failed to settle: {}", index, cause.code());
    SettleError::SettlementIncomplete {
        currency: delta.currency,
        outstanding: delta.amount,
    }
}
