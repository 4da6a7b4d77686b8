//! Operation dispatcher.
//!
//! Routes a decoded action to exactly one pool-mutating collaborator call
//! and hands back the deltas it produced. No local accounting happens
//! here; the collaborator's deltas are trusted as returned.

use log::debug;

use crate::{
    collaborator::PoolCollaborator,
    envelope::Envelope,
    errors::{SettleError, SettleResult},
    types::{ActionKind, BalanceDelta, Request},
    Vec,
};

/// Dispatch an action to the collaborator.
///
/// Fails with `UnknownAction` before any collaborator call when `kind`
/// does not describe `request`. Refusals from the collaborator surface as
/// `CollaboratorRejected`.
pub fn dispatch<P: PoolCollaborator + ?Sized>(
    kind: ActionKind,
    request: &Request,
    extension_data: &[u8],
    pool: &mut P,
) -> SettleResult<Vec<BalanceDelta>> {
    if request.kind() != kind {
        return Err(SettleError::UnknownAction { tag: kind.tag() });
    }

    let deltas = match request {
        Request::Swap { key, params } => {
            debug!(
                "dispatch swap zero_for_one={} amount={} ext_len={}",
                params.zero_for_one,
                params.amount_specified,
                extension_data.len()
            );
            pool.swap(key, params, extension_data)
        }
        Request::ModifyLiquidity { key, params } => {
            debug!(
                "dispatch modify_liquidity [{}, {}] delta={} ext_len={}",
                params.tick_lower,
                params.tick_upper,
                params.liquidity_delta,
                extension_data.len()
            );
            pool.modify_liquidity(key, params, extension_data)
        }
    }
    .map_err(SettleError::into_rejection)?;

    debug!("collaborator returned {} deltas", deltas.len());
    Ok(deltas)
}

/// Dispatch using a raw wire tag.
///
/// Tags outside the recognised set fail with `UnknownAction` and issue no
/// collaborator call.
pub fn dispatch_tagged<P: PoolCollaborator + ?Sized>(
    tag: u8,
    request: &Request,
    extension_data: &[u8],
    pool: &mut P,
) -> SettleResult<Vec<BalanceDelta>> {
    let kind = ActionKind::try_from(tag)?;
    dispatch(kind, request, extension_data, pool)
}

/// Dispatch a decoded envelope
pub fn dispatch_envelope<P: PoolCollaborator + ?Sized>(
    envelope: &Envelope,
    pool: &mut P,
) -> SettleResult<Vec<BalanceDelta>> {
    dispatch(envelope.kind, &envelope.request, &envelope.extension_data, pool)
}
