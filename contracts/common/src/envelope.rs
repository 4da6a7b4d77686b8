//! Action envelope codec.
//!
//! An envelope is the serialized, tagged form of a requested operation:
//!
//! ```text
//! +---------+---------------------------------------------------+
//! | tag: u8 | borsh(PoolKey, <request params>, Vec<u8> ext data) |
//! +---------+---------------------------------------------------+
//! ```
//!
//! `0x01` carries a `SwapRequest`, `0x02` a `LiquidityChangeRequest`.
//! The body must be consumed exactly; trailing bytes are malformed.
//! Extension data is opaque and forwarded untouched.

use borsh::BorshSerialize;

use crate::{
    constants::action::TAG_LEN,
    errors::{SettleError, SettleResult},
    types::{ActionKind, LiquidityChangeRequest, PoolKey, Request, SwapRequest},
    Vec,
};

/// A decoded action envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: ActionKind,
    pub request: Request,
    pub extension_data: Vec<u8>,
}

impl Envelope {
    /// Build an envelope, checking that the kind matches the request
    pub fn new(kind: ActionKind, request: Request, extension_data: Vec<u8>) -> SettleResult<Self> {
        if request.kind() != kind {
            return Err(SettleError::MalformedEnvelope {
                reason: "action kind does not match request",
            });
        }
        Ok(Self { kind, request, extension_data })
    }

    /// Serialize to wire bytes
    pub fn to_bytes(&self) -> SettleResult<Vec<u8>> {
        encode(self.kind, &self.request, &self.extension_data)
    }

    /// Deserialize from wire bytes
    pub fn from_bytes(bytes: &[u8]) -> SettleResult<Self> {
        decode(bytes)
    }
}

/// Encode an action into envelope bytes
pub fn encode(kind: ActionKind, request: &Request, extension_data: &[u8]) -> SettleResult<Vec<u8>> {
    if request.kind() != kind {
        return Err(SettleError::MalformedEnvelope {
            reason: "action kind does not match request",
        });
    }

    let mut bytes = Vec::with_capacity(TAG_LEN + 128 + extension_data.len());
    bytes.push(kind.tag());
    match request {
        Request::Swap { key, params } => write_body(&mut bytes, key, params, extension_data)?,
        Request::ModifyLiquidity { key, params } => write_body(&mut bytes, key, params, extension_data)?,
    }
    Ok(bytes)
}

/// Decode envelope bytes back into an action
pub fn decode(bytes: &[u8]) -> SettleResult<Envelope> {
    let (&tag, body) = bytes
        .split_first()
        .ok_or(SettleError::MalformedEnvelope { reason: "empty envelope" })?;

    let kind = ActionKind::try_from(tag)
        .map_err(|_| SettleError::MalformedEnvelope { reason: "unknown action tag" })?;

    let (request, extension_data) = match kind {
        ActionKind::Swap => {
            let (key, params, extension_data): (PoolKey, SwapRequest, Vec<u8>) =
                borsh::from_slice(body).map_err(|_| SettleError::MalformedEnvelope {
                    reason: "swap body does not match layout",
                })?;
            (Request::Swap { key, params }, extension_data)
        }
        ActionKind::ModifyLiquidity => {
            let (key, params, extension_data): (PoolKey, LiquidityChangeRequest, Vec<u8>) =
                borsh::from_slice(body).map_err(|_| SettleError::MalformedEnvelope {
                    reason: "liquidity body does not match layout",
                })?;
            (Request::ModifyLiquidity { key, params }, extension_data)
        }
    };

    Ok(Envelope { kind, request, extension_data })
}

fn write_body<P: BorshSerialize>(
    out: &mut Vec<u8>,
    key: &PoolKey,
    params: &P,
    extension_data: &[u8],
) -> SettleResult<()> {
    let failed = |_| SettleError::MalformedEnvelope { reason: "body serialization failed" };
    key.serialize(out).map_err(failed)?;
    params.serialize(out).map_err(failed)?;
    extension_data.serialize(out).map_err(failed)?;
    Ok(())
}
