//! CBOR witness payloads
//!
//! Callers that cannot build a `Request` themselves (wallets, relayers)
//! submit a CBOR-encoded `RouterWitness`. The `op` byte selects the action
//! and uses the same tag values as the envelope codec.

use serde::{Deserialize, Serialize};

use lockswap_common::{
    constants::action::{TAG_MODIFY_LIQUIDITY, TAG_SWAP},
    errors::{SettleError, SettleResult},
    types::{ActionKind, LiquidityChangeRequest, PoolKey, Request, SwapRequest},
};

/// Operation codes
pub const OP_SWAP: u8 = TAG_SWAP;
pub const OP_MODIFY_LIQUIDITY: u8 = TAG_MODIFY_LIQUIDITY;

/// Witness structure for router operations (serialized via serde)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterWitness {
    pub op: u8,
    pub key: PoolKey,
    /// Swap: signed amount specified. Liquidity: liquidity delta.
    pub amount: i128,
    #[serde(default)]
    pub zero_for_one: Option<bool>,
    #[serde(default)]
    pub price_limit: Option<u128>,
    #[serde(default)]
    pub tick_lower: Option<i32>,
    #[serde(default)]
    pub tick_upper: Option<i32>,
    #[serde(default)]
    pub salt: Option<[u8; 32]>,
    #[serde(default)]
    pub hook_data: Vec<u8>,
}

/// Action parsed from a witness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessAction {
    pub kind: ActionKind,
    pub request: Request,
    pub hook_data: Vec<u8>,
}

impl RouterWitness {
    pub fn swap(key: PoolKey, params: &SwapRequest) -> Self {
        Self {
            op: OP_SWAP,
            key,
            amount: params.amount_specified,
            zero_for_one: Some(params.zero_for_one),
            price_limit: params.price_limit,
            tick_lower: None,
            tick_upper: None,
            salt: None,
            hook_data: Vec::new(),
        }
    }

    pub fn modify_liquidity(key: PoolKey, params: &LiquidityChangeRequest) -> Self {
        Self {
            op: OP_MODIFY_LIQUIDITY,
            key,
            amount: params.liquidity_delta,
            zero_for_one: None,
            price_limit: None,
            tick_lower: Some(params.tick_lower),
            tick_upper: Some(params.tick_upper),
            salt: Some(params.salt),
            hook_data: Vec::new(),
        }
    }

    pub fn with_hook_data(mut self, hook_data: Vec<u8>) -> Self {
        self.hook_data = hook_data;
        self
    }

    pub fn to_cbor(&self) -> SettleResult<Vec<u8>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|_| SettleError::MalformedEnvelope { reason: "witness not encodable" })?;
        Ok(bytes)
    }

    /// Map the witness onto a typed request
    pub fn into_action(self) -> SettleResult<WitnessAction> {
        let kind = ActionKind::try_from(self.op)?;
        let request = match kind {
            ActionKind::Swap => Request::Swap {
                key: self.key,
                params: SwapRequest {
                    zero_for_one: self.zero_for_one.ok_or(INCOMPLETE)?,
                    amount_specified: self.amount,
                    price_limit: self.price_limit,
                },
            },
            ActionKind::ModifyLiquidity => Request::ModifyLiquidity {
                key: self.key,
                params: LiquidityChangeRequest {
                    tick_lower: self.tick_lower.ok_or(INCOMPLETE)?,
                    tick_upper: self.tick_upper.ok_or(INCOMPLETE)?,
                    liquidity_delta: self.amount,
                    salt: self.salt.unwrap_or_default(),
                },
            },
        };
        Ok(WitnessAction { kind, request, hook_data: self.hook_data })
    }
}

const INCOMPLETE: SettleError = SettleError::MalformedEnvelope { reason: "incomplete witness" };

/// Parse CBOR witness bytes into an action
pub fn parse_witness(bytes: &[u8]) -> SettleResult<WitnessAction> {
    if bytes.is_empty() {
        return Err(SettleError::MalformedEnvelope { reason: "empty witness" });
    }
    let witness: RouterWitness = ciborium::de::from_reader(bytes)
        .map_err(|_| SettleError::MalformedEnvelope { reason: "invalid witness encoding" })?;
    witness.into_action()
}
