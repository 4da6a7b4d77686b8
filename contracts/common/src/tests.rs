//! Unit tests for settlement properties
//!
//! Tests cover:
//! - Envelope round-trips over varied requests
//! - One settle/take per non-zero delta
//! - Atomicity when delta i fails
//! - Reference scenarios for swaps and liquidity removal

#[cfg(test)]
mod envelope_tests {
    use crate::envelope::{decode, encode};
    use crate::test_utils::test_key;
    use crate::types::{ActionKind, LiquidityChangeRequest, PoolKey, Request, SwapRequest};

    /// Small deterministic generator, enough to vary fields
    fn next(seed: &mut u64) -> u64 {
        *seed ^= *seed << 13;
        *seed ^= *seed >> 7;
        *seed ^= *seed << 17;
        *seed
    }

    #[test]
    fn test_round_trip_varied_requests() {
        let mut seed = 0x9E37_79B9_7F4A_7C15u64;
        for i in 0..64 {
            let key = if i % 3 == 0 {
                PoolKey::new([1u8; 32], [2u8; 32], 500, 10, Some([(i as u8) | 1; 32])).unwrap()
            } else {
                test_key()
            };
            let request = if i % 2 == 0 {
                let amount = (next(&mut seed) % 1_000_000 + 1) as i128;
                Request::Swap {
                    key,
                    params: SwapRequest {
                        zero_for_one: next(&mut seed) % 2 == 0,
                        amount_specified: if i % 4 == 0 { -amount } else { amount },
                        price_limit: (i % 5 == 0).then(|| next(&mut seed) as u128),
                    },
                }
            } else {
                Request::ModifyLiquidity {
                    key,
                    params: LiquidityChangeRequest::new(-600, 600, next(&mut seed) as i64 as i128)
                        .with_salt([i as u8; 32]),
                }
            };
            let extension: Vec<u8> = (0..(i % 9)).map(|b| b as u8).collect();

            let bytes = encode(request.kind(), &request, &extension).unwrap();
            let decoded = decode(&bytes).unwrap();

            assert_eq!(decoded.kind, request.kind());
            assert_eq!(decoded.request, request);
            assert_eq!(decoded.extension_data, extension);
        }
    }

    #[test]
    fn test_kind_tag_is_first_byte() {
        let request = Request::ModifyLiquidity {
            key: test_key(),
            params: LiquidityChangeRequest::new(-60, 60, 1),
        };
        let bytes = encode(ActionKind::ModifyLiquidity, &request, &[]).unwrap();
        assert_eq!(bytes[0], ActionKind::ModifyLiquidity.tag());
    }
}

#[cfg(test)]
mod settlement_property_tests {
    use crate::errors::SettleError;
    use crate::operation::{Operation, OperationState};
    use crate::envelope::Envelope;
    use crate::test_utils::{initiator, test_key, token0, Call, ScriptedPool};
    use crate::types::{ActionKind, BalanceDelta, Request, SwapRequest};

    fn envelope() -> Envelope {
        Envelope::new(
            ActionKind::Swap,
            Request::Swap { key: test_key(), params: SwapRequest::exact_input(true, 1).unwrap() },
            Vec::new(),
        )
        .unwrap()
    }

    fn deltas(n: u8, zero_every: u8) -> Vec<BalanceDelta> {
        (1..=n)
            .map(|i| {
                let amount = if zero_every != 0 && i % zero_every == 0 {
                    0
                } else if i % 2 == 0 {
                    i as i128 * 100
                } else {
                    -(i as i128) * 100
                };
                BalanceDelta::new([i; 32], amount)
            })
            .collect()
    }

    #[test]
    fn test_calls_match_nonzero_deltas() {
        for n in 0..=8u8 {
            for zero_every in [0u8, 2, 3] {
                let sequence = deltas(n, zero_every);
                let nonzero = sequence.iter().filter(|d| !d.is_zero()).count();
                let mut pool = ScriptedPool::new().with_deltas(sequence);
                let mut op = Operation::new(1, initiator());

                op.dispatch(&envelope(), &mut pool).unwrap();
                let report = op.settle(&mut pool).unwrap();

                assert_eq!(report.calls() as usize, nonzero, "n={} zero_every={}", n, zero_every);
                assert_eq!(pool.settlement_calls().len(), nonzero);
                assert_eq!(op.state(), OperationState::Settled);
            }
        }
    }

    #[test]
    fn test_failure_at_delta_i_stops_later_deltas() {
        const N: u8 = 6;
        for failing in 1..=N {
            // Every delta is a debt; the initiator only holds enough for
            // deltas before `failing`
            let sequence: Vec<_> = (1..=N).map(|i| BalanceDelta::new(token0(), -(i as i128))).collect();
            let affordable: u128 = (1..failing).map(|i| i as u128).sum();
            let mut pool = ScriptedPool::new()
                .with_deltas(sequence)
                .with_holdings(token0(), affordable);
            let mut op = Operation::new(1, initiator());

            op.dispatch(&envelope(), &mut pool).unwrap();
            let err = op.settle(&mut pool).unwrap_err();

            assert!(matches!(err, SettleError::SettlementIncomplete { .. }));
            assert_eq!(op.state(), OperationState::Aborted);
            // Deltas before `failing` fully settled, `failing` attempted, nothing after
            let pays = pool.calls.iter().filter(|c| matches!(c, Call::Pay { .. })).count();
            let settles = pool.calls.iter().filter(|c| matches!(c, Call::Settle { .. })).count();
            assert_eq!(pays, failing as usize);
            assert_eq!(settles, failing as usize - 1);
            assert_eq!(
                pool.calls.last(),
                Some(&Call::Pay { currency: token0(), from: initiator(), amount: failing as u128 })
            );
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use crate::errors::SettleError;
    use crate::operation::{Executor, Operation, OperationState};
    use crate::envelope::Envelope;
    use crate::test_utils::{initiator, test_key, token0, token1, Call, ScriptedPool};
    use crate::types::{ActionKind, BalanceDelta, LiquidityChangeRequest, Request, SwapRequest};

    #[test]
    fn test_swap_scenario() {
        let mut pool = ScriptedPool::new()
            .with_deltas(vec![BalanceDelta::new(token0(), -1_000), BalanceDelta::new(token1(), 950)]);
        let request = Request::Swap {
            key: test_key(),
            params: SwapRequest { zero_for_one: true, amount_specified: 1_000, price_limit: None },
        };
        let mut op = Operation::new(1, initiator());

        op.dispatch(&Envelope::new(ActionKind::Swap, request, Vec::new()).unwrap(), &mut pool)
            .unwrap();
        op.settle(&mut pool).unwrap();

        assert_eq!(
            pool.calls[1..],
            [
                Call::Pay { currency: token0(), from: initiator(), amount: 1_000 },
                Call::Settle { currency: token0(), amount: 1_000 },
                Call::Take { currency: token1(), amount: 950, recipient: initiator() },
            ]
        );
        assert_eq!(op.state(), OperationState::Settled);
    }

    #[test]
    fn test_liquidity_removal_scenario() {
        let mut pool = ScriptedPool::new()
            .with_deltas(vec![BalanceDelta::new(token0(), 300), BalanceDelta::new(token1(), 200)]);
        let request = Request::ModifyLiquidity {
            key: test_key(),
            params: LiquidityChangeRequest::new(-600, 600, -500),
        };
        let mut executor = Executor::new(initiator());

        let receipt = executor
            .execute(&mut pool, ActionKind::ModifyLiquidity, request, &[])
            .unwrap();

        assert_eq!(receipt.report.take_calls, 2);
        assert_eq!(receipt.report.settle_calls, 0);
        assert!(!pool.calls.iter().any(|c| matches!(c, Call::Pay { .. } | Call::Settle { .. })));
    }

    #[test]
    fn test_invalid_three_byte_envelope() {
        let mut pool = ScriptedPool::new();
        let mut executor = Executor::new(initiator());

        let result = executor.execute_envelope(&mut pool, &[0xFF, 0x01, 0x02]);

        assert!(matches!(result, Err(SettleError::MalformedEnvelope { .. })));
        assert!(pool.calls.is_empty());
    }
}
