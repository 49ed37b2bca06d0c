//! The swap method selector table and the `SwapIntent` decode step (C3 step 1).
//!
//! `spec.md` §9 flags the selector table as unspecified upstream; this one
//! matches the Uniswap V2 router ABI (see `DESIGN.md`) rather than
//! inventing a table.
use crate::transaction::Transaction;
use ethers::abi::{decode, ParamType, Token};
use ethers::types::{Address, U256};

/// A decoded swap, positioned within its originating batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapIntent {
    pub tx_hash: ethers::types::H256,
    pub actor: Address,
    pub pool: Address,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in_estimate: U256,
    pub gas_price: U256,
    pub position_in_batch: usize,
}

/// `swapExactTokensForTokens(uint256,uint256,address[],address,uint256)`
const SWAP_EXACT_TOKENS_FOR_TOKENS: [u8; 4] = [0x38, 0xed, 0x17, 0x39];
/// `swapTokensForExactTokens(uint256,uint256,address[],address,uint256)`
const SWAP_TOKENS_FOR_EXACT_TOKENS: [u8; 4] = [0x88, 0x03, 0xdb, 0xee];
/// `swapExactETHForTokens(uint256,address[],address,uint256)` (payable)
const SWAP_EXACT_ETH_FOR_TOKENS: [u8; 4] = [0x7f, 0xf3, 0x6a, 0xb5];
/// `swapTokensForExactETH(uint256,uint256,address[],address,uint256)`
const SWAP_TOKENS_FOR_EXACT_ETH: [u8; 4] = [0x4a, 0x25, 0xd9, 0x4a];
/// `swapExactTokensForETH(uint256,uint256,address[],address,uint256)`
const SWAP_EXACT_TOKENS_FOR_ETH: [u8; 4] = [0x18, 0xcb, 0xaf, 0xe5];
/// `swapETHForExactTokens(uint256,address[],address,uint256)` (payable)
const SWAP_ETH_FOR_EXACT_TOKENS: [u8; 4] = [0xfb, 0x3b, 0xdb, 0x41];

/// Decodes a single transaction into a [`SwapIntent`], or `None` if it isn't
/// a call to one of the known swap entry points. Never fails loudly — a
/// transaction that looks like a swap call but has malformed parameters is
/// treated the same as a transaction that isn't a swap at all (C3's
/// "decoding error drops only that transaction" failure semantics).
pub fn decode_swap_intent(tx: &Transaction, position_in_batch: usize) -> Option<SwapIntent> {
    let selector = tx.method_selector()?;
    let params = tx.input_data.as_ref().get(4..)?;

    let (amount_in, path) = match selector {
        SWAP_EXACT_TOKENS_FOR_TOKENS | SWAP_EXACT_TOKENS_FOR_ETH => {
            let tokens = decode(
                &[
                    ParamType::Uint(256),
                    ParamType::Uint(256),
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Address,
                    ParamType::Uint(256),
                ],
                params,
            )
            .ok()?;
            let amount_in = as_uint(&tokens[0])?;
            let path = as_address_path(&tokens[2])?;
            (amount_in, path)
        }
        SWAP_TOKENS_FOR_EXACT_TOKENS | SWAP_TOKENS_FOR_EXACT_ETH => {
            let tokens = decode(
                &[
                    ParamType::Uint(256),
                    ParamType::Uint(256),
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Address,
                    ParamType::Uint(256),
                ],
                params,
            )
            .ok()?;
            // Exact-output swaps cap spend at `amountInMax`; the true spend
            // is only known at execution time, so the max is the best
            // available estimate (documented approximation, spec.md §9).
            let amount_in_max = as_uint(&tokens[1])?;
            let path = as_address_path(&tokens[2])?;
            (amount_in_max, path)
        }
        SWAP_EXACT_ETH_FOR_TOKENS => {
            let tokens = decode(
                &[
                    ParamType::Uint(256),
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Address,
                    ParamType::Uint(256),
                ],
                params,
            )
            .ok()?;
            let path = as_address_path(&tokens[1])?;
            (tx.value, path)
        }
        SWAP_ETH_FOR_EXACT_TOKENS => {
            let tokens = decode(
                &[
                    ParamType::Uint(256),
                    ParamType::Array(Box::new(ParamType::Address)),
                    ParamType::Address,
                    ParamType::Uint(256),
                ],
                params,
            )
            .ok()?;
            let path = as_address_path(&tokens[1])?;
            (tx.value, path)
        }
        _ => return None,
    };

    let token_in = *path.first()?;
    let token_out = *path.last()?;
    if token_in == token_out {
        return None;
    }

    Some(SwapIntent {
        tx_hash: tx.hash,
        actor: tx.from,
        pool: tx.to,
        token_in,
        token_out,
        amount_in_estimate: amount_in,
        gas_price: tx.gas_price,
        position_in_batch,
    })
}

fn as_uint(token: &Token) -> Option<U256> {
    token.clone().into_uint()
}

fn as_address_path(token: &Token) -> Option<Vec<Address>> {
    token
        .clone()
        .into_array()?
        .into_iter()
        .map(Token::into_address)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{encode, Token};
    use ethers::types::{Bytes, H256};
    use std::time::Instant;

    fn router_call(selector: [u8; 4], tokens: &[Token]) -> Bytes {
        let mut data = selector.to_vec();
        data.extend(encode(tokens));
        Bytes::from(data)
    }

    fn tx(input_data: Bytes, value: U256, from: Address, to: Address) -> Transaction {
        Transaction {
            hash: H256::random(),
            from,
            to,
            input_data,
            gas_price: U256::from(100u64),
            value,
            nonce: U256::zero(),
            observed_at: Instant::now(),
        }
    }

    #[test]
    fn decodes_exact_tokens_for_tokens() {
        let token_a = Address::repeat_byte(1);
        let token_b = Address::repeat_byte(2);
        let data = router_call(
            SWAP_EXACT_TOKENS_FOR_TOKENS,
            &[
                Token::Uint(100u64.into()),
                Token::Uint(1u64.into()),
                Token::Array(vec![Token::Address(token_a), Token::Address(token_b)]),
                Token::Address(Address::repeat_byte(9)),
                Token::Uint(9_999_999_999u64.into()),
            ],
        );
        let t = tx(data, U256::zero(), Address::repeat_byte(0xaa), Address::repeat_byte(0xee));
        let intent = decode_swap_intent(&t, 0).expect("should decode");
        assert_eq!(intent.token_in, token_a);
        assert_eq!(intent.token_out, token_b);
        assert_eq!(intent.amount_in_estimate, U256::from(100u64));
        assert_eq!(intent.pool, Address::repeat_byte(0xee));
    }

    #[test]
    fn decodes_exact_eth_for_tokens_using_tx_value() {
        let token_a = Address::repeat_byte(1);
        let token_b = Address::repeat_byte(2);
        let data = router_call(
            SWAP_EXACT_ETH_FOR_TOKENS,
            &[
                Token::Uint(1u64.into()),
                Token::Array(vec![Token::Address(token_a), Token::Address(token_b)]),
                Token::Address(Address::repeat_byte(9)),
                Token::Uint(9_999_999_999u64.into()),
            ],
        );
        let t = tx(data, U256::from(500u64), Address::repeat_byte(0xaa), Address::repeat_byte(0xee));
        let intent = decode_swap_intent(&t, 0).expect("should decode");
        assert_eq!(intent.amount_in_estimate, U256::from(500u64));
    }

    #[test]
    fn non_swap_calldata_does_not_decode() {
        let t = tx(Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]), U256::zero(), Address::zero(), Address::zero());
        assert!(decode_swap_intent(&t, 0).is_none());
    }

    #[test]
    fn plain_transfer_without_calldata_does_not_decode() {
        let t = tx(Bytes::default(), U256::zero(), Address::zero(), Address::zero());
        assert!(decode_swap_intent(&t, 0).is_none());
    }
}
