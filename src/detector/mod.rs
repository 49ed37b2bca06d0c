//! The sandwich-pattern analyzer (C3): a pure function from [`Batch`] to an
//! ordered list of [`Finding`]s. No I/O, no mutable external state,
//! deterministic for a fixed input batch — see `spec.md` §4.3 and §8.
mod selectors;

use crate::finding::Finding;
use crate::transaction::Batch;
use ethers::types::Address;
use selectors::{decode_swap_intent, SwapIntent};
use std::collections::HashMap;

/// Candidate sandwich triple found within one pool group, before the
/// cross-pool attacker tie-break (step 6's second rule) is applied.
struct Candidate<'a> {
    frontrun: &'a SwapIntent,
    victim: &'a SwapIntent,
    backrun: &'a SwapIntent,
}

/// Runs the full detection algorithm over a sealed batch.
pub fn detect(batch: &Batch) -> Vec<Finding> {
    let intents: Vec<SwapIntent> = batch
        .transactions()
        .iter()
        .enumerate()
        .filter_map(|(position, tx)| decode_swap_intent(tx, position))
        .collect();

    let mut by_pool: HashMap<Address, Vec<&SwapIntent>> = HashMap::new();
    for intent in &intents {
        by_pool.entry(intent.pool).or_default().push(intent);
    }

    let mut candidates: Vec<Candidate> = Vec::new();
    for group in by_pool.values() {
        // Fewer than 3 swaps in a pool can never host a full triple.
        if group.len() < 3 {
            continue;
        }
        candidates.extend(scan_pool_group(group));
    }

    select_one_per_attacker(candidates, batch.sealed_at)
}

/// Step 3-5: within one pool's swaps (in arrival order), finds every
/// `(frontrun, backrun)` pair by the same actor bracketing an opposite-facing
/// trade, with a qualifying victim strictly between them.
fn scan_pool_group<'a>(group: &[&'a SwapIntent]) -> Vec<Candidate<'a>> {
    let mut found = Vec::new();

    for (i, frontrun) in group.iter().enumerate() {
        for backrun in group.iter().skip(i + 1) {
            if backrun.actor != frontrun.actor {
                continue;
            }
            // the A->B->A pattern: backrun sells back what frontrun bought.
            if frontrun.token_in != backrun.token_out || frontrun.token_out != backrun.token_in {
                continue;
            }

            if let Some(victim) = find_victim(group, frontrun, backrun) {
                found.push(Candidate {
                    frontrun,
                    victim,
                    backrun,
                });
            }
        }
    }

    found
}

/// Step 3-4: scans the open interval `(frontrun, backrun)` for the best
/// qualifying victim, applying the gas-ordering check and the
/// largest-amount/earliest-position tie-break (step 6, first rule).
fn find_victim<'a>(
    group: &[&'a SwapIntent],
    frontrun: &SwapIntent,
    backrun: &SwapIntent,
) -> Option<&'a SwapIntent> {
    group
        .iter()
        .copied()
        .filter(|v| {
            v.position_in_batch > frontrun.position_in_batch
                && v.position_in_batch < backrun.position_in_batch
                && v.actor != frontrun.actor
                && v.token_in == frontrun.token_in
                && v.token_out == frontrun.token_out
                && frontrun.gas_price >= v.gas_price
                && v.gas_price >= backrun.gas_price
        })
        .max_by(|a, b| {
            a.amount_in_estimate
                .cmp(&b.amount_in_estimate)
                // earliest position wins ties, so prefer the *later* position
                // to lose under `max_by` (reverse comparison on position).
                .then(b.position_in_batch.cmp(&a.position_in_batch))
        })
}

/// Step 6's second rule plus emission ordering: one `Finding` per attacker
/// (earliest frontrun wins; earliest backrun breaks a remaining tie), sorted
/// by frontrun position for downstream publish ordering (`spec.md` §5).
fn select_one_per_attacker(candidates: Vec<Candidate<'_>>, sealed_at: u64) -> Vec<Finding> {
    let mut best: HashMap<Address, Candidate> = HashMap::new();

    for candidate in candidates {
        best.entry(candidate.frontrun.actor)
            .and_modify(|incumbent| {
                let better = (candidate.frontrun.position_in_batch, candidate.backrun.position_in_batch)
                    < (incumbent.frontrun.position_in_batch, incumbent.backrun.position_in_batch);
                if better {
                    *incumbent = Candidate {
                        frontrun: candidate.frontrun,
                        victim: candidate.victim,
                        backrun: candidate.backrun,
                    };
                }
            })
            .or_insert(candidate);
    }

    let mut ranked: Vec<(usize, Finding)> = best
        .into_values()
        .map(|c| {
            let finding = Finding {
                victim_tx: c.victim.tx_hash,
                frontrun_tx: c.frontrun.tx_hash,
                backrun_tx: c.backrun.tx_hash,
                attacker_address: c.frontrun.actor,
                pool: c.frontrun.pool,
                estimated_profit_native: c
                    .backrun
                    .amount_in_estimate
                    .saturating_sub(c.frontrun.amount_in_estimate),
                detected_at: sealed_at,
            };
            (c.frontrun.position_in_batch, finding)
        })
        .collect();

    ranked.sort_by_key(|(position, _)| *position);
    ranked.into_iter().map(|(_, finding)| finding).collect()
}
