//! The detector's output type and its outbound wire representation.
use ethers::types::{Address, H256, U256};
use serde::Serialize;

/// One confirmed sandwich triple, transient by design: it flows from the
/// detector through dedup and validation to the publisher and is never
/// retained past that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub victim_tx: H256,
    pub frontrun_tx: H256,
    pub backrun_tx: H256,
    pub attacker_address: Address,
    pub pool: Address,
    pub estimated_profit_native: U256,
    /// Unix-seconds timestamp of the batch this finding was derived from.
    pub detected_at: u64,
}

/// The wire schema published to the outbound topic (`spec.md` §6).
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Alert {
    pub victim_tx_hash: String,
    pub attacker: String,
    pub frontrun_tx_hash: String,
    pub backrun_tx_hash: String,
    pub profit_eth: String,
    pub timestamp: u64,
}

impl From<&Finding> for Alert {
    fn from(finding: &Finding) -> Self {
        Self {
            victim_tx_hash: format!("{:?}", finding.victim_tx),
            attacker: format!("{:?}", finding.attacker_address),
            frontrun_tx_hash: format!("{:?}", finding.frontrun_tx),
            backrun_tx_hash: format!("{:?}", finding.backrun_tx),
            profit_eth: format_profit_eth(finding.estimated_profit_native),
            timestamp: finding.detected_at,
        }
    }
}

/// Renders `estimated_profit_native` — a plain integer difference of two
/// `amount_in` values, not a wei amount — as the decimal string the wire
/// schema's `profit_eth` contract expects.
fn format_profit_eth(amount: U256) -> String {
    format!("{}.0000", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scenario A from `spec.md` §8: `amount_in(b) - amount_in(f)` = 110 - 100
    /// must render as `"10.0000"`, not a wei-denominated fraction of it.
    #[test]
    fn formats_scenario_a_profit() {
        assert_eq!(format_profit_eth(U256::from(10u64)), "10.0000");
    }

    #[test]
    fn formats_zero_profit() {
        assert_eq!(format_profit_eth(U256::zero()), "0.0000");
    }

    #[test]
    fn alert_hex_fields_are_lowercase_checksummed_debug_format() {
        let finding = Finding {
            victim_tx: H256::zero(),
            frontrun_tx: H256::repeat_byte(0xaa),
            backrun_tx: H256::repeat_byte(0xbb),
            attacker_address: Address::repeat_byte(0xcc),
            pool: Address::zero(),
            estimated_profit_native: U256::zero(),
            detected_at: 42,
        };
        let alert: Alert = (&finding).into();
        assert_eq!(alert.profit_eth, "0.0000");
        assert_eq!(alert.timestamp, 42);
        assert!(alert.victim_tx_hash.starts_with("0x"));
    }
}
