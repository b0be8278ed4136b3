//! Transaction receipts

use ethkit_primitives::{Address, H256};

use crate::Log;

/// Execution outcome recorded by the node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Execution reverted; the nonce and gas are still consumed
    Reverted = 0,
    /// Execution succeeded
    Success = 1,
}

impl From<bool> for TxStatus {
    fn from(success: bool) -> Self {
        if success {
            TxStatus::Success
        } else {
            TxStatus::Reverted
        }
    }
}

/// Receipt of a mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Hash of the transaction this receipt belongs to
    pub transaction_hash: H256,
    /// Final execution status
    pub status: TxStatus,
    /// Block that included the transaction
    pub block_number: u64,
    /// Hash of that block, when reported
    pub block_hash: Option<H256>,
    /// Gas consumed by this transaction
    pub gas_used: u64,
    /// Price actually paid per gas, when reported
    pub effective_gas_price: Option<u128>,
    /// Deployed contract for creation transactions
    pub contract_address: Option<Address>,
    /// Logs emitted during execution
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Minimal receipt with no logs
    pub fn new(transaction_hash: H256, status: TxStatus, block_number: u64, gas_used: u64) -> Self {
        Self {
            transaction_hash,
            status,
            block_number,
            block_hash: None,
            gas_used,
            effective_gas_price: None,
            contract_address: None,
            logs: Vec::new(),
        }
    }

    /// True when execution succeeded
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }

    /// True when execution reverted
    pub fn is_reverted(&self) -> bool {
        self.status == TxStatus::Reverted
    }

    /// Fee paid in wei, if the node reported the effective price
    pub fn fee(&self) -> Option<u128> {
        self.effective_gas_price
            .map(|price| price.saturating_mul(self.gas_used as u128))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_bool() {
        assert_eq!(TxStatus::from(true), TxStatus::Success);
        assert_eq!(TxStatus::from(false), TxStatus::Reverted);
        assert_eq!(TxStatus::Success as u8, 1);
    }

    #[test]
    fn test_receipt_helpers() {
        let mut receipt = Receipt::new(H256::ZERO, TxStatus::Reverted, 10, 21_000);
        assert!(receipt.is_reverted());
        assert!(!receipt.is_success());
        assert_eq!(receipt.fee(), None);

        receipt.effective_gas_price = Some(2);
        assert_eq!(receipt.fee(), Some(42_000));
    }
}
