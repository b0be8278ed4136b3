//! Value transfer

use clap::Args;
use ethkit_primitives::units;
use ethkit_sdk::{ensure_success, TxRequest};
use tracing::info;

use super::{display_address, ether, parse_address, Session};
use crate::{output::Output, CliError};

/// Send ether and wait for the receipt
#[derive(Debug, Args)]
pub struct TransferArgs {
    /// Recipient address
    #[arg(short, long)]
    pub to: String,
    /// Amount in ether, e.g. 0.001
    #[arg(short, long)]
    pub amount: String,
    /// Gas price in gwei (node suggestion if omitted)
    #[arg(long)]
    pub gas_price: Option<String>,
    /// Nonce (session nonce if omitted)
    #[arg(long)]
    pub nonce: Option<u64>,
    /// Return after broadcast instead of waiting for the receipt
    #[arg(long)]
    pub no_wait: bool,
}

impl TransferArgs {
    fn request(&self, gas_limit: u64) -> Result<TxRequest, CliError> {
        let to = parse_address(&self.to)?;
        let value = units::parse_ether(&self.amount)
            .map_err(|e| CliError::InvalidAmount(e.to_string()))?;

        let mut request = TxRequest::transfer(to, value).gas_limit(gas_limit);
        if let Some(price) = &self.gas_price {
            let price = units::parse_gwei(price)
                .map_err(|e| CliError::InvalidAmount(format!("gas price: {e}")))?;
            request = request.gas_price(price);
        }
        if let Some(nonce) = self.nonce {
            request = request.nonce(nonce);
        }
        Ok(request)
    }

    pub async fn execute(self, session: &Session) -> Result<(), CliError> {
        let request = self.request(session.config.gas_limit)?;
        let wallet = session.wallet()?;
        let node = session.connect().await?;
        let mut pipeline = session.pipeline();

        let to = request.to.map(|a| display_address(&a)).unwrap_or_default();
        let value = request.value;
        let hash = pipeline.send(&node, &wallet, request).await?;
        info!(tx_hash = %hash, "transfer broadcast");

        if self.no_wait {
            Output::new(session.json)
                .field("tx_hash", &hash.to_hex())
                .field("status", "pending")
                .message(&format!("Sent {} ETH to {to}\nTransaction: {hash}", ether(value)))
                .print();
            return Ok(());
        }

        let timeout = pipeline.config().confirmation_timeout();
        let receipt = ensure_success(pipeline.await_confirmation(&node, hash, timeout).await?)?;

        Output::new(session.json)
            .field("tx_hash", &hash.to_hex())
            .field("from", &display_address(wallet.address()))
            .field("to", &to)
            .field("value_ether", &ether(value))
            .field_u64("block_number", receipt.block_number)
            .field_u64("gas_used", receipt.gas_used)
            .field("status", "success")
            .message(&format!(
                "Sent {} ETH to {to}\nTransaction: {hash}\nBlock: {}\nGas used: {}",
                ether(value),
                receipt.block_number,
                receipt.gas_used
            ))
            .print();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(amount: &str) -> TransferArgs {
        TransferArgs {
            to: "0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d".to_string(),
            amount: amount.to_string(),
            gas_price: Some("20".to_string()),
            nonce: Some(5),
            no_wait: false,
        }
    }

    #[test]
    fn test_request_from_args() {
        let request = args("0.001").request(21_000).unwrap();
        assert_eq!(request.value, 1_000_000_000_000_000);
        assert_eq!(request.gas_limit, 21_000);
        assert_eq!(request.gas_price, Some(20_000_000_000));
        assert_eq!(request.nonce, Some(5));
    }

    #[test]
    fn test_request_rejects_bad_amount() {
        assert!(matches!(
            args("-1").request(21_000),
            Err(CliError::InvalidAmount(_))
        ));
        assert!(matches!(
            args("one").request(21_000),
            Err(CliError::InvalidAmount(_))
        ));
    }
}
