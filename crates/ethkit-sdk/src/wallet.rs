//! Local signing account

use ethkit_crypto::{keccak256, public_key_to_address, sign, PrivateKey, PublicKey, Signature};
use ethkit_primitives::{Address, H256};
use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::SdkError;

/// Private key plus its derived address.
///
/// Clone is not implemented so the key is never duplicated by accident.
pub struct Wallet {
    private_key: PrivateKey,
    address: Address,
}

impl Wallet {
    /// Fresh random key
    pub fn new_random() -> Self {
        let private_key = SigningKey::random(&mut OsRng);
        let address = public_key_to_address(private_key.verifying_key());
        Self {
            private_key,
            address,
        }
    }

    /// Wallet from a raw 32-byte secret
    pub fn from_private_key(key: &[u8; 32]) -> Result<Self, SdkError> {
        let private_key = SigningKey::from_slice(key)
            .map_err(|e| SdkError::Signing(format!("invalid private key: {e}")))?;
        let address = public_key_to_address(private_key.verifying_key());
        Ok(Self {
            private_key,
            address,
        })
    }

    /// Wallet from a hex secret, with or without `0x`
    pub fn from_private_key_hex(hex: &str) -> Result<Self, SdkError> {
        let hex = hex.trim();
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let mut bytes = hex::decode(hex)
            .map_err(|_| SdkError::Signing("private key is not valid hex".to_string()))?;
        if bytes.len() != 32 {
            let len = bytes.len();
            bytes.zeroize();
            return Err(SdkError::Signing(format!(
                "private key must be 32 bytes, got {len}"
            )));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        bytes.zeroize();

        let wallet = Self::from_private_key(&key);
        key.zeroize();
        wallet
    }

    /// Account address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Uncompressed public key
    pub fn public_key(&self) -> &PublicKey {
        self.private_key.verifying_key()
    }

    /// Sign a 32-byte digest
    pub fn sign_hash(&self, hash: &H256) -> Result<Signature, SdkError> {
        Ok(sign(hash, &self.private_key)?)
    }

    /// `personal_sign`: digest of `"\x19Ethereum Signed Message:\n" || len || message`
    pub fn sign_message(&self, message: &[u8]) -> Result<Signature, SdkError> {
        let mut data = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
        data.extend_from_slice(message);
        self.sign_hash(&keccak256(&data))
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethkit_crypto::recover_address;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_wallet_from_hex() {
        let wallet = Wallet::from_private_key_hex(DEV_KEY).unwrap();
        assert_eq!(
            wallet.address().to_hex(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );

        let bare = Wallet::from_private_key_hex(&DEV_KEY[2..]).unwrap();
        assert_eq!(bare.address(), wallet.address());
    }

    #[test]
    fn test_wallet_rejects_bad_keys() {
        assert!(matches!(
            Wallet::from_private_key_hex("0x1234"),
            Err(SdkError::Signing(_))
        ));
        assert!(matches!(
            Wallet::from_private_key_hex("0xnothex"),
            Err(SdkError::Signing(_))
        ));
        assert!(matches!(
            Wallet::from_private_key(&[0u8; 32]),
            Err(SdkError::Signing(_))
        ));
    }

    #[test]
    fn test_sign_hash_recovers_to_address() {
        let wallet = Wallet::new_random();
        let hash = H256::from_bytes([0x42; 32]);
        let signature = wallet.sign_hash(&hash).unwrap();

        assert!(signature.is_low_s());
        assert_eq!(recover_address(&hash, &signature).unwrap(), *wallet.address());
    }

    #[test]
    fn test_sign_message_uses_prefix() {
        let wallet = Wallet::from_private_key_hex(DEV_KEY).unwrap();
        let message = b"hello";
        let signature = wallet.sign_message(message).unwrap();

        let digest = keccak256(b"\x19Ethereum Signed Message:\n5hello");
        assert_eq!(recover_address(&digest, &signature).unwrap(), *wallet.address());
    }

    #[test]
    fn test_wallet_debug_hides_key() {
        let wallet = Wallet::from_private_key_hex(DEV_KEY).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("address"));
        assert!(!debug.contains("ac0974"));
        assert!(!debug.contains("private_key"));
    }
}
